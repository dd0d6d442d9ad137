//! Portico: a generic CRUD REST core over a document store
//!
//! This library provides request handlers for a small REST API backed by a
//! document database: a generic CRUD handler set usable with any entity
//! collection, a query-string driven filter/sort/projection/pagination
//! pipeline, and account endpoints for the authenticated user.
//!
//! ### Modules
//!
//! - `auth`: the identity seam between the authentication layer and handlers
//! - `config`: command line / environment configuration
//! - `db`: database connection setup
//! - `dto`: response envelopes and the request payload extractor
//! - `errors`: the operational error type and its HTTP rendering
//! - `handlers`: the CRUD and account request handlers
//! - `images`: the image-storage collaborator
//! - `query`: the query-string filter pipeline
//! - `store`: the data-layer trait with MongoDB and in-memory backends
//!
//! ### Web API
//!
//! The router wired by [`create_app`] exposes, per entity collection:
//!
//! - `GET /api/{collection}`: list documents, restricted by the query string
//! - `POST /api/{collection}`: create a document (JSON or multipart)
//! - `GET /api/{collection}/{id}`: get one document
//! - `PATCH /api/{collection}/{id}`: update a document
//! - `DELETE /api/{collection}/{id}`: delete one or more documents
//!
//! plus `GET /api/account` and `PATCH /api/account` for the authenticated
//! user.

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod images;
pub mod query;
pub mod store;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{Router, middleware, routing::get};

use crate::handlers::{
    create_document_handler, delete_documents_handler, get_all_documents_handler,
    get_document_handler, get_my_account_handler, update_document_handler,
    update_my_account_handler,
};
use crate::images::ImageStore;
use crate::store::EntityModel;

/// Per-collection state handed to the CRUD handlers: the data-layer model,
/// the image collaborator, and the folder uploads for this collection land
/// in (`None` disables image handling).
pub struct EntityState<M> {
    pub model: Arc<M>,
    pub images: Arc<dyn ImageStore>,
    pub image_folder: Option<String>,
}

impl<M> EntityState<M> {
    pub fn new(model: Arc<M>, images: Arc<dyn ImageStore>, image_folder: Option<String>) -> Self {
        Self {
            model,
            images,
            image_folder,
        }
    }
}

// Manual impl: `M` itself does not need to be Clone behind the Arc
impl<M> Clone for EntityState<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            images: Arc::clone(&self.images),
            image_folder: self.image_folder.clone(),
        }
    }
}

/// State for the whole application: one entity state per wired collection.
/// The account routes share the users collection.
pub struct AppState<M> {
    pub trips: EntityState<M>,
    pub users: EntityState<M>,
}

impl<M> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            trips: self.trips.clone(),
            users: self.users.clone(),
        }
    }
}

/// Creates the application router with all routes
///
/// Each collection gets the full CRUD handler set; the account routes sit on
/// top of the users collection. The gateway-identity middleware lifts the
/// upstream user id header into the request extensions for the account
/// handlers.
pub fn create_app<M: EntityModel + 'static>(state: AppState<M>) -> Router {
    let trips = Router::new()
        // Routes for listing and creating trips
        .route(
            "/",
            get(get_all_documents_handler::<M>).post(create_document_handler::<M>),
        )
        // Routes for getting, updating and deleting a specific trip
        .route(
            "/{id}",
            get(get_document_handler::<M>)
                .patch(update_document_handler::<M>)
                .delete(delete_documents_handler::<M>),
        )
        .with_state(state.trips);

    let users = Router::new()
        // Routes for listing and creating users
        .route(
            "/",
            get(get_all_documents_handler::<M>).post(create_document_handler::<M>),
        )
        // Routes for getting, updating and deleting a specific user
        .route(
            "/{id}",
            get(get_document_handler::<M>)
                .patch(update_document_handler::<M>)
                .delete(delete_documents_handler::<M>),
        )
        .with_state(state.users.clone());

    let account = Router::new()
        // Routes for the authenticated user's own account
        .route(
            "/",
            get(get_my_account_handler::<M>).patch(update_my_account_handler::<M>),
        )
        .with_state(state.users);

    Router::new()
        .nest("/api/trips", trips)
        .nest("/api/users", users)
        .nest("/api/account", account)
        .layer(middleware::from_fn(auth::gateway_identity))
}
