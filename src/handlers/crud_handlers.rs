use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use axum_extra::extract::Query;
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::EntityState;
use crate::dto::{DeleteEnvelope, DocumentEnvelope, DocumentPayload, ListEnvelope};
use crate::errors::ApiError;
use crate::images::{self, IMAGE_WIDTH};
use crate::query::FilteredQuery;
use crate::store::EntityModel;

/// Handler for retrieving a single document by id
///
/// Handles GET requests to `/{collection}/{id}`. A missing id is a hard 404;
/// the handler stops there rather than emitting a success body around a
/// null document.
#[instrument(skip(state), fields(id = %id))]
pub async fn get_document_handler<M: EntityModel + 'static>(
    // Extract the entity state from the application state
    State(state): State<EntityState<M>>,
    // Extract the document ID from the URL path
    Path(id): Path<String>,
) -> Result<Json<DocumentEnvelope>, ApiError> {
    debug!("Fetching document");

    let document = state
        .model
        .find_by_id(&id)
        .await
        .map_err(ApiError::Database)?;

    let Some(document) = document else {
        return Err(ApiError::NotFound("No such document found, wrong ID".to_string()));
    };

    Ok(Json(DocumentEnvelope::new(Some(document))))
}

/// Handler for listing documents with filtering, sorting, projection and
/// pagination driven by the query string
///
/// Handles GET requests to `/{collection}`. An empty result set is a
/// success, not an error.
#[instrument(skip(state, params))]
pub async fn get_all_documents_handler<M: EntityModel + 'static>(
    // Extract the entity state from the application state
    State(state): State<EntityState<M>>,
    // Extract the flat query-string mapping
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ListEnvelope>, ApiError> {
    debug!("Listing documents with query: {:?}", params);

    // The stages must run in this order; projection and pagination shape the
    // already-filtered, already-sorted result set
    let documents = FilteredQuery::new(state.model.as_ref(), params)
        .filter()
        .sort()
        .project()
        .paginate()
        .run()
        .await
        .map_err(ApiError::Database)?;

    info!("Retrieved {} documents", documents.len());

    Ok(Json(ListEnvelope::new(documents)))
}

/// Handler for creating a document
///
/// Handles POST requests to `/{collection}`. When the collection is wired
/// with an image folder and the payload carries an image, the document gets
/// an `img_url` pointing at the synthesized storage path before insertion,
/// and the upload is persisted by a detached background task after the
/// insert succeeds.
#[instrument(skip_all)]
pub async fn create_document_handler<M: EntityModel + 'static>(
    // Extract the entity state from the application state
    State(state): State<EntityState<M>>,
    // Request headers, used to build the public image URL
    headers: HeaderMap,
    // Document fields plus the optional uploaded image
    payload: DocumentPayload,
) -> Result<(StatusCode, Json<DocumentEnvelope>), ApiError> {
    info!("Creating new document");

    let DocumentPayload { mut fields, image } = payload;

    let image_path = state.image_folder.as_deref().map(image_storage_path);
    if let (Some(path), Some(_)) = (&image_path, &image) {
        fields.insert("img_url", public_url(&headers, path));
    }

    let document = state.model.create(fields).await.map_err(ApiError::Database)?;

    // The response does not wait for the image store; failures go to the log
    if let (Some(path), Some(image)) = (image_path, image) {
        images::spawn_store(state.images.clone(), image.data, path, IMAGE_WIDTH);
    }

    Ok((StatusCode::CREATED, Json(DocumentEnvelope::new(Some(document)))))
}

/// Handler for updating a document by id
///
/// Handles PATCH requests to `/{collection}/{id}`. Responds 200 with the
/// post-update document, or with a null document when the id matched
/// nothing. Image handling mirrors the create path, except the store task is
/// only scheduled when the update actually found a document.
#[instrument(skip(state, headers, payload), fields(id = %id))]
pub async fn update_document_handler<M: EntityModel + 'static>(
    // Extract the entity state from the application state
    State(state): State<EntityState<M>>,
    // Extract the document ID from the URL path
    Path(id): Path<String>,
    // Request headers, used to build the public image URL
    headers: HeaderMap,
    // Document fields plus the optional uploaded image
    payload: DocumentPayload,
) -> Result<Json<DocumentEnvelope>, ApiError> {
    info!("Updating document");

    let DocumentPayload { mut fields, image } = payload;

    let image_path = state.image_folder.as_deref().map(image_storage_path);
    if let (Some(path), Some(_)) = (&image_path, &image) {
        fields.insert("img_url", public_url(&headers, path));
    }

    let updated = state
        .model
        .update_by_id(&id, fields)
        .await
        .map_err(ApiError::Database)?;

    if updated.is_some() {
        if let (Some(path), Some(image)) = (image_path, image) {
            images::spawn_store(state.images.clone(), image.data, path, IMAGE_WIDTH);
        }
    }

    Ok(Json(DocumentEnvelope::new(updated)))
}

/// Handler for deleting one or more documents
///
/// Handles DELETE requests to `/{collection}/{id}` where the path segment
/// may carry several comma-separated ids. One bulk delete covers the whole
/// set; ids that matched nothing only show up as the difference between the
/// summary's counts.
#[instrument(skip(state), fields(ids = %id))]
pub async fn delete_documents_handler<M: EntityModel + 'static>(
    // Extract the entity state from the application state
    State(state): State<EntityState<M>>,
    // One id, or a comma-separated list of ids
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<DeleteEnvelope>), ApiError> {
    let ids: Vec<String> = id
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect();

    let summary = state.model.delete_many(&ids).await.map_err(ApiError::Database)?;

    info!(requested = summary.requested, deleted = summary.deleted, "Deleted documents");

    Ok((StatusCode::NO_CONTENT, Json(DeleteEnvelope::new(summary))))
}

/// Storage path for a fresh upload: `public/images/{folder}/{timestamp}.jpg`
fn image_storage_path(folder: &str) -> String {
    format!("public/images/{}/{}.jpg", folder, Utc::now().timestamp_millis())
}

/// Absolute URL the stored image will be served from, derived from the
/// request's forwarded scheme and host.
fn public_url(headers: &HeaderMap, image_path: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}/{image_path}")
}
