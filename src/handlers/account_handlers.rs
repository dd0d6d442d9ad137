use axum::{Json, extract::State};
use bson::Document;
use tracing::{debug, info, instrument};

use crate::EntityState;
use crate::auth::CurrentUser;
use crate::dto::UserEnvelope;
use crate::errors::ApiError;
use crate::store::{EntityModel, REVISION_FIELD};

/// Fields a user may change through the account route. Everything else in
/// the body (role, password, ...) is dropped before the update.
const ALLOWED_UPDATE_FIELDS: [&str; 3] = ["first_name", "last_name", "phone_number"];

/// Fields stripped from every account response.
const HIDDEN_ACCOUNT_FIELDS: [&str; 3] = [REVISION_FIELD, "role", "password"];

/// Handler for retrieving the authenticated user's account
///
/// Handles GET requests to `/api/account`. The user id comes from the
/// identity the authentication layer attached to the request.
#[instrument(skip_all)]
pub async fn get_my_account_handler<M: EntityModel + 'static>(
    // Extract the users collection from the application state
    State(state): State<EntityState<M>>,
    // The authenticated user's id
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserEnvelope>, ApiError> {
    debug!("Fetching current user account");

    let user = state
        .model
        .find_by_id(&user_id)
        .await
        .map_err(ApiError::Database)?;

    let Some(mut user) = user else {
        return Err(ApiError::NotFound("No such user found, wrong ID".to_string()));
    };

    strip_hidden_fields(&mut user);

    Ok(Json(UserEnvelope::new(user)))
}

/// Handler for updating the authenticated user's account
///
/// Handles PATCH requests to `/api/account`. Password changes are rejected
/// outright; of the remaining body only the allow-listed fields reach the
/// data layer, so a request cannot smuggle in a role change.
#[instrument(skip_all)]
pub async fn update_my_account_handler<M: EntityModel + 'static>(
    // Extract the users collection from the application state
    State(state): State<EntityState<M>>,
    // The authenticated user's id
    CurrentUser(user_id): CurrentUser,
    // Extract and deserialize the JSON request body
    Json(body): Json<serde_json::Map<String, serde_json::Value>>,
) -> Result<Json<UserEnvelope>, ApiError> {
    info!("Updating current user account");

    if body.contains_key("password") || body.contains_key("confirm_password") {
        return Err(ApiError::BadRequest(
            "This route is not for password updates. Use the password route instead.".to_string(),
        ));
    }

    let changes = filter_fields(&body, &ALLOWED_UPDATE_FIELDS);

    let updated = state
        .model
        .update_by_id(&user_id, changes)
        .await
        .map_err(ApiError::Database)?;

    let Some(mut user) = updated else {
        return Err(ApiError::NotFound("No such user found, wrong ID".to_string()));
    };

    strip_hidden_fields(&mut user);

    Ok(Json(UserEnvelope::new(user)))
}

/// Copies the allow-listed keys of `source` into a fresh document, leaving
/// `source` untouched.
fn filter_fields(
    source: &serde_json::Map<String, serde_json::Value>,
    allowed: &[&str],
) -> Document {
    let mut filtered = Document::new();
    for (key, value) in source {
        if !allowed.contains(&key.as_str()) {
            continue;
        }
        if let Ok(value) = bson::to_bson(value) {
            filtered.insert(key.clone(), value);
        }
    }
    filtered
}

fn strip_hidden_fields(user: &mut Document) {
    for field in HIDDEN_ACCOUNT_FIELDS {
        user.remove(field);
    }
}
