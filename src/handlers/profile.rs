use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Map, Value};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{ChangePasswordRequest, UpdateProfileRequest, UserProfile, UserRecord},
    store::{Collection, RecordStore},
    utils::{
        hash::{hash_password, verify_password},
        jwt::Claims,
    },
};

/// Get the caller's own profile.
pub async fn get_profile(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user: UserRecord = store
        .read(Collection::Users, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?
        .decode()?;

    Ok(Json(UserProfile::from(user)))
}

/// Update the caller's own identity fields. Only provided fields change.
pub async fn update_profile(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    store
        .read(Collection::Users, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let mut fields = Map::new();
    if let Some(first_name) = payload.first_name {
        fields.insert("firstName".to_string(), Value::String(first_name));
    }
    if let Some(last_name) = payload.last_name {
        fields.insert("lastName".to_string(), Value::String(last_name));
    }
    if let Some(email) = payload.email {
        if email.trim().is_empty() {
            return Err(AppError::BadRequest("Email cannot be empty".to_string()));
        }
        fields.insert("email".to_string(), Value::String(email));
    }
    if let Some(contact_number) = payload.contact_number {
        fields.insert("contactNumber".to_string(), Value::String(contact_number));
    }
    if let Some(profile_picture) = payload.profile_picture {
        fields.insert("profilePicture".to_string(), Value::String(profile_picture));
    }

    if fields.is_empty() {
        return Ok(StatusCode::OK);
    }

    store
        .update(Collection::Users, &claims.sub, Value::Object(fields))
        .await
        .map_err(|e| {
            tracing::error!("Failed to update profile: {}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::OK)
}

/// Change the caller's own password. The current password must verify.
pub async fn change_password(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user: UserRecord = store
        .read(Collection::Users, &claims.sub)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?
        .decode()?;

    let stored_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::AuthError("Invalid password".to_string()))?;

    if !verify_password(&payload.current_password, stored_hash)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    store
        .update(
            Collection::Users,
            &claims.sub,
            serde_json::json!({ "passwordHash": new_hash }),
        )
        .await?;

    Ok(StatusCode::OK)
}
