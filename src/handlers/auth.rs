// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, Role, UserRecord},
    store::{Collection, Filter, RecordStore, encode},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

pub(crate) async fn find_user_by_email(
    store: &dyn RecordStore,
    email: &str,
) -> Result<Option<UserRecord>, AppError> {
    let mut docs = store
        .query(Collection::Users, &[Filter::eq("email", email)])
        .await?;

    match docs.pop() {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

/// Registers a student on first sign-in.
///
/// Creates the user record with role 'student' and empty identity fields;
/// the student completes their name on the account page. Returns a token so
/// registration doubles as a sign-in.
pub async fn register(
    State(store): State<Arc<dyn RecordStore>>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if find_user_by_email(store.as_ref(), &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "An account for '{}' already exists",
            payload.email
        )));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = UserRecord {
        id: String::new(),
        role: Role::Student,
        email: payload.email,
        first_name: String::new(),
        last_name: String::new(),
        contact_number: String::new(),
        profile_picture: String::new(),
        password_hash: Some(hashed_password),
    };

    let id = store.create(Collection::Users, encode(&user)?).await?;
    let token = sign_jwt(&id, Role::Student, &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "type": "Bearer",
            "role": Role::Student.as_str(),
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// The role in the response lets the client route to the admin or student
/// area; authorization itself is re-checked per request by the guards.
pub async fn login(
    State(store): State<Arc<dyn RecordStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = find_user_by_email(store.as_ref(), &payload.email)
        .await?
        .ok_or(AppError::AuthError("User not found".to_string()))?;

    let stored_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::AuthError("Invalid password".to_string()))?;

    if !verify_password(&payload.password, stored_hash)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(&user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role.as_str(),
    })))
}

/// Seeds the configured admin account when it does not exist yet.
/// Called once at startup.
pub async fn seed_admin(store: &dyn RecordStore, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if find_user_by_email(store, email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    let hashed_password = hash_password(password)?;

    let admin = UserRecord {
        id: String::new(),
        role: Role::Admin,
        email: email.clone(),
        first_name: String::new(),
        last_name: String::new(),
        contact_number: String::new(),
        profile_picture: String::new(),
        password_hash: Some(hashed_password),
    };

    store.create(Collection::Users, encode(&admin)?).await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}
