use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::auth::dto::{AuthResponse, LoginInput, MeResponse, RegisterInput};
use crate::auth::jwt::{AuthUser, JwtKeys};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validate::require_object;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let input = RegisterInput::from_json(require_object(&body)?)?;

    if User::find_by_username(&state.db, &input.username)
        .await?
        .is_some()
    {
        warn!(username = %input.username, "username already exists");
        return Err(ApiError::Conflict("Username already exists"));
    }
    if User::find_by_email(&state.db, &input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered"));
    }

    let password_hash = hash_password(&input.password)?;
    let user = User::create(&state.db, &input.username, &input.email, &password_hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user,
            access_token,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<AuthResponse>, ApiError> {
    let input = LoginInput::from_json(require_object(&body)?)?;

    let Some(user) =
        User::find_by_username_or_email(&state.db, &input.username_or_email).await?
    else {
        warn!(identifier = %input.username_or_email, "login unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&input.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        user,
        access_token,
    }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let Some(user) = User::find_by_id(&state.db, user_id).await? else {
        warn!(user_id = %user_id, "authenticated user record vanished");
        return Err(ApiError::NotFound("User"));
    };
    Ok(Json(MeResponse { user }))
}
