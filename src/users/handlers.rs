use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::AuthUser, jwt::JwtKeys},
    error::{AppError, FieldErrors},
    payload::Payload,
    state::AppState,
    users::{
        dto::{CreateUserRequest, ProfileResponse, TokenRequest, TokenResponse, UpdateProfileRequest},
        manager::{ExtraFields, ProfileUpdate},
        repo_types::User,
    },
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_user))
        .route("/token", post(create_token))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(patch_me).put(put_me))
}

#[instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    Payload(payload): Payload<CreateUserRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), AppError> {
    payload.validate().into_result()?;

    let users = state.users();
    let email = payload.email.as_deref().unwrap_or_default();
    if users.get_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Validation(FieldErrors::single(
            "email",
            "user with this email already exists.",
        )));
    }

    let user = users
        .create_user(
            payload.email.as_deref(),
            payload.password.as_deref(),
            ExtraFields::named(payload.name.unwrap_or_default()),
        )
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip_all)]
pub async fn create_token(
    State(state): State<AppState>,
    Payload(payload): Payload<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    payload.validate().into_result()?;

    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let Some(user) = state.users().authenticate(&email, &password).await? else {
        warn!(email = %email, "token refused: invalid credentials");
        return Err(AppError::Validation(FieldErrors::single(
            "non_field_errors",
            "Unable to authenticate with provided credentials.",
        )));
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_access(user.id)?;
    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}

async fn current_user(state: &AppState, AuthUser(user_id): AuthUser) -> Result<User, AppError> {
    match state.users().get(user_id).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => {
            warn!(%user_id, "token for inactive user");
            Err(AppError::Unauthorized("User inactive or deleted.".into()))
        }
        None => {
            warn!(%user_id, "token for unknown user");
            Err(AppError::Unauthorized("User inactive or deleted.".into()))
        }
    }
}

#[instrument(skip(state, auth))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = current_user(&state, auth).await?;
    Ok(Json(user.into()))
}

#[instrument(skip_all)]
pub async fn patch_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Payload(payload): Payload<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    update_me(state, auth, payload, true).await
}

#[instrument(skip_all)]
pub async fn put_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Payload(payload): Payload<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    update_me(state, auth, payload, false).await
}

async fn update_me(
    state: AppState,
    auth: AuthUser,
    payload: UpdateProfileRequest,
    partial: bool,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = current_user(&state, auth).await?;
    payload.validate(partial).into_result()?;

    let users = state.users();
    if let Some(email) = payload.normalized_email() {
        if email != user.email && users.get_by_email(&email).await?.is_some() {
            return Err(AppError::Validation(FieldErrors::single(
                "email",
                "user with this email already exists.",
            )));
        }
    }

    let update = ProfileUpdate {
        email: payload.email,
        name: payload.name,
        password: payload.password,
        ..ProfileUpdate::default()
    };
    let updated = users.update(user.id, update).await?.ok_or(AppError::NotFound)?;
    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.into()))
}
