//! Sign-up, sign-in and sign-out endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use tipline_core::Username;

use crate::crypto::{hash_password, verify_password};
use crate::email::EmailSender;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::{ParticipantStore, SessionStore};

/// Minimum password length
const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length
const MAX_PASSWORD_LENGTH: usize = 80;

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub searchable: Option<bool>,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub id: i64,
    pub username: String,
}

/// POST /sign-up.json
pub async fn sign_up<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    cookies: Cookies,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<AuthResponse>, ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    let username = Username::parse(&req.username)?;

    if req.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::PasswordTooShort);
    }
    if req.password.len() > MAX_PASSWORD_LENGTH {
        return Err(ServiceError::PasswordTooLong);
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| ServiceError::Internal(e.to_string()))?;

    let participant = state.participant_store.create_participant(
        &username,
        &password_hash,
        req.searchable.unwrap_or(true),
    )?;

    let session = state.session_store.create(participant.id)?;
    super::session::set_session_cookie(&cookies, &session.id.0);

    tracing::info!(participant = %participant.username, "Participant signed up");

    Ok(Json(AuthResponse {
        success: true,
        id: participant.id.0,
        username: participant.username,
    }))
}

/// POST /sign-in.json
pub async fn sign_in<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    cookies: Cookies,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    let participant = state
        .participant_store
        .get_participant_by_username(&req.username)?
        .ok_or(ServiceError::InvalidCredentials)?;

    let hash = state
        .participant_store
        .password_hash(participant.id)?
        .ok_or(ServiceError::InvalidCredentials)?;

    let valid = verify_password(&req.password, &hash)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    if !valid {
        return Err(ServiceError::InvalidCredentials);
    }

    let session = state.session_store.create(participant.id)?;
    super::session::set_session_cookie(&cookies, &session.id.0);

    Ok(Json(AuthResponse {
        success: true,
        id: participant.id.0,
        username: participant.username,
    }))
}

#[derive(Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

/// POST /sign-out.json
pub async fn sign_out<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    cookies: Cookies,
) -> Json<SignOutResponse>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    if let Some(session) =
        super::session::get_session_from_cookies(&cookies, state.session_store.as_ref())
    {
        let _ = state.session_store.delete(&session.id);
    }

    super::session::clear_session_cookie(&cookies);

    Json(SignOutResponse { success: true })
}
