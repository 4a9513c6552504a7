//! Session cookie helpers

use tower_cookies::{Cookie, Cookies};

use tipline_core::Participant;

use crate::email::EmailSender;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::{ParticipantStore, Session, SessionId, SessionStore, StoreResult};

pub const SESSION_COOKIE: &str = "tipline_session";

/// Helper to get current session from cookies
pub fn get_session_from_cookies<S: SessionStore + ?Sized>(
    cookies: &Cookies,
    session_store: &S,
) -> Option<Session> {
    cookies.get(SESSION_COOKIE).and_then(|c| {
        let session_id = SessionId(c.value().to_string());
        session_store.get(&session_id).ok().flatten()
    })
}

/// The signed-in participant, if any
pub fn current_participant<U, S, E>(
    cookies: &Cookies,
    state: &AppState<U, S, E>,
) -> StoreResult<Option<Participant>>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    match get_session_from_cookies(cookies, state.session_store.as_ref()) {
        Some(session) => state.participant_store.get_participant(session.participant),
        None => Ok(None),
    }
}

/// The signed-in participant, who must be `username`
pub fn require_participant<U, S, E>(
    cookies: &Cookies,
    state: &AppState<U, S, E>,
    username: &str,
) -> Result<Participant, ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    current_participant(cookies, state)?
        .filter(|p| p.username.eq_ignore_ascii_case(username))
        .ok_or(ServiceError::NotAuthenticated)
}

/// Helper to set session cookie
pub fn set_session_cookie(cookies: &Cookies, session_id: &str) {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .build();
    cookies.add(cookie);
}

/// Helper to clear session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}
