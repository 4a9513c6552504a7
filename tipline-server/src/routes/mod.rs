//! HTTP routes for the server

mod auth;
mod emails;
mod lookup;
mod page;
mod session;
mod settings;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::email::EmailSender;
use crate::state::AppState;
use crate::store::{ParticipantStore, SessionStore};

pub use emails::EmailAction;
pub use session::SESSION_COOKIE;

/// Create the router with all routes
pub fn create_router<U, S, E>(state: Arc<AppState<U, S, E>>) -> Router
where
    U: ParticipantStore + 'static,
    S: SessionStore + 'static,
    E: EmailSender + 'static,
{
    Router::new()
        .route("/sign-up.json", post(auth::sign_up))
        .route("/sign-in.json", post(auth::sign_in))
        .route("/sign-out.json", post(auth::sign_out))
        .route("/lookup.json", get(lookup::lookup_json))
        .route("/:username/emails.json", get(emails::list_emails))
        .route("/:username/emails/modify.json", post(emails::modify_email))
        .route("/:username/emails/verify.html", get(emails::verify_email))
        .route("/:username/settings", get(settings::settings_page))
        .route("/:username/settings/", get(settings::settings_page))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
