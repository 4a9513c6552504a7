//! Account settings page

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Html;
use tower_cookies::Cookies;

use tipline_core::message::escape_html;

use super::page::page;
use crate::email::EmailSender;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::{ParticipantStore, SessionStore};

/// GET /{username}/settings/
pub async fn settings_page<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    Path(username): Path<String>,
    cookies: Cookies,
) -> Result<Html<String>, ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    let participant = super::session::require_participant(&cookies, &state, &username)?;
    let emails = state.emails().get_emails(&participant)?;

    let mut body = String::from("<h2>Email Addresses</h2>");
    if emails.is_empty() {
        body.push_str("<p>No email addresses yet.</p>");
    } else {
        body.push_str("<ul class=\"emails\">");
        for entry in &emails {
            let status = entry.status(&participant);
            body.push_str(&format!(
                "<li class=\"{status}\"><span class=\"address\">{address}</span> \
                 <span class=\"status\">{status}</span></li>",
                status = status.as_str(),
                address = escape_html(&entry.address),
            ));
        }
        body.push_str("</ul>");
    }

    Ok(page(&format!("{} Settings", participant.username), &body))
}
