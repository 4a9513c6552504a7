//! Email management endpoints

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use tipline_core::message::escape_html;
use tipline_core::{EmailAddress, EmailStatus, Error as IdentityError, VerificationOutcome};

use super::page::page;
use crate::email::EmailSender;
use crate::error::ServiceError;
use crate::identity::AddEmailOutcome;
use crate::state::AppState;
use crate::store::{ParticipantStore, SessionStore};

/// Action requested through `modify.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailAction {
    AddEmail,
    Resend,
    SetPrimary,
    Remove,
}

impl FromStr for EmailAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add-email" => Ok(EmailAction::AddEmail),
            "resend" => Ok(EmailAction::Resend),
            "set-primary" => Ok(EmailAction::SetPrimary),
            "remove" => Ok(EmailAction::Remove),
            other => Err(ServiceError::ValidationError(format!(
                "unknown action \"{other}\""
            ))),
        }
    }
}

#[derive(Deserialize)]
pub struct ModifyEmailForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Serialize)]
pub struct ModifyEmailResponse {
    pub success: bool,
    pub msg: String,
}

/// POST /{username}/emails/modify.json
pub async fn modify_email<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    Path(username): Path<String>,
    cookies: Cookies,
    Form(form): Form<ModifyEmailForm>,
) -> Result<Json<ModifyEmailResponse>, ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    let participant = super::session::require_participant(&cookies, &state, &username)?;
    let action: EmailAction = form.action.parse()?;
    let address = EmailAddress::parse(&form.address)?;
    let emails = state.emails();

    let msg = match action {
        EmailAction::AddEmail | EmailAction::Resend => {
            match emails.add_email(&participant, address.as_str())? {
                AddEmailOutcome::AlreadyVerified => {
                    format!("You have already added and verified {address}.")
                }
                AddEmailOutcome::Sent | AddEmailOutcome::SentWithNotice => {
                    format!("A verification email has been sent to {address}.")
                }
            }
        }
        EmailAction::SetPrimary => {
            emails.set_primary(&participant, address.as_str())?;
            format!("{address} is now your primary email address.")
        }
        EmailAction::Remove => {
            emails.remove_email(&participant, address.as_str())?;
            format!("{address} has been removed from your account.")
        }
    };

    Ok(Json(ModifyEmailResponse { success: true, msg }))
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

/// GET /{username}/emails/verify.html
pub async fn verify_email<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    Path(username): Path<String>,
    cookies: Cookies,
    Query(query): Query<VerifyQuery>,
) -> Result<(StatusCode, Html<String>), ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    let participant = match super::session::current_participant(&cookies, &state)? {
        Some(p) if p.username.eq_ignore_ascii_case(&username) => p,
        Some(_) => {
            return Ok((
                StatusCode::FORBIDDEN,
                page(
                    "Wrong Account",
                    "<p>You're signed in to a different account than the one this link is for.</p>",
                ),
            ))
        }
        None => {
            return Ok((
                StatusCode::FORBIDDEN,
                page("Please Sign In", "<p>Sign in to finish connecting your email.</p>"),
            ))
        }
    };

    let address = query.email.unwrap_or_default();
    let nonce = query.nonce.unwrap_or_default();
    let escaped = escape_html(&address);

    let outcome = match state.emails().verify_email(&participant, &address, &nonce) {
        Ok(outcome) => outcome,
        Err(ServiceError::Identity(IdentityError::EmailAlreadyTaken(_))) => {
            return Ok((
                StatusCode::CONFLICT,
                page(
                    "Address Taken",
                    &format!(
                        "<p>The email address {escaped} is already connected to a different account.</p>"
                    ),
                ),
            ))
        }
        Err(e) => return Err(e),
    };

    let (title, body) = match outcome {
        VerificationOutcome::Missing => (
            "Missing Info",
            "<p>Sorry, that's a bad link. It needs both an email address and a nonce.</p>"
                .to_string(),
        ),
        VerificationOutcome::Failed => (
            "Bad Info",
            format!("<p>The verification code for {escaped} is bad.</p>"),
        ),
        VerificationOutcome::Expired => (
            "Expired",
            format!(
                "<p>The verification code for {escaped} has expired. \
                 Add the address again from your settings to get a new link.</p>"
            ),
        ),
        VerificationOutcome::Redundant => (
            "Already Verified",
            format!("<p>Your email address {escaped} is already connected to your account.</p>"),
        ),
        VerificationOutcome::Succeeded => (
            "Success!",
            format!("<p>Your email address {escaped} is now connected to your account.</p>"),
        ),
    };

    Ok((StatusCode::OK, page(title, &body)))
}

#[derive(Serialize)]
pub struct EmailInfo {
    pub address: String,
    pub verified: bool,
    pub status: EmailStatus,
}

#[derive(Serialize)]
pub struct ListEmailsResponse {
    pub success: bool,
    pub emails: Vec<EmailInfo>,
}

/// GET /{username}/emails.json
pub async fn list_emails<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    Path(username): Path<String>,
    cookies: Cookies,
) -> Result<Json<ListEmailsResponse>, ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    let participant = super::session::require_participant(&cookies, &state, &username)?;
    let emails = state.emails().get_emails(&participant)?;

    Ok(Json(ListEmailsResponse {
        success: true,
        emails: emails
            .into_iter()
            .map(|e| EmailInfo {
                status: e.status(&participant),
                verified: e.verified,
                address: e.address,
            })
            .collect(),
    }))
}
