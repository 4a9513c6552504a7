//! Tipline server
//!
//! Email identity management and participant lookup for Tipline
//! accounts, served over HTTP.

pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod identity;
pub mod routes;
pub mod search;
pub mod state;
pub mod store;

pub use config::{Config, SiteConfig};
pub use email::{ConsoleEmailSender, EmailSender, OutboundEmail, SmtpConfig, SmtpEmailSender};
pub use error::ServiceError;
pub use identity::{AddEmailOutcome, EmailIdentity};
pub use state::AppState;
pub use store::{
    InMemoryParticipantStore, InMemorySessionStore, ParticipantStore, SessionStore, SqliteStore,
};
