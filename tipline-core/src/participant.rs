//! Participant identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Longest accepted username
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Unique participant identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub i64);

/// A username that may be registered.
///
/// Usernames are 1 to 32 ASCII characters drawn from letters, digits,
/// `-`, `_` and `.`. Uniqueness is case-insensitive and enforced by the
/// store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_USERNAME_LENGTH
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidUsername(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

/// A participant account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub username: String,
    /// Current primary address; always one of the participant's verified addresses
    pub email_address: Option<String>,
    /// Whether the participant shows up in broader lookup matches
    pub is_searchable: bool,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    pub fn is_primary(&self, address: &str) -> bool {
        self.email_address.as_deref() == Some(address)
    }
}
