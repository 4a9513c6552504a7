//! Email address shape checks
//!
//! Only the shape of an address is checked here. Whether anybody reads
//! mail at it is what the verification nonce establishes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// An email address with a plausible shape.
///
/// A valid address has a non-empty local part, an `@`, and a domain
/// made of at least two non-empty dot-separated labels. Surrounding
/// whitespace is trimmed; embedded whitespace is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        let malformed = || Error::MalformedAddress(raw.to_string());

        if trimmed.chars().any(char::is_whitespace) {
            return Err(malformed());
        }

        let (local, domain) = trimmed.rsplit_once('@').ok_or_else(malformed)?;
        if local.is_empty() || !domain.contains('.') {
            return Err(malformed());
        }
        if domain.split('.').any(str::is_empty) {
            return Err(malformed());
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the last `@`
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, d)| d).unwrap_or_default()
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
