//! Error types for Tipline email identity

use thiserror::Error;

use crate::email::MAX_EMAIL_ADDRESSES;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Malformed email address: {0}")]
    MalformedAddress(String),

    #[error("Email address {0} is already connected to a different account")]
    EmailAlreadyTaken(String),

    #[error("Too many email addresses (maximum {max}), cannot add {address}", max = MAX_EMAIL_ADDRESSES)]
    TooManyEmailAddresses { address: String },

    #[error("Email address {0} is not verified")]
    EmailNotVerified(String),

    #[error("Cannot remove primary email address {0}")]
    CannotRemovePrimaryEmail(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),
}
