//! Tipline Core Library
//!
//! Rules for a participant's email identity and for participant lookup:
//! - Addresses are shape-checked before they are attached to an account
//! - Ownership of an address is proven with a nonce that expires after a day
//! - Outbound messages render to plain text and escaped HTML
//! - Lookups put the exact username match first and flag its absence

pub mod address;
pub mod email;
pub mod error;
pub mod lookup;
pub mod message;
pub mod participant;
pub mod verification;

pub use address::EmailAddress;
pub use email::{EmailEntry, EmailStatus, MAX_EMAIL_ADDRESSES};
pub use error::Error;
pub use lookup::{Candidate, LookupMatch, MatchStrategy, PrefixMatch, SubstringMatch};
pub use message::{MessageContext, MessageKind, RenderedMessage};
pub use participant::{Participant, ParticipantId, Username};
pub use verification::{Check, VerificationOutcome};

/// Result type for tipline-core operations
pub type Result<T> = std::result::Result<T, Error>;
