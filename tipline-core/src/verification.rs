//! Nonce-based proof of address ownership
//!
//! A verification attempt is evaluated against the stored entry before
//! anything is written. The checks run in a fixed order: missing input,
//! unknown entry, already verified, nonce mismatch, expiry. Only an
//! attempt that clears all of them may mark the entry verified.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::email::EmailEntry;

/// Hours a nonce stays valid after `verification_start`
pub const NONCE_TTL_HOURS: i64 = 24;

/// Result of a verification attempt shown to the participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Address or nonce was not supplied
    Missing,
    /// No such entry, or the nonce does not match
    Failed,
    /// The address is already verified for this participant
    Redundant,
    /// The nonce is older than [`NONCE_TTL_HOURS`]
    Expired,
    Succeeded,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationOutcome::Missing => "missing",
            VerificationOutcome::Failed => "failed",
            VerificationOutcome::Redundant => "redundant",
            VerificationOutcome::Expired => "expired",
            VerificationOutcome::Succeeded => "succeeded",
        }
    }
}

/// What to do with an attempt before touching storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// The attempt ends here with this outcome; nothing is written
    Settled(VerificationOutcome),
    /// Nonce matches and is fresh; the entry may be marked verified
    Accept,
}

/// Generate an opaque verification nonce
pub fn generate_nonce() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn nonce_ttl() -> Duration {
    Duration::hours(NONCE_TTL_HOURS)
}

/// Whether a nonce issued at `started` is past its lifetime at `now`
pub fn is_expired(started: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - started > nonce_ttl()
}

/// Evaluate a verification attempt against the stored entry
pub fn check_attempt(
    entry: Option<&EmailEntry>,
    address: &str,
    nonce: &str,
    now: DateTime<Utc>,
) -> Check {
    if address.is_empty() || nonce.is_empty() {
        return Check::Settled(VerificationOutcome::Missing);
    }

    let Some(entry) = entry else {
        return Check::Settled(VerificationOutcome::Failed);
    };

    if entry.verified {
        return Check::Settled(VerificationOutcome::Redundant);
    }

    let matches = entry
        .nonce
        .as_deref()
        .map(|stored| bool::from(stored.as_bytes().ct_eq(nonce.as_bytes())))
        .unwrap_or(false);
    if !matches {
        return Check::Settled(VerificationOutcome::Failed);
    }

    if is_expired(entry.verification_start, now) {
        return Check::Settled(VerificationOutcome::Expired);
    }

    Check::Accept
}
