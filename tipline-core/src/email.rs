//! Email entries attached to a participant

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::address::EmailAddress;
use crate::participant::{Participant, ParticipantId};
use crate::verification::generate_nonce;

/// Most email entries one participant may hold
pub const MAX_EMAIL_ADDRESSES: usize = 10;

/// One (participant, address) pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailEntry {
    pub address: String,
    pub participant: ParticipantId,
    /// Outstanding verification nonce; cleared once the address is verified
    pub nonce: Option<String>,
    /// When the current nonce was issued
    pub verification_start: DateTime<Utc>,
    pub verification_end: Option<DateTime<Utc>>,
    pub verified: bool,
}

impl EmailEntry {
    /// A fresh unverified entry with a newly generated nonce
    pub fn unverified(participant: ParticipantId, address: &EmailAddress, now: DateTime<Utc>) -> Self {
        Self {
            address: address.as_str().to_string(),
            participant,
            nonce: Some(generate_nonce()),
            verification_start: now,
            verification_end: None,
            verified: false,
        }
    }

    pub fn status(&self, owner: &Participant) -> EmailStatus {
        if self.verified && owner.is_primary(&self.address) {
            EmailStatus::Primary
        } else if self.verified {
            EmailStatus::Verified
        } else {
            EmailStatus::Unverified
        }
    }
}

/// How an entry is presented to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Primary,
    Verified,
    Unverified,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Primary => "primary",
            EmailStatus::Verified => "verified",
            EmailStatus::Unverified => "unverified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(primary: Option<&str>) -> Participant {
        Participant {
            id: ParticipantId(7),
            username: "alice".to_string(),
            email_address: primary.map(str::to_string),
            is_searchable: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unverified_entry_has_nonce() {
        let addr = EmailAddress::parse("alice@example.com").unwrap();
        let entry = EmailEntry::unverified(ParticipantId(7), &addr, Utc::now());
        assert!(!entry.verified);
        assert!(entry.nonce.is_some());
        assert_eq!(entry.status(&owner(None)), EmailStatus::Unverified);
    }

    #[test]
    fn test_status_reflects_primary() {
        let addr = EmailAddress::parse("alice@example.com").unwrap();
        let mut entry = EmailEntry::unverified(ParticipantId(7), &addr, Utc::now());
        entry.verified = true;
        entry.nonce = None;

        assert_eq!(entry.status(&owner(Some("alice@example.com"))), EmailStatus::Primary);
        assert_eq!(entry.status(&owner(Some("other@example.com"))), EmailStatus::Verified);
    }
}
