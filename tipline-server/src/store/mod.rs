//! Storage abstractions for the server

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemoryParticipantStore, InMemorySessionStore};
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use tipline_core::{
    Candidate, EmailEntry, MessageContext, MessageKind, Participant, ParticipantId, Username,
};

use crate::error::ServiceError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ServiceError>;

/// Most lookup candidates a store hands back for ranking
pub const SEARCH_CANDIDATE_LIMIT: usize = 100;

/// Participants, their email entries, and the outbound message queue
pub trait ParticipantStore: Send + Sync {
    /// Create a participant; fails with `UsernameTaken` on a case-insensitive clash
    fn create_participant(
        &self,
        username: &Username,
        password_hash: &str,
        is_searchable: bool,
    ) -> StoreResult<Participant>;

    fn get_participant(&self, id: ParticipantId) -> StoreResult<Option<Participant>>;

    /// Case-insensitive username lookup
    fn get_participant_by_username(&self, username: &str) -> StoreResult<Option<Participant>>;

    fn password_hash(&self, id: ParticipantId) -> StoreResult<Option<String>>;

    /// Searchable participants whose username contains `query`, case-insensitively
    fn search_participants(&self, query: &str) -> StoreResult<Vec<Candidate>>;

    /// Point the participant's primary address at `address`
    fn set_primary_email(&self, id: ParticipantId, address: &str) -> StoreResult<()>;

    /// Make `address` primary only if the participant has none yet.
    ///
    /// Returns whether it was set. The check and the write are one step.
    fn set_primary_email_if_unset(&self, id: ParticipantId, address: &str) -> StoreResult<bool>;

    /// Insert a new entry; fails with `EmailAlreadyExists` if the participant has it
    fn insert_email(&self, entry: &EmailEntry) -> StoreResult<()>;

    fn get_email(&self, id: ParticipantId, address: &str) -> StoreResult<Option<EmailEntry>>;

    /// All entries of a participant in insertion order
    fn list_emails(&self, id: ParticipantId) -> StoreResult<Vec<EmailEntry>>;

    fn count_emails(&self, id: ParticipantId) -> StoreResult<usize>;

    /// The participant that has verified `address`, if any
    fn verified_owner(&self, address: &str) -> StoreResult<Option<ParticipantId>>;

    /// Restart the window of an unverified entry, keeping its nonce
    fn restart_verification(
        &self,
        id: ParticipantId,
        address: &str,
        started: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Mark an unverified entry verified and clear its nonce.
    ///
    /// Fails with `EmailAlreadyTaken` when another participant has verified
    /// the address, and `EmailNotFound` when there is no unverified entry.
    fn mark_email_verified(
        &self,
        id: ParticipantId,
        address: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    fn remove_email(&self, id: ParticipantId, address: &str) -> StoreResult<()>;

    fn queue_message(
        &self,
        id: ParticipantId,
        kind: MessageKind,
        context: &MessageContext,
    ) -> StoreResult<i64>;

    /// Remove up to `limit` queued messages, oldest first, and return them.
    ///
    /// A claimed message is gone from the queue, so concurrent sweeps never
    /// see the same message twice.
    fn claim_queued_messages(&self, limit: usize) -> StoreResult<Vec<QueuedMessage>>;
}

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for a participant
    fn create(&self, participant: ParticipantId) -> StoreResult<Session>;

    /// Get a session by ID
    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Delete a session
    fn delete(&self, session_id: &SessionId) -> StoreResult<()>;
}
