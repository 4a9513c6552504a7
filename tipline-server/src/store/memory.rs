//! In-memory storage implementations

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tipline_core::{
    Candidate, EmailEntry, Error as IdentityError, MessageContext, MessageKind, Participant,
    ParticipantId, Username,
};

use super::{
    ParticipantStore, QueuedMessage, Session, SessionId, SessionStore, StoreResult,
    SEARCH_CANDIDATE_LIMIT,
};
use crate::error::ServiceError;

struct Account {
    participant: Participant,
    password_hash: String,
}

/// In-memory participant store
pub struct InMemoryParticipantStore {
    accounts: RwLock<HashMap<ParticipantId, Account>>,
    /// Kept in insertion order
    emails: RwLock<Vec<EmailEntry>>,
    queue: RwLock<BTreeMap<i64, QueuedMessage>>,
    next_participant_id: AtomicI64,
    next_message_id: AtomicI64,
}

impl InMemoryParticipantStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            emails: RwLock::new(Vec::new()),
            queue: RwLock::new(BTreeMap::new()),
            next_participant_id: AtomicI64::new(1),
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Move the start of an entry's verification window (for testing purposes)
    pub fn set_verification_start(
        &self,
        id: ParticipantId,
        address: &str,
        started: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut emails = self.emails.write().unwrap();
        let entry = emails
            .iter_mut()
            .find(|e| e.participant == id && e.address == address)
            .ok_or(ServiceError::EmailNotFound)?;
        entry.verification_start = started;
        Ok(())
    }

    /// Number of messages waiting for the sweep
    pub fn queued_len(&self) -> usize {
        self.queue.read().unwrap().len()
    }
}

impl Default for InMemoryParticipantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantStore for InMemoryParticipantStore {
    fn create_participant(
        &self,
        username: &Username,
        password_hash: &str,
        is_searchable: bool,
    ) -> StoreResult<Participant> {
        let mut accounts = self.accounts.write().unwrap();
        let lower = username.lowercase();
        if accounts
            .values()
            .any(|a| a.participant.username.to_lowercase() == lower)
        {
            return Err(ServiceError::UsernameTaken);
        }

        let participant = Participant {
            id: ParticipantId(self.next_participant_id.fetch_add(1, Ordering::SeqCst)),
            username: username.as_str().to_string(),
            email_address: None,
            is_searchable,
            created_at: Utc::now(),
        };
        accounts.insert(
            participant.id,
            Account {
                participant: participant.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(participant)
    }

    fn get_participant(&self, id: ParticipantId) -> StoreResult<Option<Participant>> {
        let accounts = self.accounts.read().unwrap();
        Ok(accounts.get(&id).map(|a| a.participant.clone()))
    }

    fn get_participant_by_username(&self, username: &str) -> StoreResult<Option<Participant>> {
        let lower = username.to_lowercase();
        let accounts = self.accounts.read().unwrap();
        Ok(accounts
            .values()
            .find(|a| a.participant.username.to_lowercase() == lower)
            .map(|a| a.participant.clone()))
    }

    fn password_hash(&self, id: ParticipantId) -> StoreResult<Option<String>> {
        let accounts = self.accounts.read().unwrap();
        Ok(accounts.get(&id).map(|a| a.password_hash.clone()))
    }

    fn search_participants(&self, query: &str) -> StoreResult<Vec<Candidate>> {
        let lower = query.to_lowercase();
        let accounts = self.accounts.read().unwrap();
        let mut found: Vec<(usize, usize, String, Candidate)> = accounts
            .values()
            .map(|a| &a.participant)
            .filter(|p| p.is_searchable)
            .filter_map(|p| {
                let username_lower = p.username.to_lowercase();
                let position = username_lower.find(&lower)?;
                Some((
                    position,
                    username_lower.len(),
                    username_lower,
                    Candidate {
                        id: p.id,
                        username: p.username.clone(),
                    },
                ))
            })
            .collect();

        // Same order as the SQLite store, so the cap never drops early matches
        found.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));
        found.truncate(SEARCH_CANDIDATE_LIMIT);
        Ok(found.into_iter().map(|(_, _, _, c)| c).collect())
    }

    fn set_primary_email(&self, id: ParticipantId, address: &str) -> StoreResult<()> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts.get_mut(&id).ok_or(ServiceError::ParticipantNotFound)?;
        account.participant.email_address = Some(address.to_string());
        Ok(())
    }

    fn set_primary_email_if_unset(&self, id: ParticipantId, address: &str) -> StoreResult<bool> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts.get_mut(&id).ok_or(ServiceError::ParticipantNotFound)?;
        if account.participant.email_address.is_some() {
            return Ok(false);
        }
        account.participant.email_address = Some(address.to_string());
        Ok(true)
    }

    fn insert_email(&self, entry: &EmailEntry) -> StoreResult<()> {
        let mut emails = self.emails.write().unwrap();
        if emails
            .iter()
            .any(|e| e.participant == entry.participant && e.address == entry.address)
        {
            return Err(ServiceError::EmailAlreadyExists);
        }
        emails.push(entry.clone());
        Ok(())
    }

    fn get_email(&self, id: ParticipantId, address: &str) -> StoreResult<Option<EmailEntry>> {
        let emails = self.emails.read().unwrap();
        Ok(emails
            .iter()
            .find(|e| e.participant == id && e.address == address)
            .cloned())
    }

    fn list_emails(&self, id: ParticipantId) -> StoreResult<Vec<EmailEntry>> {
        let emails = self.emails.read().unwrap();
        Ok(emails.iter().filter(|e| e.participant == id).cloned().collect())
    }

    fn count_emails(&self, id: ParticipantId) -> StoreResult<usize> {
        let emails = self.emails.read().unwrap();
        Ok(emails.iter().filter(|e| e.participant == id).count())
    }

    fn verified_owner(&self, address: &str) -> StoreResult<Option<ParticipantId>> {
        let emails = self.emails.read().unwrap();
        Ok(emails
            .iter()
            .find(|e| e.verified && e.address == address)
            .map(|e| e.participant))
    }

    fn restart_verification(
        &self,
        id: ParticipantId,
        address: &str,
        started: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut emails = self.emails.write().unwrap();
        let entry = emails
            .iter_mut()
            .find(|e| e.participant == id && e.address == address && !e.verified)
            .ok_or(ServiceError::EmailNotFound)?;
        entry.verification_start = started;
        Ok(())
    }

    fn mark_email_verified(
        &self,
        id: ParticipantId,
        address: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut emails = self.emails.write().unwrap();
        if emails
            .iter()
            .any(|e| e.verified && e.address == address && e.participant != id)
        {
            return Err(IdentityError::EmailAlreadyTaken(address.to_string()).into());
        }

        let entry = emails
            .iter_mut()
            .find(|e| e.participant == id && e.address == address && !e.verified)
            .ok_or(ServiceError::EmailNotFound)?;
        entry.verified = true;
        entry.nonce = None;
        entry.verification_end = Some(at);
        Ok(())
    }

    fn remove_email(&self, id: ParticipantId, address: &str) -> StoreResult<()> {
        let mut emails = self.emails.write().unwrap();
        let before = emails.len();
        emails.retain(|e| !(e.participant == id && e.address == address));
        if emails.len() == before {
            return Err(ServiceError::EmailNotFound);
        }
        Ok(())
    }

    fn queue_message(
        &self,
        id: ParticipantId,
        kind: MessageKind,
        context: &MessageContext,
    ) -> StoreResult<i64> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.queue.write().unwrap().insert(
            message_id,
            QueuedMessage {
                id: message_id,
                participant: id,
                kind,
                context: context.clone(),
                queued_at: Utc::now(),
            },
        );
        Ok(message_id)
    }

    fn claim_queued_messages(&self, limit: usize) -> StoreResult<Vec<QueuedMessage>> {
        let mut queue = self.queue.write().unwrap();
        let ids: Vec<i64> = queue.keys().take(limit).copied().collect();
        Ok(ids.iter().filter_map(|id| queue.remove(id)).collect())
    }
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, participant: ParticipantId) -> StoreResult<Session> {
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            participant,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tipline_core::EmailAddress;

    fn alice(store: &InMemoryParticipantStore) -> Participant {
        let username = Username::parse("alice").unwrap();
        store.create_participant(&username, "hash", true).unwrap()
    }

    #[test]
    fn test_username_unique_case_insensitive() {
        let store = InMemoryParticipantStore::new();
        alice(&store);

        let result = store.create_participant(&Username::parse("ALICE").unwrap(), "hash", true);
        assert!(matches!(result, Err(ServiceError::UsernameTaken)));
        assert!(store.get_participant_by_username("Alice").unwrap().is_some());
    }

    #[test]
    fn test_verified_address_has_single_owner() {
        let store = InMemoryParticipantStore::new();
        let a = alice(&store);
        let b = store
            .create_participant(&Username::parse("bob").unwrap(), "hash", true)
            .unwrap();
        let addr = EmailAddress::parse("shared@example.com").unwrap();

        store.insert_email(&EmailEntry::unverified(a.id, &addr, Utc::now())).unwrap();
        store.insert_email(&EmailEntry::unverified(b.id, &addr, Utc::now())).unwrap();

        store.mark_email_verified(a.id, addr.as_str(), Utc::now()).unwrap();
        let result = store.mark_email_verified(b.id, addr.as_str(), Utc::now());
        assert!(matches!(
            result,
            Err(ServiceError::Identity(IdentityError::EmailAlreadyTaken(_)))
        ));
        assert_eq!(store.verified_owner(addr.as_str()).unwrap(), Some(a.id));
    }

    #[test]
    fn test_claim_removes_messages_in_order() {
        let store = InMemoryParticipantStore::new();
        let a = alice(&store);
        let ctx = MessageContext::default();
        let first = store.queue_message(a.id, MessageKind::Verification, &ctx).unwrap();
        let second = store.queue_message(a.id, MessageKind::VerificationNotice, &ctx).unwrap();

        let claimed = store.claim_queued_messages(1).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, first);

        let claimed = store.claim_queued_messages(10).unwrap();
        assert_eq!(claimed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second]);
        assert!(store.claim_queued_messages(10).unwrap().is_empty());
    }

    #[test]
    fn test_set_primary_only_when_unset() {
        let store = InMemoryParticipantStore::new();
        let a = alice(&store);

        assert!(store.set_primary_email_if_unset(a.id, "a@example.com").unwrap());
        assert!(!store.set_primary_email_if_unset(a.id, "b@example.com").unwrap());

        let a = store.get_participant(a.id).unwrap().unwrap();
        assert_eq!(a.email_address.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_search_keeps_earliest_matches_under_cap() {
        let store = InMemoryParticipantStore::new();
        for i in 0..SEARCH_CANDIDATE_LIMIT {
            store
                .create_participant(&Username::parse(&format!("zz{i:03}a")).unwrap(), "hash", true)
                .unwrap();
        }
        let a = alice(&store);

        let found = store.search_participants("a").unwrap();
        assert_eq!(found.len(), SEARCH_CANDIDATE_LIMIT);
        assert_eq!(found[0].id, a.id);
    }

    #[test]
    fn test_session_lifecycle() {
        let store = InMemorySessionStore::new();

        let session = store.create(ParticipantId(1)).unwrap();
        assert!(store.get(&session.id).unwrap().is_some());

        store.delete(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }
}
