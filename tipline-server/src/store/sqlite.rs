//! SQLite-based storage implementation

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
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

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const PARTICIPANT_COLUMNS: &str =
    "id, username, email_address, is_searchable, created_at";

const EMAIL_COLUMNS: &str =
    "address, participant, nonce, verification_start, verification_end, verified";

/// SQLite-based store implementing both ParticipantStore and SessionStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ServiceError> {
        let conn = Connection::open(path)?;

        // Enable foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Current schema version of the open database
    pub fn schema_version(&self) -> Result<i32, ServiceError> {
        let conn = self.conn.lock().unwrap();
        Self::get_schema_version(&conn)
    }

    /// Move the start of an entry's verification window (for testing purposes)
    pub fn set_verification_start(
        &self,
        id: ParticipantId,
        address: &str,
        started: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE emails SET verification_start = ?1 WHERE participant = ?2 AND address = ?3",
            params![started.to_rfc3339(), id.0, address],
        )?;

        if rows_affected == 0 {
            return Err(ServiceError::EmailNotFound);
        }
        Ok(())
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ServiceError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ServiceError> {
        let table_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })?)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ServiceError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                username_lower TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                email_address TEXT,
                is_searchable INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Email entries (several per participant)
            CREATE TABLE IF NOT EXISTS emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                participant INTEGER NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                nonce TEXT,
                verification_start TEXT NOT NULL,
                verification_end TEXT,
                verified INTEGER NOT NULL DEFAULT 0,
                UNIQUE (participant, address)
            );
            CREATE INDEX IF NOT EXISTS idx_emails_participant ON emails(participant);
            -- A verified address belongs to exactly one participant
            CREATE UNIQUE INDEX IF NOT EXISTS idx_emails_verified_address
                ON emails(address) WHERE verified = 1;

            -- Outbound messages waiting for the sweep
            CREATE TABLE IF NOT EXISTS email_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                participant INTEGER NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                context TEXT NOT NULL,
                queued_at TEXT NOT NULL
            );

            -- Sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                participant INTEGER NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn participant_from_row(row: &Row) -> rusqlite::Result<Participant> {
    let created_at: String = row.get(4)?;
    Ok(Participant {
        id: ParticipantId(row.get(0)?),
        username: row.get(1)?,
        email_address: row.get(2)?,
        is_searchable: row.get::<_, i32>(3)? != 0,
        created_at: parse_time(&created_at),
    })
}

fn email_from_row(row: &Row) -> rusqlite::Result<EmailEntry> {
    let verification_start: String = row.get(3)?;
    let verification_end: Option<String> = row.get(4)?;
    Ok(EmailEntry {
        address: row.get(0)?,
        participant: ParticipantId(row.get(1)?),
        nonce: row.get(2)?,
        verification_start: parse_time(&verification_start),
        verification_end: verification_end.as_deref().map(parse_time),
        verified: row.get::<_, i32>(5)? != 0,
    })
}

fn queued_from_row(row: &Row) -> rusqlite::Result<QueuedMessage> {
    let kind: String = row.get(2)?;
    let context: String = row.get(3)?;
    let queued_at: String = row.get(4)?;
    Ok(QueuedMessage {
        id: row.get(0)?,
        participant: ParticipantId(row.get(1)?),
        kind: kind.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
        })?,
        context: serde_json::from_str(&context).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
        })?,
        queued_at: parse_time(&queued_at),
    })
}

impl ParticipantStore for SqliteStore {
    fn create_participant(
        &self,
        username: &Username,
        password_hash: &str,
        is_searchable: bool,
    ) -> StoreResult<Participant> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO participants (username, username_lower, password_hash, is_searchable, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                username.as_str(),
                username.lowercase(),
                password_hash,
                is_searchable as i32,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                return ServiceError::UsernameTaken;
            }
            ServiceError::Internal(e.to_string())
        })?;

        Ok(Participant {
            id: ParticipantId(conn.last_insert_rowid()),
            username: username.as_str().to_string(),
            email_address: None,
            is_searchable,
            created_at: now,
        })
    }

    fn get_participant(&self, id: ParticipantId) -> StoreResult<Option<Participant>> {
        let conn = self.conn.lock().unwrap();

        Ok(conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?1"),
                params![id.0],
                participant_from_row,
            )
            .optional()?)
    }

    fn get_participant_by_username(&self, username: &str) -> StoreResult<Option<Participant>> {
        let conn = self.conn.lock().unwrap();

        Ok(conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE username_lower = ?1"),
                params![username.to_lowercase()],
                participant_from_row,
            )
            .optional()?)
    }

    fn password_hash(&self, id: ParticipantId) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();

        Ok(conn
            .query_row(
                "SELECT password_hash FROM participants WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn search_participants(&self, query: &str) -> StoreResult<Vec<Candidate>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, username FROM participants
             WHERE is_searchable = 1 AND instr(username_lower, ?1) > 0
             ORDER BY instr(username_lower, ?1), length(username_lower), username_lower
             LIMIT ?2",
        )?;

        let candidates = stmt
            .query_map(
                params![query.to_lowercase(), SEARCH_CANDIDATE_LIMIT as i64],
                |row| {
                    Ok(Candidate {
                        id: ParticipantId(row.get(0)?),
                        username: row.get(1)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(candidates)
    }

    fn set_primary_email(&self, id: ParticipantId, address: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE participants SET email_address = ?1 WHERE id = ?2",
            params![address, id.0],
        )?;

        if rows_affected == 0 {
            return Err(ServiceError::ParticipantNotFound);
        }
        Ok(())
    }

    fn set_primary_email_if_unset(&self, id: ParticipantId, address: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE participants SET email_address = ?1 WHERE id = ?2 AND email_address IS NULL",
            params![address, id.0],
        )?;
        if rows_affected > 0 {
            return Ok(true);
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM participants WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(ServiceError::ParticipantNotFound);
        }
        Ok(false)
    }

    fn insert_email(&self, entry: &EmailEntry) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO emails (address, participant, nonce, verification_start, verification_end, verified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.address,
                entry.participant.0,
                entry.nonce,
                entry.verification_start.to_rfc3339(),
                entry.verification_end.map(|t| t.to_rfc3339()),
                entry.verified as i32,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                return ServiceError::EmailAlreadyExists;
            }
            ServiceError::Internal(e.to_string())
        })?;

        Ok(())
    }

    fn get_email(&self, id: ParticipantId, address: &str) -> StoreResult<Option<EmailEntry>> {
        let conn = self.conn.lock().unwrap();

        Ok(conn
            .query_row(
                &format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE participant = ?1 AND address = ?2"),
                params![id.0, address],
                email_from_row,
            )
            .optional()?)
    }

    fn list_emails(&self, id: ParticipantId) -> StoreResult<Vec<EmailEntry>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {EMAIL_COLUMNS} FROM emails WHERE participant = ?1 ORDER BY id"
        ))?;

        let emails = stmt
            .query_map(params![id.0], email_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(emails)
    }

    fn count_emails(&self, id: ParticipantId) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM emails WHERE participant = ?1",
            params![id.0],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn verified_owner(&self, address: &str) -> StoreResult<Option<ParticipantId>> {
        let conn = self.conn.lock().unwrap();

        let owner: Option<i64> = conn
            .query_row(
                "SELECT participant FROM emails WHERE address = ?1 AND verified = 1",
                params![address],
                |row| row.get(0),
            )
            .optional()?;

        Ok(owner.map(ParticipantId))
    }

    fn restart_verification(
        &self,
        id: ParticipantId,
        address: &str,
        started: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "UPDATE emails SET verification_start = ?1
             WHERE participant = ?2 AND address = ?3 AND verified = 0",
            params![started.to_rfc3339(), id.0, address],
        )?;

        if rows_affected == 0 {
            return Err(ServiceError::EmailNotFound);
        }
        Ok(())
    }

    fn mark_email_verified(
        &self,
        id: ParticipantId,
        address: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE emails SET verified = 1, nonce = NULL, verification_end = ?1
                 WHERE participant = ?2 AND address = ?3 AND verified = 0",
                params![at.to_rfc3339(), id.0, address],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    return ServiceError::from(IdentityError::EmailAlreadyTaken(address.to_string()));
                }
                ServiceError::Internal(e.to_string())
            })?;

        if rows_affected == 0 {
            return Err(ServiceError::EmailNotFound);
        }
        Ok(())
    }

    fn remove_email(&self, id: ParticipantId, address: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn.execute(
            "DELETE FROM emails WHERE participant = ?1 AND address = ?2",
            params![id.0, address],
        )?;

        if rows_affected == 0 {
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
        let conn = self.conn.lock().unwrap();
        let context =
            serde_json::to_string(context).map_err(|e| ServiceError::Internal(e.to_string()))?;

        conn.execute(
            "INSERT INTO email_queue (participant, kind, context, queued_at) VALUES (?1, ?2, ?3, ?4)",
            params![id.0, kind.as_str(), context, Utc::now().to_rfc3339()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn claim_queued_messages(&self, limit: usize) -> StoreResult<Vec<QueuedMessage>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "DELETE FROM email_queue
             WHERE id IN (SELECT id FROM email_queue ORDER BY id LIMIT ?1)
             RETURNING id, participant, kind, context, queued_at",
        )?;

        let mut claimed = stmt
            .query_map(params![limit as i64], queued_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        // RETURNING gives no ordering guarantee
        claimed.sort_by_key(|m| m.id);
        Ok(claimed)
    }
}

impl SessionStore for SqliteStore {
    fn create(&self, participant: ParticipantId) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            participant,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO sessions (id, participant, created_at) VALUES (?1, ?2, ?3)",
            params![session.id.0, session.participant.0, session.created_at.to_rfc3339()],
        )?;

        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        Ok(conn
            .query_row(
                "SELECT id, participant, created_at FROM sessions WHERE id = ?1",
                params![session_id.0],
                |row| {
                    let created_at: String = row.get(2)?;
                    Ok(Session {
                        id: SessionId(row.get(0)?),
                        participant: ParticipantId(row.get(1)?),
                        created_at: parse_time(&created_at),
                    })
                },
            )
            .optional()?)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])?;

        Ok(())
    }
}

// Implement traits for Arc<SqliteStore> so the same store can back both participants and sessions
impl ParticipantStore for Arc<SqliteStore> {
    fn create_participant(
        &self,
        username: &Username,
        password_hash: &str,
        is_searchable: bool,
    ) -> StoreResult<Participant> {
        (**self).create_participant(username, password_hash, is_searchable)
    }

    fn get_participant(&self, id: ParticipantId) -> StoreResult<Option<Participant>> {
        (**self).get_participant(id)
    }

    fn get_participant_by_username(&self, username: &str) -> StoreResult<Option<Participant>> {
        (**self).get_participant_by_username(username)
    }

    fn password_hash(&self, id: ParticipantId) -> StoreResult<Option<String>> {
        (**self).password_hash(id)
    }

    fn search_participants(&self, query: &str) -> StoreResult<Vec<Candidate>> {
        (**self).search_participants(query)
    }

    fn set_primary_email(&self, id: ParticipantId, address: &str) -> StoreResult<()> {
        (**self).set_primary_email(id, address)
    }

    fn set_primary_email_if_unset(&self, id: ParticipantId, address: &str) -> StoreResult<bool> {
        (**self).set_primary_email_if_unset(id, address)
    }

    fn insert_email(&self, entry: &EmailEntry) -> StoreResult<()> {
        (**self).insert_email(entry)
    }

    fn get_email(&self, id: ParticipantId, address: &str) -> StoreResult<Option<EmailEntry>> {
        (**self).get_email(id, address)
    }

    fn list_emails(&self, id: ParticipantId) -> StoreResult<Vec<EmailEntry>> {
        (**self).list_emails(id)
    }

    fn count_emails(&self, id: ParticipantId) -> StoreResult<usize> {
        (**self).count_emails(id)
    }

    fn verified_owner(&self, address: &str) -> StoreResult<Option<ParticipantId>> {
        (**self).verified_owner(address)
    }

    fn restart_verification(
        &self,
        id: ParticipantId,
        address: &str,
        started: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).restart_verification(id, address, started)
    }

    fn mark_email_verified(
        &self,
        id: ParticipantId,
        address: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).mark_email_verified(id, address, at)
    }

    fn remove_email(&self, id: ParticipantId, address: &str) -> StoreResult<()> {
        (**self).remove_email(id, address)
    }

    fn queue_message(
        &self,
        id: ParticipantId,
        kind: MessageKind,
        context: &MessageContext,
    ) -> StoreResult<i64> {
        (**self).queue_message(id, kind, context)
    }

    fn claim_queued_messages(&self, limit: usize) -> StoreResult<Vec<QueuedMessage>> {
        (**self).claim_queued_messages(limit)
    }
}

impl SessionStore for Arc<SqliteStore> {
    fn create(&self, participant: ParticipantId) -> StoreResult<Session> {
        (**self).create(participant)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        (**self).get(session_id)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        (**self).delete(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tipline_core::EmailAddress;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

    fn participant(store: &SqliteStore, name: &str, searchable: bool) -> Participant {
        store
            .create_participant(&Username::parse(name).unwrap(), "hashed_password", searchable)
            .unwrap()
    }

    #[test]
    fn test_create_participant_and_lookup() {
        let (store, _dir) = create_test_store();

        let alice = participant(&store, "Alice", true);
        let found = store.get_participant_by_username("alice").unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert_eq!(found.username, "Alice");
        assert_eq!(store.password_hash(alice.id).unwrap().unwrap(), "hashed_password");
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (store, _dir) = create_test_store();

        participant(&store, "alice", true);
        let result = store.create_participant(&Username::parse("ALICE").unwrap(), "x", true);
        assert!(matches!(result, Err(ServiceError::UsernameTaken)));
    }

    #[test]
    fn test_email_entry_lifecycle() {
        let (store, _dir) = create_test_store();
        let alice = participant(&store, "alice", true);
        let addr = EmailAddress::parse("alice@example.com").unwrap();
        let entry = EmailEntry::unverified(alice.id, &addr, Utc::now());

        store.insert_email(&entry).unwrap();
        assert!(matches!(
            store.insert_email(&entry),
            Err(ServiceError::EmailAlreadyExists)
        ));

        let stored = store.get_email(alice.id, addr.as_str()).unwrap().unwrap();
        assert_eq!(stored.nonce, entry.nonce);
        assert!(!stored.verified);

        store.mark_email_verified(alice.id, addr.as_str(), Utc::now()).unwrap();
        let stored = store.get_email(alice.id, addr.as_str()).unwrap().unwrap();
        assert!(stored.verified);
        assert!(stored.nonce.is_none());
        assert!(stored.verification_end.is_some());

        store.remove_email(alice.id, addr.as_str()).unwrap();
        assert!(store.get_email(alice.id, addr.as_str()).unwrap().is_none());
    }

    #[test]
    fn test_verified_address_unique_across_participants() {
        let (store, _dir) = create_test_store();
        let alice = participant(&store, "alice", true);
        let bob = participant(&store, "bob", true);
        let addr = EmailAddress::parse("shared@example.com").unwrap();

        store.insert_email(&EmailEntry::unverified(alice.id, &addr, Utc::now())).unwrap();
        store.insert_email(&EmailEntry::unverified(bob.id, &addr, Utc::now())).unwrap();
        store.mark_email_verified(alice.id, addr.as_str(), Utc::now()).unwrap();

        let result = store.mark_email_verified(bob.id, addr.as_str(), Utc::now());
        assert!(matches!(
            result,
            Err(ServiceError::Identity(IdentityError::EmailAlreadyTaken(_)))
        ));
        assert_eq!(store.verified_owner(addr.as_str()).unwrap(), Some(alice.id));
    }

    #[test]
    fn test_list_emails_in_insertion_order() {
        let (store, _dir) = create_test_store();
        let alice = participant(&store, "alice", true);

        for raw in ["b@example.com", "a@example.com", "c@example.com"] {
            let addr = EmailAddress::parse(raw).unwrap();
            store.insert_email(&EmailEntry::unverified(alice.id, &addr, Utc::now())).unwrap();
        }

        let addresses: Vec<String> = store
            .list_emails(alice.id)
            .unwrap()
            .into_iter()
            .map(|e| e.address)
            .collect();
        assert_eq!(addresses, vec!["b@example.com", "a@example.com", "c@example.com"]);
        assert_eq!(store.count_emails(alice.id).unwrap(), 3);
    }

    #[test]
    fn test_search_skips_non_searchable() {
        let (store, _dir) = create_test_store();
        participant(&store, "alice", false);
        let alicia = participant(&store, "alicia", true);

        let found = store.search_participants("ALI").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, alicia.id);
    }

    #[test]
    fn test_set_primary_only_when_unset() {
        let (store, _dir) = create_test_store();
        let alice = participant(&store, "alice", true);

        assert!(store.set_primary_email_if_unset(alice.id, "a@example.com").unwrap());
        assert!(!store.set_primary_email_if_unset(alice.id, "b@example.com").unwrap());

        let alice = store.get_participant(alice.id).unwrap().unwrap();
        assert_eq!(alice.email_address.as_deref(), Some("a@example.com"));

        let result = store.set_primary_email_if_unset(ParticipantId(999), "c@example.com");
        assert!(matches!(result, Err(ServiceError::ParticipantNotFound)));
    }

    #[test]
    fn test_queue_claim_is_destructive() {
        let (store, _dir) = create_test_store();
        let larry = participant(&store, "larry", true);
        let ctx = MessageContext {
            username: "larry".to_string(),
            ..Default::default()
        };

        let id = store.queue_message(larry.id, MessageKind::Verification, &ctx).unwrap();

        let claimed = store.claim_queued_messages(60).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, id);
        assert_eq!(claimed[0].kind, MessageKind::Verification);
        assert_eq!(claimed[0].context, ctx);

        assert!(store.claim_queued_messages(60).unwrap().is_empty());
    }

    #[test]
    fn test_session_lifecycle() {
        let (store, _dir) = create_test_store();
        let alice = participant(&store, "alice", true);

        let session = store.create(alice.id).unwrap();
        assert_eq!(store.get(&session.id).unwrap().unwrap().participant, alice.id);

        store.delete(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            participant(&store, "alice", true);
        }

        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        assert!(store.get_participant_by_username("alice").unwrap().is_some());
    }
}
