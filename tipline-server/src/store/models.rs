//! Data models for server storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tipline_core::{MessageContext, MessageKind, ParticipantId};

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// A signed-in session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub participant: ParticipantId,
    pub created_at: DateTime<Utc>,
}

/// A message waiting for the outbound sweep
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    pub id: i64,
    pub participant: ParticipantId,
    pub kind: MessageKind,
    pub context: MessageContext,
    pub queued_at: DateTime<Utc>,
}
