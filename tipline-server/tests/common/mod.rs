//! Common test utilities for server integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::RwLock;

use axum_test::TestServer;
use tipline_core::{Participant, Username};
use tipline_server::{
    routes, AppState, EmailSender, InMemoryParticipantStore, InMemorySessionStore,
    OutboundEmail, ParticipantStore, SessionStore, SiteConfig,
};

pub type TestState = AppState<InMemoryParticipantStore, InMemorySessionStore, MockEmailSender>;

pub const SESSION_COOKIE: &str = "tipline_session";

/// Mock email sender that captures every outbound message
#[derive(Default, Clone)]
pub struct MockEmailSender {
    pub sent: Arc<RwLock<Vec<OutboundEmail>>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    pub fn last_email(&self) -> Option<OutboundEmail> {
        self.sent.read().unwrap().last().cloned()
    }

    /// Every message sent to `to`, oldest first
    pub fn sent_to(&self, to: &str) -> Vec<OutboundEmail> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.to == to)
            .cloned()
            .collect()
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, email: &OutboundEmail) -> Result<(), String> {
        self.sent.write().unwrap().push(email.clone());
        Ok(())
    }
}

pub fn test_site() -> SiteConfig {
    SiteConfig::new("https://tipline.example/", "Tipline").unwrap()
}

/// Create a test server with a mock email sender
pub fn create_test_server() -> (TestServer, Arc<TestState>, MockEmailSender) {
    let email_sender = MockEmailSender::new();

    let state = Arc::new(AppState::new(
        test_site(),
        InMemoryParticipantStore::new(),
        InMemorySessionStore::new(),
        email_sender.clone(),
    ));

    let app = routes::create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, state, email_sender)
}

/// Create a participant directly in the store and sign them in.
///
/// Returns the participant and the session cookie value.
pub fn make_participant(state: &TestState, name: &str, searchable: bool) -> (Participant, String) {
    let username = Username::parse(name).unwrap();
    let participant = state
        .participant_store
        .create_participant(&username, "not-a-real-hash", searchable)
        .unwrap();
    let session = state.session_store.create(participant.id).unwrap();
    (participant, session.id.0)
}

/// Add and verify `address` for the participant without going through HTTP
pub fn verify_directly(state: &TestState, participant: &Participant, address: &str) {
    state.emails().add_email(participant, address).unwrap();
    let nonce = state
        .emails()
        .get_email(participant, address)
        .unwrap()
        .unwrap()
        .nonce
        .unwrap();
    state.emails().verify_email(participant, address, &nonce).unwrap();
}

/// Reload the participant from the store
pub fn reload(state: &TestState, participant: &Participant) -> Participant {
    state
        .participant_store
        .get_participant(participant.id)
        .unwrap()
        .unwrap()
}

pub fn session_cookie(session: &str) -> cookie::Cookie<'static> {
    cookie::Cookie::new(SESSION_COOKIE, session.to_string())
}
