//! Shared application state

use std::sync::Arc;

use tipline_core::{LookupMatch, MatchStrategy, PrefixMatch};

use crate::config::SiteConfig;
use crate::email::EmailSender;
use crate::identity::EmailIdentity;
use crate::search;
use crate::store::{ParticipantStore, SessionStore, StoreResult};

/// Application state handed to every route
pub struct AppState<U, S, E> {
    pub participant_store: Arc<U>,
    pub session_store: Arc<S>,
    pub email_sender: Arc<E>,
    pub site: SiteConfig,
    pub match_strategy: Arc<dyn MatchStrategy>,
}

impl<U, S, E> AppState<U, S, E>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    pub fn new(site: SiteConfig, participant_store: U, session_store: S, email_sender: E) -> Self {
        Self {
            participant_store: Arc::new(participant_store),
            session_store: Arc::new(session_store),
            email_sender: Arc::new(email_sender),
            site,
            match_strategy: Arc::new(PrefixMatch),
        }
    }

    /// Replace the broader-match strategy used by lookups
    pub fn with_match_strategy(mut self, strategy: impl MatchStrategy + 'static) -> Self {
        self.match_strategy = Arc::new(strategy);
        self
    }

    /// Email identity operations over this state's store and sender
    pub fn emails(&self) -> EmailIdentity<'_, U, E> {
        EmailIdentity::new(
            self.participant_store.as_ref(),
            self.email_sender.as_ref(),
            &self.site,
        )
    }

    pub fn lookup(&self, query: &str) -> StoreResult<Vec<LookupMatch>> {
        search::lookup(
            self.participant_store.as_ref(),
            self.match_strategy.as_ref(),
            query,
        )
    }
}
