//! Participant lookup over a store

use tipline_core::lookup::{merge, rank_candidates, BROADER_MATCH_LIMIT};
use tipline_core::{Candidate, LookupMatch, MatchStrategy};

use crate::store::{ParticipantStore, StoreResult};

/// Exact match first, then ranked broader matches, then the sentinel if needed
pub fn lookup<U: ParticipantStore + ?Sized>(
    store: &U,
    strategy: &dyn MatchStrategy,
    query: &str,
) -> StoreResult<Vec<LookupMatch>> {
    let exact = store
        .get_participant_by_username(query)?
        .map(|p| Candidate {
            id: p.id,
            username: p.username,
        });

    let candidates = store.search_participants(query)?;
    let broader = rank_candidates(strategy, query, candidates, BROADER_MATCH_LIMIT);

    let results = merge(query, exact, broader);
    tracing::debug!(
        query = %query,
        strategy = strategy.name(),
        results = results.len(),
        "Lookup"
    );
    Ok(results)
}
