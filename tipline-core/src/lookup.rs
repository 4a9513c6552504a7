//! Participant lookup policy
//!
//! A lookup combines an exact username match with a broader match over
//! searchable participants. Which broader matches qualify, and in what
//! order, is decided by a [`MatchStrategy`].
//!
//! # Invariants
//! - An exact match is always returned first, searchable or not.
//! - The exact match never appears twice.
//! - When there is no exact match the sentinel `{id: -1}` is appended, so
//!   a lookup never returns an empty list.

use serde::Serialize;

use crate::participant::ParticipantId;

/// Id of the sentinel entry meaning "no exact match"
pub const SENTINEL_ID: i64 = -1;

/// Most broader matches returned by one lookup
pub const BROADER_MATCH_LIMIT: usize = 10;

/// A participant considered by a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: ParticipantId,
    pub username: String,
}

/// One element of a lookup response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupMatch {
    pub id: i64,
    pub username: String,
}

impl LookupMatch {
    pub fn sentinel(query: &str) -> Self {
        Self {
            id: SENTINEL_ID,
            username: query.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == SENTINEL_ID
    }
}

impl From<Candidate> for LookupMatch {
    fn from(c: Candidate) -> Self {
        Self {
            id: c.id.0,
            username: c.username,
        }
    }
}

/// Decides which usernames broadly match a query and how they rank.
///
/// Both arguments are lowercased. Stores hand a strategy only candidates
/// whose username contains the query, so a strategy narrows that set and
/// orders it; it cannot widen it.
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` rejects the candidate; lower ranks sort first
    fn rank(&self, query: &str, username: &str) -> Option<(usize, usize)>;
}

/// Usernames starting with the query, shortest first
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixMatch;

impl MatchStrategy for PrefixMatch {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn rank(&self, query: &str, username: &str) -> Option<(usize, usize)> {
        username
            .starts_with(query)
            .then(|| (0, username.len() - query.len()))
    }
}

/// Usernames containing the query, earliest occurrence first
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatch;

impl MatchStrategy for SubstringMatch {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn rank(&self, query: &str, username: &str) -> Option<(usize, usize)> {
        username
            .find(query)
            .map(|pos| (pos, username.len() - query.len()))
    }
}

/// Filter and order broader-match candidates with `strategy`
pub fn rank_candidates(
    strategy: &dyn MatchStrategy,
    query: &str,
    candidates: Vec<Candidate>,
    limit: usize,
) -> Vec<Candidate> {
    let query = query.to_lowercase();
    let mut ranked: Vec<_> = candidates
        .into_iter()
        .filter_map(|c| {
            let lower = c.username.to_lowercase();
            strategy.rank(&query, &lower).map(|rank| (rank, lower, c))
        })
        .collect();

    ranked.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    ranked.into_iter().take(limit).map(|(_, _, c)| c).collect()
}

/// Assemble the response: exact match, broader matches, then the sentinel
pub fn merge(query: &str, exact: Option<Candidate>, broader: Vec<Candidate>) -> Vec<LookupMatch> {
    let exact_id = exact.as_ref().map(|c| c.id);
    let mut results = Vec::with_capacity(broader.len() + 1);

    let has_exact = exact.is_some();
    if let Some(c) = exact {
        results.push(LookupMatch::from(c));
    }

    results.extend(
        broader
            .into_iter()
            .filter(|c| Some(c.id) != exact_id)
            .map(LookupMatch::from),
    );

    if !has_exact {
        results.push(LookupMatch::sentinel(query));
    }

    results
}
