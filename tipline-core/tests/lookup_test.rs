//! Lookup merge and match strategy tests

use tipline_core::lookup::{merge, rank_candidates, SENTINEL_ID};
use tipline_core::{Candidate, MatchStrategy, ParticipantId, PrefixMatch, SubstringMatch};

fn candidate(id: i64, username: &str) -> Candidate {
    Candidate {
        id: ParticipantId(id),
        username: username.to_string(),
    }
}

/// Test: nothing found yields only the sentinel
#[test]
fn test_no_match_returns_sentinel() {
    let results = merge("alice", None, vec![]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, SENTINEL_ID);
    assert_eq!(results[0].username, "alice");
    assert!(results[0].is_sentinel());
}

/// Test: an exact match is returned alone, once
#[test]
fn test_exact_match_is_not_duplicated() {
    let alice = candidate(1, "alice");
    let results = merge("alice", Some(alice.clone()), vec![alice]);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 1);
}

/// Test: a broader match is followed by the sentinel
#[test]
fn test_broader_match_then_sentinel() {
    let results = merge("alic", None, vec![candidate(1, "alice")]);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, 1);
    assert_eq!(results[1].id, SENTINEL_ID);
}

/// Test: exact match comes before broader matches
#[test]
fn test_exact_match_first() {
    let results = merge(
        "al",
        Some(candidate(3, "al")),
        vec![candidate(1, "alice"), candidate(3, "al"), candidate(2, "alan")],
    );
    let ids: Vec<i64> = results.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

/// Test: prefix strategy rejects inner matches and ranks shorter names first
#[test]
fn test_prefix_strategy() {
    let strategy = PrefixMatch;
    assert_eq!(strategy.name(), "prefix");
    let ranked = rank_candidates(
        &strategy,
        "Al",
        vec![candidate(1, "alice"), candidate(2, "sal"), candidate(3, "Alan"), candidate(4, "al")],
        10,
    );
    let names: Vec<&str> = ranked.iter().map(|c| c.username.as_str()).collect();
    assert_eq!(names, vec!["al", "Alan", "alice"]);
}

/// Test: substring strategy accepts inner matches after prefix ones
#[test]
fn test_substring_strategy() {
    let ranked = rank_candidates(
        &SubstringMatch,
        "al",
        vec![candidate(2, "sal"), candidate(1, "alice")],
        10,
    );
    let names: Vec<&str> = ranked.iter().map(|c| c.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "sal"]);
}

/// Test: ranking honours the limit
#[test]
fn test_rank_limit() {
    let candidates = (0..20).map(|i| candidate(i, &format!("user{i:02}"))).collect();
    let ranked = rank_candidates(&PrefixMatch, "user", candidates, 10);
    assert_eq!(ranked.len(), 10);
    assert_eq!(ranked[0].username, "user00");
}
