//! Participant lookup endpoint

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use tipline_core::LookupMatch;

use crate::email::EmailSender;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::{ParticipantStore, SessionStore};

#[derive(Deserialize)]
pub struct LookupQuery {
    pub query: Option<String>,
}

/// GET /lookup.json
pub async fn lookup_json<U, S, E>(
    State(state): State<Arc<AppState<U, S, E>>>,
    Query(params): Query<LookupQuery>,
) -> Result<Json<Vec<LookupMatch>>, ServiceError>
where
    U: ParticipantStore,
    S: SessionStore,
    E: EmailSender,
{
    let query = params
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ServiceError::ValidationError("query parameter required".to_string()))?;

    Ok(Json(state.lookup(&query)?))
}
