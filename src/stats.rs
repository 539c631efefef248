//! Operational stats endpoint.

use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Stats {
    pub locked_vaults: u64,
    pub unlocked_vaults: u64,
    pub users: u64,
    pub access_logs: u64,
    pub uptime_seconds: i64,
    pub timestamp: String,
}

/// GET /stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<Stats>, ApiError> {
    let counts = state.db.counts().await?;
    let now = Utc::now();
    Ok(Json(Stats {
        locked_vaults: counts.locked_vaults,
        unlocked_vaults: counts.unlocked_vaults,
        users: counts.users,
        access_logs: counts.access_logs,
        uptime_seconds: (now - state.started_at).num_seconds(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, false),
    }))
}
