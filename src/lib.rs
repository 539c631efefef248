pub mod api;
pub mod database;
pub mod entity;
pub mod error;
pub mod ipfs;
pub mod log;
pub mod monitoring;
pub mod stats;
pub mod sweep;
pub mod unlock;

use chrono::{DateTime, Utc};

use database::VaultDatabase;

/// Shared state handed to every request handler.
pub struct AppState {
    pub db: VaultDatabase,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: VaultDatabase) -> Self {
        Self {
            db,
            started_at: Utc::now(),
        }
    }
}
