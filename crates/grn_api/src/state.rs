//! Shared application state.

use crate::auth::JwtState;
use crate::error::{ApiError, ApiResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Settings for WhatsApp share links.
#[derive(Debug, Clone, Default)]
pub struct ShareSettings {
    /// Replaces the leading `0` of local phone numbers.
    pub default_country_code: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub jwt_state: Arc<JwtState>,
    pub share: Arc<ShareSettings>,
}

impl AppState {
    /// `conn` must come from `grn_core::db::open_db*` so migrations are applied.
    pub fn new(conn: Connection, jwt_state: JwtState, share: ShareSettings) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            jwt_state: Arc::new(jwt_state),
            share: Arc::new(share),
        }
    }

    /// Runs one use case while holding the connection lock.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let mut conn = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))?;
        f(&mut conn)
    }
}
