//! Shared state for the web server.

use std::sync::Arc;

use crate::store::RecordStore;
use crate::web::auth::ApiKey;

/// State handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    store: Arc<RecordStore>,
    api_key: Option<ApiKey>,
}

impl AppState {
    /// Build state from an opened store and the configured secret.
    ///
    /// An empty secret is treated as not configured.
    pub fn new(store: RecordStore, api_key: Option<&str>) -> Self {
        Self {
            store: Arc::new(store),
            api_key: api_key.filter(|key| !key.is_empty()).map(ApiKey::new),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }
}
