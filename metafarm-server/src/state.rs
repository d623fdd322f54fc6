//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::services::analysis::AnalysisWorker;
use crate::services::completion::VisionClient;

/// State shared across all HTTP handlers and, through the worker, every
/// background analysis task.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Analysis record store.
    pub store: Arc<SqliteStore>,
    /// Launches background analyses against `store`.
    pub worker: AnalysisWorker,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore, client: Arc<dyn VisionClient>) -> Self {
        let store = Arc::new(store);
        let worker = AnalysisWorker::new(Arc::clone(&store), client, config.max_in_flight);
        Self {
            config: Arc::new(config),
            store,
            worker,
        }
    }
}
