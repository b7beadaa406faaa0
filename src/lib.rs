pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod logging;
pub mod signature;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

pub use config::{DeployConfig, RepositoryConfig};
pub use dispatch::{DispatchOutcome, Dispatcher, PushEvent};
pub use error::DeployError;
pub use executor::{DeployExecutor, ExecutionReport, ShellExecutor};

/// Shared, read-only state handed to every request handler.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Arc<DeployConfig>, executor: Arc<dyn DeployExecutor>) -> Self {
        Self {
            dispatcher: Dispatcher::new(config, executor),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
