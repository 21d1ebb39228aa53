use crate::config::Config;
use crate::provider::FileProvider;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<FileProvider>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, provider: FileProvider) -> Self {
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            start_time: Instant::now(),
        }
    }
}
