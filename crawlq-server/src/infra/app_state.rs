use std::{fmt, sync::Arc};

use crawlq_core::coordinator::WorkQueueCoordinator;

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<WorkQueueCoordinator>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(coordinator: Arc<WorkQueueCoordinator>, config: Arc<Config>) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    pub fn coordinator(&self) -> &WorkQueueCoordinator {
        &self.coordinator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
