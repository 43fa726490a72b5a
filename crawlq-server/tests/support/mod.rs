use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum_test::TestServer;
use chrono::DateTime;
use crawlq_core::coordinator::{
    CoordinatorConfig, InMemoryBacklogStore, ManualClock, WorkQueueCoordinator,
};
use crawlq_server::{AppState, create_app, infra::config::Config};

// Code is used by test modules, but not in this scope
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryBacklogStore>,
    pub clock: ManualClock,
    pub state: AppState,
}

#[allow(unused)]
pub fn build_test_app() -> Result<TestApp> {
    build_test_app_with(CoordinatorConfig::default())
}

#[allow(unused)]
pub fn build_test_app_with(coordinator: CoordinatorConfig) -> Result<TestApp> {
    let store = Arc::new(InMemoryBacklogStore::new());
    let clock = ManualClock::new(
        DateTime::from_timestamp(1_750_000_000, 0)
            .ok_or_else(|| anyhow!("invalid start time"))?,
    );

    let config = Config {
        coordinator: coordinator.clone(),
        ..Default::default()
    };
    let coordinator = Arc::new(WorkQueueCoordinator::with_clock(
        coordinator,
        store.clone(),
        Arc::new(clock.clone()),
    ));
    let state = AppState::new(coordinator, Arc::new(config));

    let server = TestServer::new(create_app(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        store,
        clock,
        state,
    })
}
