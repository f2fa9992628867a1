pub mod calendar;
pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod services;
pub mod shell;
pub mod store;

use std::sync::Arc;

use calendar::CalendarService;
use services::UnreadTaskCounter;
use store::RemoteStore;

// Shared state для всего приложения
pub struct AppState {
    pub config: config::Config,
    pub calendar: CalendarService,
    pub tasks: UnreadTaskCounter,
}

impl AppState {
    pub fn new(config: config::Config, store: Arc<dyn RemoteStore>) -> Arc<Self> {
        let calendar = CalendarService::new(store.clone(), config.tables.events.clone());
        let tasks = UnreadTaskCounter::new(store, config.tables.task_assignments.clone());

        Arc::new(Self {
            config,
            calendar,
            tasks,
        })
    }
}
