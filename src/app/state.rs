//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SimulationHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub simulation: SimulationHandle,
}

impl AppState {
    pub fn new(config: Config, simulation: SimulationHandle) -> Self {
        Self {
            config: Arc::new(config),
            simulation,
        }
    }
}
