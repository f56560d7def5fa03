//! Game simulation modules

pub mod entity;
pub mod player;
pub mod simulation;
pub mod snapshot;
pub mod vector;
pub mod world;

pub use simulation::{LoopState, Simulation, SimulationHandle};
pub use vector::{Dimensions, Vector};

use serde::{Deserialize, Serialize};

/// Directional key state reported by a client. Unrecognized keys are ignored
/// and missing keys read as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Simulation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Connection already joined: {0}")]
    DuplicateConnection(String),

    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid mass {0}, must be positive")]
    InvalidMass(f32),

    #[error("Simulation is not running")]
    SimulationStopped,
}
