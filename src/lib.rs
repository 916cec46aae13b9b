pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mission;
pub mod movement;
pub mod safety;
pub mod state;

pub use crate::config::ConfigManager;
pub use crate::error::{MissionError, Result};
pub use crate::executor::{
    MissionContext, MissionExecutor, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, POLL_INTERVAL,
};
pub use crate::mission::{Mission, MissionReport, StateHandler, StateHandlers};
pub use crate::movement::{MovementCommand, MovementController, MovementDirection, VelocityData};
pub use crate::safety::{LoggingSafetyMonitor, SafetyMonitor};
pub use crate::state::{MissionStatus, StateKey, Transition};
