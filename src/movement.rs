use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    Stop,
}

impl fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementDirection::Forward => write!(f, "forward"),
            MovementDirection::Backward => write!(f, "backward"),
            MovementDirection::Left => write!(f, "left"),
            MovementDirection::Right => write!(f, "right"),
            MovementDirection::Up => write!(f, "up"),
            MovementDirection::Down => write!(f, "down"),
            MovementDirection::Stop => write!(f, "stop"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementCommand {
    pub direction: MovementDirection,
    pub power: f64,
    pub duration: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl MovementCommand {
    pub fn new(direction: MovementDirection, power: f64) -> Self {
        MovementCommand {
            direction,
            // Thruster power is a percentage
            power: power.clamp(0.0, 100.0),
            duration: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn stop() -> Self {
        MovementCommand::new(MovementDirection::Stop, 0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityData {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

impl VelocityData {
    pub fn new(vx: f64, vy: f64, vz: f64) -> Self {
        VelocityData {
            vx,
            vy,
            vz,
            speed: (vx * vx + vy * vy + vz * vz).sqrt(),
            timestamp: Utc::now(),
        }
    }

    pub fn zero() -> Self {
        VelocityData::new(0.0, 0.0, 0.0)
    }
}

pub trait MovementController: Send + Sync {
    fn execute(&self, command: MovementCommand) -> Result<()>;

    // Must be safe to call repeatedly and from any context.
    fn emergency_stop(&self) -> Result<()>;
}
