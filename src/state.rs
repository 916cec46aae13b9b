use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

// Concrete missions identify their phases with a fieldless enum that
// satisfies this bound.
pub trait StateKey:
    Copy + Eq + Hash + fmt::Debug + Send + Sync + Serialize + 'static
{
}

impl<T> StateKey for T where
    T: Copy + Eq + Hash + fmt::Debug + Send + Sync + Serialize + 'static
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    NotStarted,
    Running,
    Success,
    Failure,
    Emergency,
    Timeout,
}

impl MissionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MissionStatus::NotStarted | MissionStatus::Running)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, MissionStatus::Success | MissionStatus::Failure)
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionStatus::NotStarted => write!(f, "not_started"),
            MissionStatus::Running => write!(f, "running"),
            MissionStatus::Success => write!(f, "success"),
            MissionStatus::Failure => write!(f, "failure"),
            MissionStatus::Emergency => write!(f, "emergency"),
            MissionStatus::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Transition<S> {
    pub from: Option<S>,
    pub to: S,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
}
