use crate::error::Result;
use crate::executor::MissionContext;
use crate::state::{MissionStatus, StateKey, Transition};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

pub type StateHandler<M> =
    fn(&mut M, &mut MissionContext<'_, <M as Mission>::State>) -> Result<()>;

pub type StateHandlers<M> = HashMap<<M as Mission>::State, StateHandler<M>>;

// The contract a concrete mission implements to run under the executor.
// Handlers drive the mission by requesting transitions and retries through
// the MissionContext they are given on every invocation.
pub trait Mission: Send + 'static {
    type State: StateKey;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn initial_state(&self) -> Self::State;

    fn state_handlers(&self) -> StateHandlers<Self>
    where
        Self: Sized;

    // Must be idempotent: the executor may call this from either the caller
    // or the loop context, and more than once.
    fn cleanup_resources(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionReport<S: StateKey> {
    pub mission_id: Uuid,
    pub mission_name: String,
    pub status: MissionStatus,
    pub duration_secs: f64,
    pub current_state: Option<S>,
    pub state_history: Vec<Transition<S>>,
    pub retry_counts: HashMap<S, u32>,
    pub timeout_secs: f64,
    pub completed: bool,
}
