use crate::config::ConfigManager;
use crate::error::MissionError;
use crate::mission::{Mission, MissionReport, StateHandlers};
use crate::movement::MovementController;
use crate::safety::SafetyMonitor;
use crate::state::{MissionStatus, StateKey, Transition};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_TIMEOUT_SECS: f64 = 180.0;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

// Everything mutable that both the caller and the loop touch. The flags are
// atomics; the rest lives behind one mutex that is never held across an
// await point.
struct Shared<S: StateKey> {
    mission_id: Uuid,
    mission_name: &'static str,
    timeout: Duration,
    running: AtomicBool,
    paused: AtomicBool,
    core: Mutex<Core<S>>,
}

struct Core<S: StateKey> {
    status: MissionStatus,
    current_state: Option<S>,
    previous_state: Option<S>,
    state_started: Option<Instant>,
    mission_started: Option<Instant>,
    state_history: Vec<Transition<S>>,
    retry_counts: HashMap<S, u32>,
}

impl<S: StateKey> Core<S> {
    fn new() -> Self {
        Core {
            status: MissionStatus::NotStarted,
            current_state: None,
            previous_state: None,
            state_started: None,
            mission_started: None,
            state_history: Vec::new(),
            retry_counts: HashMap::new(),
        }
    }

    fn mission_duration(&self) -> Duration {
        self.mission_started
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    fn state_duration(&self) -> Duration {
        self.state_started
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    fn transition_to(&mut self, new_state: S) {
        if self.current_state == Some(new_state) {
            return;
        }

        log::info!("State transition: {:?} -> {:?}", self.current_state, new_state);

        let duration_secs = if self.current_state.is_some() {
            self.state_duration().as_secs_f64()
        } else {
            0.0
        };
        self.state_history.push(Transition {
            from: self.current_state,
            to: new_state,
            timestamp: Utc::now(),
            duration_secs,
        });

        self.previous_state = self.current_state;
        self.current_state = Some(new_state);
        self.state_started = Some(Instant::now());

        self.retry_counts.entry(new_state).or_insert(0);
    }

    fn check_timeout(&mut self, timeout: Duration) -> bool {
        if self.mission_duration() > timeout {
            log::error!("Mission timeout after {:.1}s", timeout.as_secs_f64());
            self.status = MissionStatus::Timeout;
            true
        } else {
            false
        }
    }

    fn retry_current_state(&mut self, max_retries: u32) -> bool {
        let state = match self.current_state {
            Some(state) => state,
            None => return false,
        };

        let retries = self.retry_counts.get(&state).copied().unwrap_or(0);
        if retries < max_retries {
            self.retry_counts.insert(state, retries + 1);
            log::warn!(
                "Retrying {:?} (attempt {}/{})",
                state,
                retries + 1,
                max_retries
            );
            self.state_started = Some(Instant::now());
            true
        } else {
            log::error!("Max retries ({}) reached for {:?}", max_retries, state);
            false
        }
    }
}

// Handed to state handlers on every invocation; the only way mission code
// mutates executor state.
pub struct MissionContext<'a, S: StateKey> {
    core: &'a mut Core<S>,
    running: &'a AtomicBool,
}

impl<'a, S: StateKey> MissionContext<'a, S> {
    pub fn current_state(&self) -> Option<S> {
        self.core.current_state
    }

    pub fn previous_state(&self) -> Option<S> {
        self.core.previous_state
    }

    pub fn transition_to(&mut self, new_state: S) {
        self.core.transition_to(new_state);
    }

    pub fn state_duration(&self) -> Duration {
        self.core.state_duration()
    }

    pub fn mission_duration(&self) -> Duration {
        self.core.mission_duration()
    }

    pub fn retries(&self, state: S) -> u32 {
        self.core.retry_counts.get(&state).copied().unwrap_or(0)
    }

    pub fn retry_current_state(&mut self, max_retries: u32) -> bool {
        self.core.retry_current_state(max_retries)
    }

    pub fn succeed(&mut self) {
        self.finish(MissionStatus::Success);
    }

    pub fn fail(&mut self) {
        self.finish(MissionStatus::Failure);
    }

    fn finish(&mut self, status: MissionStatus) {
        self.core.status = status;
        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct MissionExecutor<M: Mission> {
    shared: Arc<Shared<M::State>>,
    mission: Arc<Mutex<M>>,
    movement: Option<Arc<dyn MovementController>>,
    safety: Arc<dyn SafetyMonitor>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<M: Mission> MissionExecutor<M> {
    pub fn new(mission: M, config: &ConfigManager, safety: Arc<dyn SafetyMonitor>) -> Self {
        let timeout = config.get_f64("missions.default_timeout", DEFAULT_TIMEOUT_SECS);
        let mission_name = mission.name();

        log::info!("{} initialized", mission_name);

        MissionExecutor {
            shared: Arc::new(Shared {
                mission_id: Uuid::new_v4(),
                mission_name,
                timeout: Duration::from_secs_f64(timeout),
                running: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                core: Mutex::new(Core::new()),
            }),
            mission: Arc::new(Mutex::new(mission)),
            movement: None,
            safety,
            loop_handle: Mutex::new(None),
        }
    }

    pub fn with_movement(mut self, movement: Arc<dyn MovementController>) -> Self {
        self.movement = Some(movement);
        self
    }

    // Seeds the initial state and launches the control loop; returns
    // immediately. False if the mission is already running or has already
    // finished (executors are single-shot).
    pub async fn start(&self) -> bool {
        let (initial, handlers) = {
            let mission = self.mission.lock();
            (mission.initial_state(), mission.state_handlers())
        };

        {
            let mut core = self.shared.core.lock();
            if self.shared.running.load(Ordering::SeqCst) {
                log::warn!("{} is already running", self.shared.mission_name);
                return false;
            }
            if core.status != MissionStatus::NotStarted {
                log::warn!(
                    "{} has already finished and cannot be restarted",
                    self.shared.mission_name
                );
                return false;
            }

            log::info!("Starting {}", self.shared.mission_name);
            core.status = MissionStatus::Running;
            core.mission_started = Some(Instant::now());
            core.transition_to(initial);
        }
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let mission = Arc::clone(&self.mission);
        let movement = self.movement.clone();
        let safety = Arc::clone(&self.safety);
        let handle = tokio::spawn(async move {
            mission_loop(shared, mission, handlers, movement, safety).await;
        });
        *self.loop_handle.lock() = Some(handle);

        true
    }

    // Cooperative cancellation: waits a bounded interval for the loop to
    // observe the cleared flag, then runs cleanup regardless. A mission
    // stopped before reaching a terminal status is recorded as failed.
    pub async fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }

        log::info!("Stopping {}", self.shared.mission_name);

        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Mission loop join failed: {}", e),
                Err(_) => log::warn!(
                    "Mission loop did not stop within {:?}, continuing with cleanup",
                    JOIN_TIMEOUT
                ),
            }
        }

        if let Err(e) = self.mission.lock().cleanup_resources() {
            log::error!("Cleanup failed: {}", e);
        }

        let mut core = self.shared.core.lock();
        if core.status == MissionStatus::Running {
            core.status = MissionStatus::Failure;
        }
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
        log::info!("Paused {}", self.shared.mission_name);
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
        log::info!("Resumed {}", self.shared.mission_name);
    }

    pub fn emergency_stop(&self) {
        emergency(
            &self.shared,
            &self.mission,
            self.movement.as_deref(),
            self.safety.as_ref(),
            "commanded emergency stop",
        );
    }

    pub fn get_mission_report(&self) -> MissionReport<M::State> {
        let core = self.shared.core.lock();
        MissionReport {
            mission_id: self.shared.mission_id,
            mission_name: self.shared.mission_name.to_string(),
            status: core.status,
            duration_secs: core.mission_duration().as_secs_f64(),
            current_state: core.current_state,
            state_history: core.state_history.clone(),
            retry_counts: core.retry_counts.clone(),
            timeout_secs: self.shared.timeout.as_secs_f64(),
            completed: core.status.is_completed(),
        }
    }

    pub fn status(&self) -> MissionStatus {
        self.shared.core.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn mission_id(&self) -> Uuid {
        self.shared.mission_id
    }

    pub fn timeout(&self) -> Duration {
        self.shared.timeout
    }
}

async fn mission_loop<M: Mission>(
    shared: Arc<Shared<M::State>>,
    mission: Arc<Mutex<M>>,
    handlers: StateHandlers<M>,
    movement: Option<Arc<dyn MovementController>>,
    safety: Arc<dyn SafetyMonitor>,
) {
    while shared.running.load(Ordering::SeqCst) {
        if shared.paused.load(Ordering::SeqCst) {
            sleep(POLL_INTERVAL).await;
            continue;
        }

        if shared.core.lock().check_timeout(shared.timeout) {
            emergency(
                &shared,
                &mission,
                movement.as_deref(),
                safety.as_ref(),
                "mission timeout",
            );
            break;
        }

        // Dispatch the current state's handler; any handler fault is fatal
        // at the mission level.
        let outcome = {
            let mut mission = mission.lock();
            let mut core = shared.core.lock();
            match core.current_state {
                Some(state) => match handlers.get(&state).copied() {
                    Some(handler) => {
                        let mut context = MissionContext {
                            core: &mut *core,
                            running: &shared.running,
                        };
                        handler(&mut *mission, &mut context).map_err(|e| {
                            MissionError::Handler(format!("in state {:?}: {}", state, e))
                        })
                    }
                    None => Err(MissionError::UnknownState(format!("{:?}", state))),
                },
                None => Err(MissionError::UnknownState("no current state".to_string())),
            }
        };

        if let Err(e) = outcome {
            log::error!("{}", e);
            emergency(
                &shared,
                &mission,
                movement.as_deref(),
                safety.as_ref(),
                &e.to_string(),
            );
            break;
        }

        sleep(POLL_INTERVAL).await;
    }

    shared.running.store(false, Ordering::SeqCst);
    let status = shared.core.lock().status;
    log::info!("Mission loop ended with status: {}", status);
}

// The single fatal-escalation path. Never fails: collaborator and cleanup
// errors are logged and swallowed. A terminal status already recorded (e.g.
// timeout) is left in place.
fn emergency<M: Mission>(
    shared: &Shared<M::State>,
    mission: &Mutex<M>,
    movement: Option<&dyn MovementController>,
    safety: &dyn SafetyMonitor,
    reason: &str,
) {
    log::error!("Emergency stop: {} ({})", shared.mission_name, reason);

    shared.running.store(false, Ordering::SeqCst);
    {
        let mut core = shared.core.lock();
        if !core.status.is_terminal() {
            core.status = MissionStatus::Emergency;
        }
    }

    if let Some(movement) = movement {
        if let Err(e) = movement.emergency_stop() {
            log::error!("Movement emergency stop failed: {}", e);
        }
    }

    safety.notify_emergency(shared.mission_name, reason);

    if let Err(e) = mission.lock().cleanup_resources() {
        log::error!("Cleanup failed during emergency stop: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    enum TestState {
        Search,
        Approach,
        Surface,
    }

    #[test]
    fn test_transition_records_history() {
        let mut core: Core<TestState> = Core::new();
        core.mission_started = Some(Instant::now());

        core.transition_to(TestState::Search);
        core.transition_to(TestState::Approach);
        core.transition_to(TestState::Surface);

        assert_eq!(core.state_history.len(), 3);
        assert_eq!(core.state_history[0].from, None);
        assert_eq!(core.state_history[0].to, TestState::Search);
        assert_eq!(core.state_history[1].from, Some(TestState::Search));
        assert_eq!(core.state_history[1].to, TestState::Approach);
        assert_eq!(core.state_history[2].from, Some(TestState::Approach));
        assert_eq!(core.current_state, Some(TestState::Surface));
        assert_eq!(core.previous_state, Some(TestState::Approach));
    }

    #[test]
    fn test_self_transition_is_noop() {
        let mut core: Core<TestState> = Core::new();
        core.transition_to(TestState::Search);
        let started = core.state_started;

        core.transition_to(TestState::Search);

        assert_eq!(core.state_history.len(), 1);
        assert_eq!(core.state_started, started);
    }

    #[test]
    fn test_transition_initializes_retry_counter() {
        let mut core: Core<TestState> = Core::new();
        core.transition_to(TestState::Search);

        assert_eq!(core.retry_counts.get(&TestState::Search), Some(&0));
        assert!(core.retry_counts.get(&TestState::Approach).is_none());
    }

    #[test]
    fn test_retry_budget() {
        let mut core: Core<TestState> = Core::new();
        core.transition_to(TestState::Search);

        assert!(core.retry_current_state(3));
        assert!(core.retry_current_state(3));
        assert!(core.retry_current_state(3));
        assert!(!core.retry_current_state(3));
        assert_eq!(core.retry_counts.get(&TestState::Search), Some(&3));
    }

    #[test]
    fn test_retry_resets_state_clock() {
        let mut core: Core<TestState> = Core::new();
        core.transition_to(TestState::Search);
        core.state_started = Some(Instant::now() - Duration::from_secs(30));

        assert!(core.retry_current_state(3));
        assert!(core.state_duration() < Duration::from_secs(1));
    }

    #[test]
    fn test_retry_without_state() {
        let mut core: Core<TestState> = Core::new();
        assert!(!core.retry_current_state(3));
    }

    #[test]
    fn test_check_timeout() {
        let mut core: Core<TestState> = Core::new();
        core.mission_started = Some(Instant::now() - Duration::from_secs(10));

        assert!(!core.check_timeout(Duration::from_secs(60)));
        assert_eq!(core.status, MissionStatus::NotStarted);

        assert!(core.check_timeout(Duration::from_secs(5)));
        assert_eq!(core.status, MissionStatus::Timeout);
    }

    #[test]
    fn test_durations_before_start() {
        let core: Core<TestState> = Core::new();
        assert_eq!(core.mission_duration(), Duration::ZERO);
        assert_eq!(core.state_duration(), Duration::ZERO);
    }

    #[test]
    fn test_context_finish_clears_running() {
        let mut core: Core<TestState> = Core::new();
        core.transition_to(TestState::Search);
        let running = AtomicBool::new(true);

        let mut context = MissionContext {
            core: &mut core,
            running: &running,
        };
        context.succeed();

        assert!(!running.load(Ordering::SeqCst));
        assert_eq!(core.status, MissionStatus::Success);
    }
}
