use abyss::{
    ConfigManager, LoggingSafetyMonitor, Mission, MissionContext, MissionExecutor,
    MovementCommand, MovementController, MovementDirection, Result, StateHandler, StateHandlers,
};
use log::LevelFilter;
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

struct DemoThrusters;

impl MovementController for DemoThrusters {
    fn execute(&self, command: MovementCommand) -> Result<()> {
        log::info!("Thrusters: {} at {:.0}%", command.direction, command.power);
        Ok(())
    }

    fn emergency_stop(&self) -> Result<()> {
        log::info!("Thrusters: full stop");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
enum DiveState {
    Descend,
    Hold,
    Surface,
}

struct DiveMission {
    thrusters: Arc<dyn MovementController>,
    leg_duration: Duration,
}

impl DiveMission {
    fn new(thrusters: Arc<dyn MovementController>) -> Self {
        DiveMission {
            thrusters,
            leg_duration: Duration::from_millis(500),
        }
    }

    fn descend(&mut self, context: &mut MissionContext<'_, DiveState>) -> Result<()> {
        self.thrusters
            .execute(MovementCommand::new(MovementDirection::Down, 40.0))?;
        if context.state_duration() >= self.leg_duration {
            context.transition_to(DiveState::Hold);
        }
        Ok(())
    }

    fn hold(&mut self, context: &mut MissionContext<'_, DiveState>) -> Result<()> {
        self.thrusters.execute(MovementCommand::stop())?;
        if context.state_duration() >= self.leg_duration {
            context.transition_to(DiveState::Surface);
        }
        Ok(())
    }

    fn surface(&mut self, context: &mut MissionContext<'_, DiveState>) -> Result<()> {
        self.thrusters
            .execute(MovementCommand::new(MovementDirection::Up, 30.0))?;
        if context.state_duration() >= self.leg_duration {
            context.succeed();
        }
        Ok(())
    }
}

impl Mission for DiveMission {
    type State = DiveState;

    fn name(&self) -> &'static str {
        "DiveMission"
    }

    fn initial_state(&self) -> DiveState {
        DiveState::Descend
    }

    fn state_handlers(&self) -> StateHandlers<Self> {
        HashMap::from([
            (DiveState::Descend, Self::descend as StateHandler<Self>),
            (DiveState::Hold, Self::hold as StateHandler<Self>),
            (DiveState::Surface, Self::surface as StateHandler<Self>),
        ])
    }

    fn cleanup_resources(&mut self) -> Result<()> {
        self.thrusters.emergency_stop()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    abyss::logging::init_logger(LevelFilter::Info)?;

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => ConfigManager::load(path)?,
        None => ConfigManager::empty(),
    };

    let thrusters: Arc<dyn MovementController> = Arc::new(DemoThrusters);
    let mission = DiveMission::new(Arc::clone(&thrusters));
    let executor =
        MissionExecutor::new(mission, &config, Arc::new(LoggingSafetyMonitor)).with_movement(thrusters);

    if !executor.start().await {
        eprintln!("Error: mission failed to start");
        std::process::exit(1);
    }

    while executor.is_running() {
        sleep(Duration::from_millis(100)).await;
    }

    let report = executor.get_mission_report();
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
