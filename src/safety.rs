pub trait SafetyMonitor: Send + Sync {
    fn notify_emergency(&self, mission: &str, reason: &str);
}

// Default monitor that records emergencies through the log facade.
#[derive(Debug, Default)]
pub struct LoggingSafetyMonitor;

impl SafetyMonitor for LoggingSafetyMonitor {
    fn notify_emergency(&self, mission: &str, reason: &str) {
        log::error!("Safety alert from {}: {}", mission, reason);
    }
}
