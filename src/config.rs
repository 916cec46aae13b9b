use crate::error::{MissionError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub struct ConfigManager {
    root: Value,
}

impl ConfigManager {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .map_err(|e| MissionError::Config(format!("Failed to read config file: {}", e)))?;

        let root: Value = serde_json::from_str(&config_str)
            .map_err(|e| MissionError::Config(format!("Failed to parse config: {}", e)))?;

        Self::from_value(root)
    }

    pub fn from_value(root: Value) -> Result<Self> {
        let config = ConfigManager { root };
        config.validate()?;
        Ok(config)
    }

    pub fn empty() -> Self {
        ConfigManager {
            root: Value::Object(Default::default()),
        }
    }

    // Keys are dotted paths into the JSON document, e.g. "missions.default_timeout"
    fn lookup(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.root, |node, part| node.get(part))
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.lookup(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn get_u32(&self, key: &str, default: u32) -> u32 {
        self.lookup(key)
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(default)
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.lookup(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    fn validate(&self) -> Result<()> {
        if let Some(value) = self.lookup("missions.default_timeout") {
            match value.as_f64() {
                Some(timeout) if timeout > 0.0 => {}
                _ => {
                    return Err(MissionError::Config(format!(
                        "missions.default_timeout must be a positive number, got {}",
                        value
                    )))
                }
            }
        }

        Ok(())
    }
}
