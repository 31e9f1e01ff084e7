//! Configuration with validation and defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RingpotConfig {
    pub api: ApiSettings,
    pub engine: EngineSettings,
    pub demo: DemoSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; "*" allows all.
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Upper bound on a payment gate call. A join with no definitive payment
    /// outcome inside this window is rejected without mutating ring state.
    pub payment_timeout_ms: u64,
    /// Pause between closing admission and revealing the winner.
    pub spin_delay_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Whether demo rings get filled by the synthetic participant driver.
    pub enabled: bool,
    /// Delay between synthetic join attempts.
    pub join_interval_ms: u64,
    /// Identities the driver admits, in order.
    pub identities: Vec<String>,
}

impl Default for RingpotConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            engine: EngineSettings::default(),
            demo: DemoSettings::default(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            payment_timeout_ms: 30_000,
            spin_delay_ms: 3_000,
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            join_interval_ms: 2_000,
            identities: (1..=7).map(|i| format!("house-bot-{}", i)).collect(),
        }
    }
}

impl RingpotConfig {
    /// Load and validate a TOML config file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.payment_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.payment_timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.demo.enabled && self.demo.identities.is_empty() {
            return Err(ConfigError::Invalid {
                field: "demo.identities".to_string(),
                reason: "demo mode enabled with no synthetic identities".to_string(),
            });
        }
        Ok(())
    }
}

impl EngineSettings {
    pub fn payment_timeout(&self) -> Duration {
        Duration::from_millis(self.payment_timeout_ms)
    }

    pub fn spin_delay(&self) -> Duration {
        Duration::from_millis(self.spin_delay_ms)
    }
}

impl DemoSettings {
    pub fn join_interval(&self) -> Duration {
        Duration::from_millis(self.join_interval_ms)
    }
}
