use crate::store::DbRegistryConfig;
use crate::utils::logger::LoggerConfig;
use serde::{Deserialize, Serialize};

/// One key-space subscriber: which database, which tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriberConfig {
    pub db: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    /// Tables to watch; each becomes a `__keyspace@<db>__:<table><sep>*` pattern.
    #[serde(default)]
    pub tables: Vec<String>,
    /// Extra raw patterns.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Event loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoopConfig {
    /// Select timeout in milliseconds; negative blocks indefinitely.
    pub select_timeout_ms: Option<i32>,
    pub interrupt_on_signal: Option<bool>,
}

impl LoopConfig {
    pub fn select_timeout_ms(&self) -> i32 {
        self.select_timeout_ms.unwrap_or(1000)
    }

    pub fn interrupt_on_signal(&self) -> bool {
        self.interrupt_on_signal.unwrap_or(true)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            select_timeout_ms: Some(1000),
            interrupt_on_signal: Some(true),
        }
    }
}

/// Whole-application config file layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(flatten)]
    pub registry: DbRegistryConfig,
    pub subscribers: Vec<SubscriberConfig>,
    #[serde(default)]
    pub event_loop: LoopConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}
