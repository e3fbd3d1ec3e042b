use anyhow::Context;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

fn default_level() -> String {
    "info".to_string()
}

fn default_max_files() -> usize {
    2
}

/// Log sink for the monitor and the event-loop workers.
///
/// With `file_dir` unset everything goes to stdout.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct LoggerConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub file_dir: Option<String>,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// `minutely`, `hourly` or `daily` (default).
    #[serde(default)]
    pub rotation: Option<String>,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Include thread names in each line; useful with several loop workers.
    #[serde(default)]
    pub thread_names: bool,
}

impl LoggerConfig {
    /// Reads `LOG_LEVEL`, `LOG_FILE_DIR`, `LOG_FILE_PREFIX` and `LOG_ROTATION`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            cfg.level = level;
        }
        cfg.file_dir = std::env::var("LOG_FILE_DIR").ok();
        cfg.file_prefix = std::env::var("LOG_FILE_PREFIX").ok();
        if let Ok(rotation) = std::env::var("LOG_ROTATION") {
            cfg.rotation = Some(rotation);
        }
        cfg
    }

    pub fn max_level(&self) -> Level {
        Level::from_str(&self.level).unwrap_or(Level::INFO)
    }

    fn rotation(&self) -> Rotation {
        match self.rotation.as_deref() {
            Some("minutely") => Rotation::MINUTELY,
            Some("hourly") => Rotation::HOURLY,
            _ => Rotation::DAILY,
        }
    }

    /// Installs the global subscriber. A second call is a no-op.
    ///
    /// Keep the returned guard alive for as long as file logging should flush.
    pub fn init(&self) -> anyhow::Result<Option<WorkerGuard>> {
        let level = self.max_level();

        let Some(dir) = self.file_dir.as_deref() else {
            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_thread_names(self.thread_names)
                .try_init();
            tracing::info!("[Logger] logging to stdout at {level}");
            return Ok(None);
        };

        let prefix = self.file_prefix.as_deref().unwrap_or("keyspace");
        let appender = RollingFileAppender::builder()
            .rotation(self.rotation())
            .max_log_files(self.max_files)
            .filename_prefix(prefix)
            .build(dir)
            .with_context(|| format!("failed to create rolling appender in {dir}"))?;

        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_thread_names(self.thread_names)
            .with_ansi(false)
            .with_writer(writer)
            .try_init();

        tracing::info!(
            "[Logger] logging to {dir}/{prefix}, rotation {:?}, level {level}",
            self.rotation
        );
        Ok(Some(guard))
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_dir: None,
            file_prefix: None,
            rotation: None,
            max_files: default_max_files(),
            thread_names: false,
        }
    }
}
