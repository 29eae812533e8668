/// Configuration for the scheduler server
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Path of the SQLite database file (`:memory:` for a throwaway store)
    pub database_path: String,
    pub address: String,
    pub port: u16,
    /// How long a login stays valid
    pub session_ttl_secs: u64,
    /// Maximum log level: trace, debug, info, warn or error
    pub log_level: String,
    /// Supervisor account created at start-up if it does not exist yet
    pub bootstrap_supervisor: Option<BootstrapSupervisor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSupervisor {
    pub email: String,
    pub password: String,
}

impl SchedulerConfig {
    /// Loads the configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to the JSON configuration file
    ///
    /// # Returns
    /// * `Ok(SchedulerConfig)` - Parsed configuration, or the defaults if the file doesn't exist
    /// * `Err` - If the file exists but can't be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: SchedulerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Socket address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            database_path: "scheduler.db".to_string(),
            address: "127.0.0.1".to_string(),
            port: 8080,
            session_ttl_secs: 60 * 60,
            log_level: "info".to_string(),
            bootstrap_supervisor: None,
        }
    }
}
