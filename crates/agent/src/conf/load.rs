//! Load — config loading from file and environment variables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::AgentConfig;

impl AgentConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("AGENT_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/logvault/agent.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            Self::from_env()
        };

        // Environment variables override file config for critical settings
        if let Ok(dir) = std::env::var("AGENT_SOURCE_DIR") {
            config.source_dir = dir;
        }
        if let Ok(dir) = std::env::var("AGENT_BACKUP_DIR") {
            config.backup_dir = dir;
        }
        if let Ok(path) = std::env::var("AGENT_CHECKPOINT_PATH") {
            config.checkpoint_path = path;
        }
        if let Ok(secs) = std::env::var("AGENT_CYCLE_INTERVAL") {
            if let Ok(secs) = secs.parse() {
                config.cycle_interval_secs = secs;
            }
        }
        if let Ok(n) = std::env::var("AGENT_MAX_CONCURRENT_FILES") {
            if let Ok(n) = n.parse() {
                config.max_concurrent_files = n;
            }
        }

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AgentConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with sensible defaults.
    /// Masking rule sets have no env form; they come from the config file
    /// or the built-in defaults.
    pub fn from_env() -> Self {
        let defaults = AgentConfig::default();
        Self {
            source_dir: std::env::var("AGENT_SOURCE_DIR").unwrap_or(defaults.source_dir),
            backup_dir: std::env::var("AGENT_BACKUP_DIR").unwrap_or(defaults.backup_dir),
            checkpoint_path: std::env::var("AGENT_CHECKPOINT_PATH")
                .unwrap_or(defaults.checkpoint_path),
            cycle_interval_secs: std::env::var("AGENT_CYCLE_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cycle_interval_secs),
            max_concurrent_files: std::env::var("AGENT_MAX_CONCURRENT_FILES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_files),
            masking: defaults.masking,
        }
    }
}
