//! Demo configuration.
//!
//! Provides the user, tick timing, growth source and backend economy used by
//! the demo run. Configuration can be loaded from and saved to a TOML file.

use huerto_garden::{GrowthAuthority, DEFAULT_HARVEST_REWARD, DEFAULT_STARTING_POINTS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "huerto.toml";

/// Shortest allowed tick interval.
const MIN_TICK_MS: u64 = 250;
/// Longest allowed tick interval.
const MAX_TICK_MS: u64 = 60_000;

/// Demo configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuertoConfig {
    // === Session ===
    /// Garden owner
    pub user_id: u64,
    /// Milliseconds between growth ticks
    pub tick_interval_ms: u64,
    /// Where growth stages come from
    pub growth_authority: GrowthAuthority,

    // === Backend economy ===
    /// Balance of a newly created garden
    pub starting_points: u64,
    /// Points per harvest
    pub harvest_reward: u64,

    // === Demo run ===
    /// Number of ticks before exiting
    pub demo_ticks: u32,
    /// Simulated seconds that pass per tick
    pub sim_seconds_per_tick: u64,
    /// Seed for plant placement (None = random)
    pub seed: Option<u64>,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for HuertoConfig {
    fn default() -> Self {
        Self {
            user_id: 1,
            tick_interval_ms: 3_000,
            growth_authority: GrowthAuthority::Remote,

            starting_points: DEFAULT_STARTING_POINTS,
            harvest_reward: DEFAULT_HARVEST_REWARD,

            demo_ticks: 10,
            sim_seconds_per_tick: 30,
            seed: None,
            json_logs: false,
        }
    }
}

impl HuertoConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Default configuration file path.
    fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("huerto").join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(MIN_TICK_MS, MAX_TICK_MS);
        self.demo_ticks = self.demo_ticks.clamp(1, 1_000);
        self.sim_seconds_per_tick = self.sim_seconds_per_tick.min(3_600);
    }

    /// Tick interval as a duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Platform config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = HuertoConfig::default();
        assert_eq!(config.user_id, 1);
        assert_eq!(config.tick_interval(), Duration::from_secs(3));
        assert_eq!(config.growth_authority, GrowthAuthority::Remote);
        assert_eq!(config.starting_points, 50);
    }

    #[test]
    fn test_config_validation() {
        let mut config = HuertoConfig::default();
        config.tick_interval_ms = 10;
        config.demo_ticks = 0;
        config.validate();

        assert_eq!(config.tick_interval_ms, MIN_TICK_MS);
        assert_eq!(config.demo_ticks, 1);

        config.tick_interval_ms = 600_000;
        config.validate();
        assert_eq!(config.tick_interval_ms, MAX_TICK_MS);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("huerto.toml");

        let mut config = HuertoConfig::default();
        config.user_id = 42;
        config.growth_authority = GrowthAuthority::Local;
        config.seed = Some(7);

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = HuertoConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = HuertoConfig::load_from("/nonexistent/path/huerto.toml");
        assert_eq!(config, HuertoConfig::default());
    }

    #[test]
    fn test_config_invalid_file_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("huerto.toml");
        fs::write(&config_path, "tick_interval_ms = \"soon\"").expect("write");

        assert_eq!(HuertoConfig::load_from(&config_path), HuertoConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: HuertoConfig =
            toml::from_str("growth_authority = \"local\"\ndemo_ticks = 3").expect("parse");
        assert_eq!(config.growth_authority, GrowthAuthority::Local);
        assert_eq!(config.demo_ticks, 3);
        assert_eq!(config.tick_interval_ms, 3_000);
    }
}
