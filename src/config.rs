//! Configuration for nimbus.
//!
//! Supports layered configuration from multiple sources:
//! 1. Environment variables (highest priority)
//! 2. Project config (.nimbus.toml in repo root)
//! 3. User config (~/.config/nimbus/config.toml)
//! 4. Compiled defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable prefix for all config options.
const ENV_PREFIX: &str = "NIMBUS";

/// Default config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Project-level config file name.
const PROJECT_CONFIG_NAME: &str = ".nimbus.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,

    /// AWS-specific settings.
    pub aws: AwsConfig,

    /// SSH tunnel settings for private-database connectivity.
    pub tunnel: TunnelConfig,
}

/// General configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Color output mode: "auto", "always", "never".
    pub color: String,

    /// Directory for evidence reports, dumps, and downloads.
    /// Defaults to ~/Downloads when unset.
    pub output_dir: Option<String>,

    /// Whether to show verbose output.
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: "auto".to_string(),
            output_dir: None,
            verbose: false,
        }
    }
}

/// AWS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region used when the CLI profile does not supply one.
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self { region: "us-east-1".to_string() }
    }
}

/// SSH tunnel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Local port the tunnel listens on.
    pub local_port: u16,

    /// Maximum liveness-probe attempts before giving up.
    pub probe_attempts: u32,

    /// Sleep between probe attempts, in milliseconds.
    pub probe_interval_ms: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            local_port: 3307,
            probe_attempts: 60,
            probe_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from all sources, merging them in priority order.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config() {
            config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load configuration from a specific file.
    #[must_use]
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    /// Load user configuration.
    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let path = config_dir.join("nimbus").join(CONFIG_FILE_NAME);
        Self::load_from_file(&path)
    }

    /// Load project-level configuration by walking up to the repo root.
    fn load_project_config() -> Option<Self> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join(PROJECT_CONFIG_NAME);
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }

            if current.join(".git").exists() {
                return None;
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Merge another config into this one (other takes priority).
    fn merge(&mut self, other: Self) {
        if other.general.color != "auto" {
            self.general.color = other.general.color;
        }
        if other.general.output_dir.is_some() {
            self.general.output_dir = other.general.output_dir;
        }
        if other.general.verbose {
            self.general.verbose = true;
        }

        let aws_default = AwsConfig::default();
        if other.aws.region != aws_default.region {
            self.aws.region = other.aws.region;
        }

        let tunnel_default = TunnelConfig::default();
        if other.tunnel.local_port != tunnel_default.local_port {
            self.tunnel.local_port = other.tunnel.local_port;
        }
        if other.tunnel.probe_attempts != tunnel_default.probe_attempts {
            self.tunnel.probe_attempts = other.tunnel.probe_attempts;
        }
        if other.tunnel.probe_interval_ms != tunnel_default.probe_interval_ms {
            self.tunnel.probe_interval_ms = other.tunnel.probe_interval_ms;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(color) = env::var(format!("{ENV_PREFIX}_COLOR")) {
            self.general.color = color;
        }
        if let Ok(dir) = env::var(format!("{ENV_PREFIX}_OUTPUT_DIR")) {
            self.general.output_dir = Some(dir);
        }
        if let Ok(region) = env::var(format!("{ENV_PREFIX}_AWS_REGION")) {
            self.aws.region = region;
        }
        if let Ok(port) = env::var(format!("{ENV_PREFIX}_TUNNEL_PORT")) {
            if let Ok(port) = port.parse() {
                self.tunnel.local_port = port;
            }
        }
        if let Ok(attempts) = env::var(format!("{ENV_PREFIX}_TUNNEL_PROBE_ATTEMPTS")) {
            if let Ok(attempts) = attempts.parse() {
                self.tunnel.probe_attempts = attempts;
            }
        }
    }

    /// Resolve the output directory: config value, else ~/Downloads, else cwd.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.general.output_dir {
            return expand_home(dir);
        }
        dirs::home_dir()
            .map(|h| h.join("Downloads"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Expand a leading `~` to the user's home directory.
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.general.color, "auto");
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.tunnel.local_port, 3307);
        assert!(config.tunnel.probe_attempts > 0);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [tunnel]
            local_port = 3310
            "#,
        )
        .unwrap();
        assert_eq!(config.tunnel.local_port, 3310);
        // Unspecified sections keep their defaults.
        assert_eq!(config.aws.region, "us-east-1");
    }

    #[test]
    fn merge_prefers_non_default() {
        let mut base = Config::default();
        let other: Config = toml::from_str(
            r#"
            [general]
            color = "never"
            [aws]
            region = "eu-west-1"
            "#,
        )
        .unwrap();
        base.merge(other);
        assert_eq!(base.general.color, "never");
        assert_eq!(base.aws.region, "eu-west-1");
        assert_eq!(base.tunnel.local_port, 3307);
    }

    #[test]
    fn expand_home_passthrough_for_absolute() {
        assert_eq!(expand_home("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
