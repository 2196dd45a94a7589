use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::{DEFAULT_DEGRADED_THRESHOLD_MS, DEFAULT_USER_AGENT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },

    #[error("Failed to write config file {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed { path: path::PathBuf, source: toml::de::Error },

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("No config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub regions: RegionsConfig,
    pub notify: NotifyConfig,
    pub webhooks: WebhooksConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub timeout_seconds: u64,
    pub degraded_threshold_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionsConfig {
    /// Edge-check proxy; checks run locally when unset
    pub edge_url: Option<String>,
    pub edge_timeout_seconds: u64,
    pub default_regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub dashboard_url: String,
    pub plan_cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhooksConfig {
    pub timeout_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            degraded_threshold_ms: DEFAULT_DEGRADED_THRESHOLD_MS,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            edge_url: None,
            edge_timeout_seconds: 15,
            default_regions: vec!["us-east".into(), "eu-west".into(), "ap-southeast".into()],
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            email_api_url: None,
            email_api_key: None,
            email_from: "alerts@uppe.dev".into(),
            dashboard_url: "https://app.uppe.dev".into(),
            plan_cache_ttl_seconds: 60,
        }
    }
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self { timeout_seconds: 10 }
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl RegionsConfig {
    pub fn edge_timeout(&self) -> Duration {
        Duration::from_secs(self.edge_timeout_seconds)
    }
}

impl NotifyConfig {
    pub fn plan_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.plan_cache_ttl_seconds)
    }
}

impl WebhooksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uppe/health.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("uppe/health.toml"))
}

fn display_optional(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(not set)")
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Health Engine Configuration:")?;

        write_title_1(f, "Monitor")?;
        write_1(f, "Timeout (s)", &self.monitor.timeout_seconds)?;
        write_1(f, "Degraded Threshold (ms)", &self.monitor.degraded_threshold_ms)?;
        write_1(f, "User Agent", &self.monitor.user_agent)?;

        write_title_1(f, "Regions")?;
        write_1(f, "Edge URL", &display_optional(&self.regions.edge_url))?;
        write_1(f, "Edge Timeout (s)", &self.regions.edge_timeout_seconds)?;
        write_1(f, "Default Regions", &self.regions.default_regions.join(", "))?;

        write_title_1(f, "Notify")?;
        write_1(f, "Email API URL", &display_optional(&self.notify.email_api_url))?;
        let api_key = if self.notify.email_api_key.is_some() { "(set)" } else { "(not set)" };
        write_1(f, "Email API Key", &api_key)?;
        write_1(f, "Email From", &self.notify.email_from)?;
        write_1(f, "Dashboard URL", &self.notify.dashboard_url)?;
        write_1(f, "Plan Cache TTL (s)", &self.notify.plan_cache_ttl_seconds)?;

        write_title_1(f, "Webhooks")?;
        write_1(f, "Timeout (s)", &self.webhooks.timeout_seconds)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uppe/health.toml
    ///  or the specified path if one does not exist. Environment overrides
    /// are applied on top.
    ///
    /// ```rust,no_run
    /// let cfg = uppe_health::config::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), uppe_health::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let mut config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|source| ConfigError::ParseFailed { path: config_path.clone(), source })?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.apply_env_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    /// Override settings from `UPPE_EDGE_URL` and `UPPE_EMAIL_API_KEY`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(edge_url) = lookup("UPPE_EDGE_URL").filter(|v| !v.is_empty()) {
            self.regions.edge_url = Some(edge_url);
        }
        if let Some(api_key) = lookup("UPPE_EMAIL_API_KEY").filter(|v| !v.is_empty()) {
            self.notify.email_api_key = Some(api_key);
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
    }
}
