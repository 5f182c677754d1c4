use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tour: TourSettings,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

/// Behavior of the tour state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourSettings {
    /// Key the persisted `{active, step}` record is stored under
    #[serde(default = "default_state_key")]
    pub state_key: String,
    /// Query parameter carrying the step index across a page navigation
    #[serde(default = "default_handoff_param")]
    pub handoff_param: String,
    /// Delay between target resolution attempts (default: 100ms)
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
    /// Resolution retries before rendering without a target (default: 20)
    #[serde(default = "default_max_resolve_attempts")]
    pub max_resolve_attempts: u32,
    /// Delay before the popover is positioned, so its size is known (default: 80ms)
    #[serde(default = "default_position_delay")]
    pub position_delay_ms: u64,
    /// Delay between page load and resuming an active tour (default: 50ms)
    #[serde(default = "default_resume_delay")]
    pub resume_delay_ms: u64,
}

fn default_state_key() -> String {
    "bpTourState".to_string()
}

fn default_handoff_param() -> String {
    "bp_tour_step".to_string()
}

fn default_retry_interval() -> u64 {
    100
}

fn default_max_resolve_attempts() -> u32 {
    20
}

fn default_position_delay() -> u64 {
    80
}

fn default_resume_delay() -> u64 {
    50
}

impl Default for TourSettings {
    fn default() -> Self {
        Self {
            state_key: default_state_key(),
            handoff_param: default_handoff_param(),
            retry_interval_ms: default_retry_interval(),
            max_resolve_attempts: default_max_resolve_attempts(),
            position_delay_ms: default_position_delay(),
            resume_delay_ms: default_resume_delay(),
        }
    }
}

impl TourSettings {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn position_delay(&self) -> Duration {
        Duration::from_millis(self.position_delay_ms)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }
}

/// Popover placement constants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Gap between the target and the popover
    #[serde(default = "default_margin")]
    pub margin: i32,
    /// Minimum distance between the popover and the viewport edges
    #[serde(default = "default_padding")]
    pub padding: i32,
}

fn default_margin() -> i32 {
    10
}

fn default_padding() -> i32 {
    12
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            padding: default_padding(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the persisted tour record and logs
    #[serde(default = "default_state_dir")]
    pub state: String,
}

fn default_state_dir() -> String {
    ".pagetour".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file in preview mode (false = stderr for debugging)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

/// Terminal preview settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Event poll interval; also the granularity of the virtual clock
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
    /// Viewport used by headless walks
    #[serde(default = "default_viewport_width")]
    pub viewport_width: i32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: i32,
}

fn default_tick() -> u64 {
    25
}

fn default_viewport_width() -> i32 {
    1280
}

fn default_viewport_height() -> i32 {
    800
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".pagetour/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so pagetour works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/pagetour/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pagetour").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with PAGETOUR_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PAGETOUR")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Write the config as TOML to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tour: TourSettings::default(),
            layout: LayoutConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}
