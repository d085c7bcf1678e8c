//! Configuration system for todobot.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/todobot/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error, and so is a missing bot
//! token.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use todobot_core::rate_limit::{DEFAULT_WINDOW, RateLimits};
use todobot_core::sweep::{QuietHours, QuietHoursError, SweepConfig};
use todobot_core::task::{MAX_TASK_LENGTH, MAX_TASKS_PER_USER};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// No bot token was given anywhere.
    #[error("the TELEGRAM_BOT_TOKEN environment variable is not set (or pass --token)")]
    MissingToken,

    /// Quiet hours are out of range.
    #[error("invalid quiet hours: {0}")]
    QuietHours(#[from] QuietHoursError),

    /// A window or interval was configured as zero seconds.
    #[error("{0} must be at least one second")]
    ZeroDuration(&'static str),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    bot: BotFileConfig,
    storage: StorageFileConfig,
    tasks: TasksFileConfig,
    limits: LimitsFileConfig,
    cleanup: CleanupFileConfig,
    reminders: RemindersFileConfig,
}

/// `[bot]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BotFileConfig {
    token: Option<String>,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
}

/// `[tasks]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TasksFileConfig {
    max_task_length: Option<usize>,
    max_tasks_per_user: Option<usize>,
}

/// `[limits]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct LimitsFileConfig {
    add_task: Option<u32>,
    general: Option<u32>,
    window_secs: Option<u64>,
}

/// `[cleanup]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct CleanupFileConfig {
    message_lifetime_secs: Option<u64>,
    interval_secs: Option<u64>,
    rate_limit_sweep_secs: Option<u64>,
}

/// `[reminders]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemindersFileConfig {
    interval_secs: Option<u64>,
    quiet_start: Option<u32>,
    quiet_end: Option<u32>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved bot configuration.
#[derive(Clone)]
pub struct BotConfig {
    /// Chat platform bot token.
    pub token: String,
    /// Directory holding one task file per user.
    pub data_dir: PathBuf,
    /// Maximum task text length in characters.
    pub max_task_length: usize,
    /// Maximum number of tasks per user.
    pub max_tasks_per_user: usize,
    /// Per-window action limits.
    pub rate_limits: RateLimits,
    /// Rate-limit window length.
    pub rate_limit_window: Duration,
    /// Sweeper timers and quiet hours.
    pub sweep: SweepConfig,
    /// Log level filter string.
    pub log_level: String,
    /// Append-only log file.
    pub log_file: PathBuf,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"<redacted>")
            .field("data_dir", &self.data_dir)
            .field("max_task_length", &self.max_task_length)
            .field("max_tasks_per_user", &self.max_tasks_per_user)
            .field("rate_limits", &self.rate_limits)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("sweep", &self.sweep)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            data_dir: PathBuf::from("data"),
            max_task_length: MAX_TASK_LENGTH,
            max_tasks_per_user: MAX_TASKS_PER_USER,
            rate_limits: RateLimits::default(),
            rate_limit_window: DEFAULT_WINDOW,
            sweep: SweepConfig::default(),
            log_level: "info".to_string(),
            log_file: PathBuf::from("todobot.log"),
        }
    }
}

impl BotConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, if no token is configured, if the quiet hours are out of
    /// range, or if the rate-limit window or a sweep interval is zero.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `BotConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let token = cli
            .token
            .clone()
            .or_else(|| file.bot.token.clone())
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let default_quiet = defaults.sweep.quiet_hours;
        let quiet_hours = QuietHours::new(
            file.reminders.quiet_start.unwrap_or(default_quiet.start()),
            file.reminders.quiet_end.unwrap_or(default_quiet.end()),
        )?;

        Ok(Self {
            token,
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            max_task_length: file
                .tasks
                .max_task_length
                .unwrap_or(defaults.max_task_length),
            max_tasks_per_user: file
                .tasks
                .max_tasks_per_user
                .unwrap_or(defaults.max_tasks_per_user),
            rate_limits: RateLimits {
                add_task: file
                    .limits
                    .add_task
                    .unwrap_or(defaults.rate_limits.add_task),
                general: file.limits.general.unwrap_or(defaults.rate_limits.general),
            },
            rate_limit_window: nonzero_secs(
                "limits.window_secs",
                file.limits.window_secs,
                defaults.rate_limit_window,
            )?,
            sweep: SweepConfig {
                message_lifetime: file
                    .cleanup
                    .message_lifetime_secs
                    .map_or(defaults.sweep.message_lifetime, Duration::from_secs),
                cleanup_interval: nonzero_secs(
                    "cleanup.interval_secs",
                    file.cleanup.interval_secs,
                    defaults.sweep.cleanup_interval,
                )?,
                rate_limit_sweep_interval: nonzero_secs(
                    "cleanup.rate_limit_sweep_secs",
                    file.cleanup.rate_limit_sweep_secs,
                    defaults.sweep.rate_limit_sweep_interval,
                )?,
                reminder_interval: nonzero_secs(
                    "reminders.interval_secs",
                    file.reminders.interval_secs,
                    defaults.sweep.reminder_interval,
                )?,
                quiet_hours,
            },
            log_level: cli.log_level.clone(),
            log_file: cli.log_file.clone().unwrap_or(defaults.log_file),
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Chat bot that keeps a per-user to-do list")]
pub struct CliArgs {
    /// Bot token issued by the chat platform.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path to config file (default: `~/.config/todobot/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for per-user task files.
    #[arg(long, env = "TODOBOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TODOBOT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `todobot.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Seconds from the config file as a [`Duration`], or `default` when unset.
/// Zero is rejected.
fn nonzero_secs(
    key: &'static str,
    secs: Option<u64>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match secs {
        None => Ok(default),
        Some(0) => Err(ConfigError::ZeroDuration(key)),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("todobot").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
