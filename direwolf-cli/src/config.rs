//! CLI-specific configuration structures for TOML-based configuration.

use color_eyre::eyre::{Context, Result};
use direwolf_core::config::ChannelConfig;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Deep merge JSON values - override takes precedence over base.
/// For objects, recursively merge; for arrays and primitives, override
/// replaces base.
fn merge_json_values(base: &mut JsonValue, override_val: JsonValue) {
    match (base, override_val) {
        (JsonValue::Object(base_map), JsonValue::Object(override_map)) => {
            for (key, value) in override_map {
                if let Some(base_value) = base_map.get_mut(&key) {
                    merge_json_values(base_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_val, override_val) => {
            *base_val = override_val;
        }
    }
}

/// Custom deserializer to handle both single string and array of strings for include.
fn deserialize_include_optional<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
    }

    let opt: Option<StringOrVec> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(Vec::new()),
        Some(StringOrVec::String(s)) => Ok(vec![s]),
        Some(StringOrVec::Vec(v)) => Ok(v),
    }
}

/// Complete CLI configuration bundle: one or more channel configurations
/// plus terminal/logging settings (§4.12, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Optional path(s) to other config file(s) to include (relative to
    /// this config's directory). Supports single string or array of
    /// strings.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_include_optional")]
    pub include: Vec<String>,

    /// Per-channel modem/retry/timing/PTT configuration.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,

    /// Terminal interface configuration.
    #[serde(default)]
    pub terminal: TerminalConfig,

    /// Raw device parameters for non-self-describing audio sources
    /// (stdin, UDP). A WAV file carries its own sample rate and bit
    /// depth and overrides this at load time.
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Raw PCM device parameters, used when the audio source doesn't carry
/// its own format header (§4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub sample_rate: usize,
    pub width: CliSampleWidth,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            width: CliSampleWidth::Signed16Le,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliSampleWidth {
    Unsigned8,
    Signed16Le,
}

impl From<CliSampleWidth> for direwolf_core::audio::SampleWidth {
    fn from(value: CliSampleWidth) -> Self {
        match value {
            CliSampleWidth::Unsigned8 => direwolf_core::audio::SampleWidth::Unsigned8,
            CliSampleWidth::Signed16Le => direwolf_core::audio::SampleWidth::Signed16Le,
        }
    }
}

/// Terminal interface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Telemetry sampling interval in seconds.
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_secs: f64,
}

fn default_telemetry_interval() -> f64 {
    1.0
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            telemetry_interval_secs: default_telemetry_interval(),
        }
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log output target.
    #[serde(default = "default_log_target")]
    pub target: LogTarget,

    /// Log file path (if target is File).
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Log format.
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Log level filter.
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_target() -> LogTarget {
    LogTarget::Stdout
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: default_log_target(),
            file_path: None,
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Convert CLI logging config to the core library's internal
    /// diagnostic logging config.
    pub fn to_core_log_config(&self) -> direwolf_core::logging::LogConfig {
        use direwolf_core::logging::{LogConfig as CoreLogConfig, LogLevel as CoreLogLevel};

        let level = match self.level {
            LogLevel::Debug => CoreLogLevel::Debug,
            LogLevel::Info => CoreLogLevel::Info,
            LogLevel::Warn => CoreLogLevel::Warn,
            LogLevel::Error => CoreLogLevel::Error,
        };

        CoreLogConfig {
            level,
            enable_demod: true,
            enable_timing: true,
            enable_framing: true,
            enable_control: true,
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Stdout,
    Stderr,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Logfmt,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            channels: vec![ChannelConfig::default()],
            terminal: TerminalConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file, with include support: each
    /// included file is merged in order underneath the current file,
    /// which always has highest priority.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let config_toml: toml::Value =
            toml::from_str(&content).wrap_err("Failed to parse TOML configuration")?;

        let mut config_json =
            serde_json::to_value(&config_toml).wrap_err("Failed to convert TOML to JSON")?;

        let includes = match config_json.get("include") {
            Some(JsonValue::String(s)) => vec![s.clone()],
            Some(JsonValue::Array(arr)) => {
                arr.iter().filter_map(|v| v.as_str().map(String::from)).collect()
            }
            _ => Vec::new(),
        };

        if let JsonValue::Object(ref mut map) = config_json {
            map.remove("include");
        }

        let mut base_json =
            serde_json::to_value(Self::default()).wrap_err("Failed to create default config")?;

        for include_path in &includes {
            let include_full_path = if Path::new(include_path).is_absolute() {
                PathBuf::from(include_path)
            } else {
                path.parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(include_path)
            };

            let included_config = Self::from_file(&include_full_path).wrap_err_with(|| {
                format!(
                    "Failed to load included config: {}",
                    include_full_path.display()
                )
            })?;

            let included_json = serde_json::to_value(&included_config)
                .wrap_err("Failed to convert included config to JSON")?;

            merge_json_values(&mut base_json, included_json);
        }

        merge_json_values(&mut base_json, config_json);

        let config: CliConfig =
            serde_json::from_value(base_json).wrap_err("Failed to parse final configuration")?;

        Ok(config)
    }
}
