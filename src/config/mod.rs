//! Engine configuration.
//!
//! Policy constants are read from an optional TOML file. Every key may be
//! omitted, in which case the compiled default applies:
//!
//! ```toml
//! [fusion]
//! window_minutes = 240
//! merge_ratio_percent = 70
//!
//! [scheduling]
//! default_duration_minutes = 60
//!
//! [events]
//! channel_capacity = 256
//! ```

use crate::task::domain::{
    DEFAULT_DURATION_MINUTES, DEFAULT_FUSION_WINDOW_MINUTES, DEFAULT_MERGE_RATIO_PERCENT,
    FusionPolicy, SchedulingPolicy,
};
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;

/// Default capacity of the asynchronous event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// Why the value was refused.
        reason: &'static str,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineConfigFile {
    fusion: FusionSection,
    scheduling: SchedulingSection,
    events: EventsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FusionSection {
    window_minutes: Option<u32>,
    merge_ratio_percent: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SchedulingSection {
    default_duration_minutes: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EventsSection {
    channel_capacity: Option<usize>,
}

/// Resolved engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Half-width of the fusion search window, in minutes.
    pub fusion_window_minutes: u32,
    /// Share of the summed durations kept by a merged task, in percent.
    pub merge_ratio_percent: u32,
    /// Duration assumed for tasks without one, in minutes.
    pub default_duration_minutes: u32,
    /// Capacity of the asynchronous event channel.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fusion_window_minutes: DEFAULT_FUSION_WINDOW_MINUTES,
            merge_ratio_percent: DEFAULT_MERGE_RATIO_PERCENT,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseToml`] for malformed TOML or unknown keys
    /// and [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: EngineConfigFile = toml::from_str(source)?;
        let config = Self::resolve(&file);
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] when the file cannot be read, plus
    /// every error of [`Self::from_toml_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let source = read_config_file(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path, ?config, "engine configuration loaded");
        Ok(config)
    }

    /// Fusion policy derived from the configuration.
    #[must_use]
    pub fn fusion_policy(&self) -> FusionPolicy {
        FusionPolicy::new(self.fusion_window_minutes, self.merge_ratio_percent)
    }

    /// Scheduling policy derived from the configuration.
    #[must_use]
    pub const fn scheduling_policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::new(self.default_duration_minutes)
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.fusion_window_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "fusion.window_minutes",
                reason: "must be positive",
            });
        }
        if self.merge_ratio_percent == 0 || self.merge_ratio_percent > 100 {
            return Err(ConfigError::Invalid {
                key: "fusion.merge_ratio_percent",
                reason: "must be between 1 and 100",
            });
        }
        if self.default_duration_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "scheduling.default_duration_minutes",
                reason: "must be positive",
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "events.channel_capacity",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    fn resolve(file: &EngineConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            fusion_window_minutes: file
                .fusion
                .window_minutes
                .unwrap_or(defaults.fusion_window_minutes),
            merge_ratio_percent: file
                .fusion
                .merge_ratio_percent
                .unwrap_or(defaults.merge_ratio_percent),
            default_duration_minutes: file
                .scheduling
                .default_duration_minutes
                .unwrap_or(defaults.default_duration_minutes),
            channel_capacity: file
                .events
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
        }
    }
}

fn read_config_file(path: &Utf8Path) -> std::io::Result<String> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.read_to_string(file_name)
}
