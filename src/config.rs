//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; a missing section takes its defaults and
//! `Config::default()` always validates.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{DualSenseError, LayoutError, Result};
use crate::report::layout::{InputLayout, LayoutPreset, OutputLayout};
use crate::report::ReportCodec;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_async_poll_wait_ms")]
    pub async_poll_wait_ms: u64,

    #[serde(default = "default_enumerate_capacity")]
    pub enumerate_capacity: usize,

    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default)]
    pub player_id: u8,
}

/// Effect scheduler configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EffectsConfig {
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
}

/// Report layout configuration
///
/// `input` and `output` replace the preset tables when present.
#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    #[serde(default = "default_layout_preset")]
    pub preset: LayoutPreset,

    #[serde(default)]
    pub input: Option<InputLayout>,

    #[serde(default)]
    pub output: Option<OutputLayout>,
}

/// Raw report capture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_capture_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to stderr only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_read_timeout_ms() -> u64 { 100 }
fn default_async_poll_wait_ms() -> u64 { 4 }
fn default_enumerate_capacity() -> usize { 8 }
fn default_auto_reconnect() -> bool { true }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_tick_rate_hz() -> u32 { 250 }

fn default_layout_preset() -> LayoutPreset { LayoutPreset::Usb }

fn default_capture_dir() -> String { "./captures".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            async_poll_wait_ms: default_async_poll_wait_ms(),
            enumerate_capacity: default_enumerate_capacity(),
            auto_reconnect: default_auto_reconnect(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            player_id: 0,
        }
    }
}

impl SessionConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn async_poll_wait(&self) -> Duration {
        Duration::from_millis(self.async_poll_wait_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self { tick_rate_hz: default_tick_rate_hz() }
    }
}

impl EffectsConfig {
    /// Interval between scheduler ticks
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate_hz.max(1) as u64)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            preset: default_layout_preset(),
            input: None,
            output: None,
        }
    }
}

impl LayoutConfig {
    /// Build the report codec for the configured tables
    pub fn codec(&self) -> std::result::Result<ReportCodec, LayoutError> {
        let input = self.input.clone().unwrap_or_else(|| self.preset.input());
        let output = self.output.clone().unwrap_or_else(|| self.preset.output());
        ReportCodec::new(input, output)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_capture_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dualsense_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range or the
    /// report layout tables are inconsistent
    pub fn validate(&self) -> Result<()> {
        fn invalid(message: &str) -> DualSenseError {
            DualSenseError::Config(toml::de::Error::custom(message))
        }

        // Session timing
        if self.session.read_timeout_ms == 0 || self.session.read_timeout_ms > 10000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        if self.session.async_poll_wait_ms > 1000 {
            return Err(invalid("async_poll_wait_ms must be between 0 and 1000"));
        }

        if self.session.enumerate_capacity == 0 || self.session.enumerate_capacity > 64 {
            return Err(invalid("enumerate_capacity must be between 1 and 64"));
        }

        if self.session.reconnect_interval_ms == 0 || self.session.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        if self.session.player_id > 4 {
            return Err(invalid("player_id must be between 0 and 4"));
        }

        // Effect tick rate
        if ![60, 120, 250, 500, 1000].contains(&self.effects.tick_rate_hz) {
            return Err(invalid("tick_rate_hz must be one of: 60, 120, 250, 500, 1000"));
        }

        // Capture files
        if self.capture.enabled && self.capture.log_dir.is_empty() {
            return Err(invalid("capture log_dir cannot be empty when enabled"));
        }

        if self.capture.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.capture.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.capture.format != "jsonl" {
            return Err(invalid("capture format must be 'jsonl' (only supported format)"));
        }

        // Logging
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        // Report tables
        self.layout.codec()?;

        Ok(())
    }
}
