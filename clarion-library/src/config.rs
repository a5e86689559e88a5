//! Simple configuration persistence for Clarion
//!
//! Session rate, host block size, fade and loop timings, last stimulus folder.

use clarion_audio::EngineConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Preferred device and session sample rate
    pub sample_rate: u32,
    /// Host block size in frames
    pub block_frames: usize,
    /// Raised-cosine ramp length
    pub fade_window_ms: f64,
    /// Shortest accepted loop
    pub minimum_loop_ms: f64,
    /// Comparison sessions start looping
    pub looping: bool,
    pub command_capacity: usize,
    pub event_capacity: usize,
    /// Folder the last stimuli were loaded from
    pub last_stimulus_folder: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_frames: 256,
            fade_window_ms: EngineConfig::FADE_WINDOW_SECS * 1000.0,
            minimum_loop_ms: EngineConfig::MINIMUM_LOOP_SECS * 1000.0,
            looping: true,
            command_capacity: EngineConfig::COMMAND_CAPACITY,
            event_capacity: EngineConfig::EVENT_CAPACITY,
            last_stimulus_folder: None,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, slot: &mut T) {
    match value.parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "ignoring malformed config value"),
    }
}

fn parse_flag(key: &str, value: &str, slot: &mut bool) {
    match value {
        "true" | "on" | "1" => *slot = true,
        "false" | "off" | "0" => *slot = false,
        _ => warn!(key, value, "ignoring malformed config value"),
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clarion")
            .join("config.txt")
    }

    /// Engine parameters in frames at the configured sample rate
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            looping: self.looping,
            command_capacity: self.command_capacity.max(1),
            event_capacity: self.event_capacity.max(1),
            ..EngineConfig::from_durations(
                self.sample_rate,
                self.fade_window_ms / 1000.0,
                self.minimum_loop_ms / 1000.0,
            )
        }
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                warn!(line, "ignoring config line without '='");
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "sample_rate" => parse_value(key, value, &mut config.sample_rate),
                "block_frames" => parse_value(key, value, &mut config.block_frames),
                "fade_window_ms" => parse_value(key, value, &mut config.fade_window_ms),
                "minimum_loop_ms" => parse_value(key, value, &mut config.minimum_loop_ms),
                "looping" => parse_flag(key, value, &mut config.looping),
                "command_capacity" => parse_value(key, value, &mut config.command_capacity),
                "event_capacity" => parse_value(key, value, &mut config.event_capacity),
                "last_stimulus_folder" => {
                    if !value.is_empty() {
                        config.last_stimulus_folder = Some(PathBuf::from(value));
                    }
                }
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let mut lines = vec![
            "# Clarion Configuration".to_string(),
            format!("sample_rate={}", self.sample_rate),
            format!("block_frames={}", self.block_frames),
            format!("fade_window_ms={}", self.fade_window_ms),
            format!("minimum_loop_ms={}", self.minimum_loop_ms),
            format!("looping={}", self.looping),
            format!("command_capacity={}", self.command_capacity),
            format!("event_capacity={}", self.event_capacity),
        ];
        if let Some(ref folder) = self.last_stimulus_folder {
            lines.push(format!("last_stimulus_folder={}", folder.display()));
        }
        lines.join("\n")
    }
}
