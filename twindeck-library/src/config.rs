//! Simple configuration persistence for twindeck
//!
//! Plain `key=value` lines, `#` starts a comment. Unknown keys are ignored and
//! bad values fall back to their defaults, so a damaged file never stops the
//! program from starting.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use twindeck_audio::{EngineConfig, DEFAULT_CUE_SLOTS, MAX_BLOCK_FRAMES};

/// Config file could not be read or written
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Preferred output stream rate; the device default is used if unsupported
    pub sample_rate: u32,
    /// Largest render block pre-allocated for
    pub max_block_frames: usize,
    pub cue_slots: usize,
    pub initial_volume: f32,
    pub recall_starts_playback: bool,
    /// A deck that was playing starts the newly loaded track right away
    pub load_resumes_playback: bool,
    /// Folder offered for track lookups; nothing is stored there
    pub library_path: Option<PathBuf>,
    /// Resolution of the waveform overview
    pub waveform_bins: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            max_block_frames: MAX_BLOCK_FRAMES,
            cue_slots: DEFAULT_CUE_SLOTS,
            initial_volume: 0.5,
            recall_starts_playback: true,
            load_resumes_playback: true,
            library_path: None,
            waveform_bins: 1000,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.serialize()).map_err(io_err)
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("twindeck")
            .join("config.txt")
    }

    /// Engine parameters for an output stream running at `output_rate`
    pub fn engine_config(&self, output_rate: u32) -> EngineConfig {
        EngineConfig {
            output_rate,
            max_block_frames: self.max_block_frames,
            cue_slots: self.cue_slots,
            initial_volume: self.initial_volume,
            recall_starts_playback: self.recall_starts_playback,
            load_resumes_playback: self.load_resumes_playback,
            waveform_points: self.waveform_bins,
        }
    }

    /// Parse config from simple key=value format
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!("config line {}: expected key=value", number + 1);
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            let ok = match key {
                "sample_rate" => set_parsed(&mut config.sample_rate, value, |r| {
                    (8000..=384_000).contains(r)
                }),
                "max_block_frames" => set_parsed(&mut config.max_block_frames, value, |n| {
                    (16..=65536).contains(n)
                }),
                "cue_slots" => set_parsed(&mut config.cue_slots, value, |n| (1..=64).contains(n)),
                "initial_volume" => set_parsed(&mut config.initial_volume, value, |v| {
                    (0.0..=1.0).contains(v)
                }),
                "recall_starts_playback" => set_parsed(&mut config.recall_starts_playback, value, |_| true),
                "load_resumes_playback" => set_parsed(&mut config.load_resumes_playback, value, |_| true),
                "waveform_bins" => set_parsed(&mut config.waveform_bins, value, |n| *n > 0),
                "library_path" => {
                    config.library_path = (!value.is_empty()).then(|| PathBuf::from(value));
                    true
                }
                _ => true, // Ignore unknown keys
            };
            if !ok {
                tracing::warn!("config line {}: invalid value for {}: {:?}", number + 1, key, value);
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    pub fn serialize(&self) -> String {
        let mut lines = vec![
            "# twindeck configuration".to_string(),
            format!("sample_rate={}", self.sample_rate),
            format!("max_block_frames={}", self.max_block_frames),
            format!("cue_slots={}", self.cue_slots),
            format!("initial_volume={}", self.initial_volume),
            format!("recall_starts_playback={}", self.recall_starts_playback),
            format!("load_resumes_playback={}", self.load_resumes_playback),
            format!("waveform_bins={}", self.waveform_bins),
        ];
        if let Some(ref folder) = self.library_path {
            lines.push(format!("library_path={}", folder.display()));
        }
        lines.join("\n")
    }
}

/// Parse `value` into `slot` if it parses and passes `valid`; false otherwise
fn set_parsed<T: std::str::FromStr>(slot: &mut T, value: &str, valid: impl Fn(&T) -> bool) -> bool {
    match value.parse::<T>() {
        Ok(v) if valid(&v) => {
            *slot = v;
            true
        }
        _ => false,
    }
}
