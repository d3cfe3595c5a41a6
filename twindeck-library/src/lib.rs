//! Track loading and configuration for twindeck

mod config;
mod length;
mod loader;

pub use config::{Config, ConfigError};
pub use length::format_length;
pub use loader::{LoadedTrack, TrackLoader, TrackMetadata};
