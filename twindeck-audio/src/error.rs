//! Error types for the audio core

use thiserror::Error;

/// A track could not be bound to a deck
///
/// The deck keeps whatever it had bound before.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Unsupported format")]
    UnsupportedFormat,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

/// A parameter was outside its documented domain and was ignored
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ParamError {
    #[error("{param} = {value} is outside its allowed range")]
    OutOfRange { param: &'static str, value: f64 },
}

impl ParamError {
    pub(crate) fn out_of_range(param: &'static str, value: impl Into<f64>) -> Self {
        ParamError::OutOfRange {
            param,
            value: value.into(),
        }
    }
}

/// Cue slot operations that could not be carried out
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueError {
    #[error("cue slot {0} does not exist")]
    InvalidSlot(usize),
    #[error("no track loaded")]
    NotLoaded,
}

/// Failure of an engine command, reported back to the control loop
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Cue(#[from] CueError),
}
