//! Audio core for twindeck - decks, filter chain, crossfader and cues
//!
//! This crate provides the real-time signal path and its control surface:
//! - Deck: transport, varispeed resampling, filter chain, gain and metering
//! - FilterChain: five cascaded biquads (three EQ bands, a sweepable HP/LP)
//! - CrossfadeMixer: maps the crossfader onto the two decks' gains
//! - CueSet: hot cue marks keyed by slot
//! - Engine: command handling on the control path, rendering on the audio path

mod cue;
mod deck;
mod engine;
mod error;
pub mod filter;
mod meter;
mod mixer;
mod resampler;
mod shared;
mod source;

pub use cue::{CueAction, CueMark, CueSet, DEFAULT_CUE_SLOTS};
pub use deck::{
    AudioBlock, CrossfadeGainHandle, Deck, DeckId, DeckRenderer, DeckSnapshot, MAX_SPEED_RATIO,
};
pub use engine::{Engine, EngineCommand, EngineConfig, EngineRenderer, EngineSnapshot, MAX_BLOCK_FRAMES};
pub use error::{CommandError, CueError, LoadError, ParamError};
pub use filter::{FilterChain, FilterKind, FilterStage};
pub use meter::{gain_to_decibels, LoudnessMeter, SILENCE_DB};
pub use mixer::{crossfade_gains, CrossfadeMixer};
pub use resampler::{ResampleOutcome, Resampler};
pub use source::{SampleSource, SourceDecoder};
