//! Waveform analysis for twindeck
//!
//! Builds the amplitude envelope the view layer draws from, at several
//! zoom resolutions, and caches it per deck.

mod cache;
mod waveform;

pub use cache::{WaveformCache, DEFAULT_OVERVIEW_POINTS};
pub use waveform::{
    zoom_window, EnvelopeBin, EnvelopeLevel, FrequencyBand, OverviewPoint, WaveformEnvelope,
    FINEST_BIN_FRAMES,
};
