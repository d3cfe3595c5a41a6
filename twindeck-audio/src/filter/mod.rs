//! Deck filter chain

mod biquad;
mod chain;

pub use biquad::{BiquadCoeffs, BiquadState};
pub use chain::{
    ChainCoefficients, FilterChain, FilterChainProcessor, FilterKind, FilterStage, StageSnapshot,
    HIGH_SHELF_HZ, LOW_SHELF_HZ, MID_PEAK_HZ, STAGE_COUNT, STAGE_Q, SWEEP_LIMIT_HZ,
};
