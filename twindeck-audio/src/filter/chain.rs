//! Five-stage deck filter: three EQ bands plus a sweepable high/low-pass

use super::biquad::{BiquadCoeffs, BiquadState};
use crate::error::ParamError;
use std::f64::consts::FRAC_1_SQRT_2;

/// Corner of the low shelf band (Hz)
pub const LOW_SHELF_HZ: f64 = 500.0;
/// Centre of the mid peak band (Hz)
pub const MID_PEAK_HZ: f64 = 3250.0;
/// Corner of the high shelf band (Hz)
pub const HIGH_SHELF_HZ: f64 = 5000.0;
/// Q shared by every stage
pub const STAGE_Q: f64 = FRAC_1_SQRT_2;
/// The filter sweep runs from -SWEEP_LIMIT_HZ (low-pass) to +SWEEP_LIMIT_HZ (high-pass)
pub const SWEEP_LIMIT_HZ: f64 = 20000.0;

/// Number of stages in a chain
pub const STAGE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowShelf,
    Peak,
    HighShelf,
    HighPass,
    LowPass,
}

impl FilterKind {
    /// Processing order: each stage feeds the next
    pub const CHAIN_ORDER: [FilterKind; STAGE_COUNT] = [
        FilterKind::LowShelf,
        FilterKind::Peak,
        FilterKind::HighShelf,
        FilterKind::HighPass,
        FilterKind::LowPass,
    ];

    fn index(self) -> usize {
        match self {
            FilterKind::LowShelf => 0,
            FilterKind::Peak => 1,
            FilterKind::HighShelf => 2,
            FilterKind::HighPass => 3,
            FilterKind::LowPass => 4,
        }
    }
}

/// One stage's parameters and derived coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterStage {
    pub kind: FilterKind,
    pub active: bool,
    /// Corner/centre frequency in Hz
    pub frequency: f64,
    pub q: f64,
    /// Only meaningful for the shelf and peak bands
    pub gain_db: f64,
    pub coefficients: BiquadCoeffs,
}

impl FilterStage {
    fn new(kind: FilterKind) -> Self {
        let frequency = match kind {
            FilterKind::LowShelf => LOW_SHELF_HZ,
            FilterKind::Peak => MID_PEAK_HZ,
            FilterKind::HighShelf => HIGH_SHELF_HZ,
            FilterKind::HighPass | FilterKind::LowPass => SWEEP_LIMIT_HZ,
        };
        Self {
            kind,
            active: false,
            frequency,
            q: STAGE_Q,
            gain_db: 0.0,
            coefficients: BiquadCoeffs::IDENTITY,
        }
    }

    fn derive(&mut self, sample_rate: f64) {
        self.coefficients = match self.kind {
            FilterKind::LowPass => BiquadCoeffs::low_pass(sample_rate, self.frequency, self.q),
            FilterKind::HighPass => BiquadCoeffs::high_pass(sample_rate, self.frequency, self.q),
            FilterKind::LowShelf => {
                BiquadCoeffs::low_shelf(sample_rate, self.frequency, self.q, self.gain_db)
            }
            FilterKind::Peak => BiquadCoeffs::peak(sample_rate, self.frequency, self.q, self.gain_db),
            FilterKind::HighShelf => {
                BiquadCoeffs::high_shelf(sample_rate, self.frequency, self.q, self.gain_db)
            }
        };
    }
}

/// Active flag and coefficients of one stage as seen by the render path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSnapshot {
    pub active: bool,
    pub coefficients: BiquadCoeffs,
}

/// Complete coefficient set, published to the render path in one piece
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainCoefficients {
    pub stages: [StageSnapshot; STAGE_COUNT],
}

impl Default for ChainCoefficients {
    fn default() -> Self {
        Self {
            stages: [StageSnapshot {
                active: false,
                coefficients: BiquadCoeffs::IDENTITY,
            }; STAGE_COUNT],
        }
    }
}

/// Control-side filter parameters for one deck
#[derive(Debug, Clone)]
pub struct FilterChain {
    sample_rate: f64,
    stages: [FilterStage; STAGE_COUNT],
}

impl FilterChain {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            stages: FilterKind::CHAIN_ORDER.map(FilterStage::new),
        }
    }

    pub fn stage(&self, kind: FilterKind) -> &FilterStage {
        &self.stages[kind.index()]
    }

    pub fn stages(&self) -> &[FilterStage; STAGE_COUNT] {
        &self.stages
    }

    pub fn is_active(&self, kind: FilterKind) -> bool {
        self.stage(kind).active
    }

    /// Drive the single sweep control
    ///
    /// Positive values high-pass at `freq`, negative values low-pass at
    /// `SWEEP_LIMIT_HZ + freq`, zero bypasses both. At most one of the two
    /// pass stages is ever active.
    pub fn set_frequency(&mut self, freq: f64) -> Result<(), ParamError> {
        if !freq.is_finite() || !(-SWEEP_LIMIT_HZ..=SWEEP_LIMIT_HZ).contains(&freq) {
            return Err(ParamError::out_of_range("filter frequency", freq));
        }

        let sample_rate = self.sample_rate;
        if freq > 0.0 {
            self.stages[FilterKind::LowPass.index()].active = false;
            let hp = &mut self.stages[FilterKind::HighPass.index()];
            hp.frequency = freq;
            hp.active = true;
            hp.derive(sample_rate);
        } else if freq < 0.0 {
            self.stages[FilterKind::HighPass.index()].active = false;
            let lp = &mut self.stages[FilterKind::LowPass.index()];
            lp.frequency = SWEEP_LIMIT_HZ + freq;
            lp.active = true;
            lp.derive(sample_rate);
        } else {
            self.stages[FilterKind::HighPass.index()].active = false;
            self.stages[FilterKind::LowPass.index()].active = false;
        }
        Ok(())
    }

    pub fn set_low_shelf_gain(&mut self, gain_db: f64) -> Result<(), ParamError> {
        self.set_band_gain(FilterKind::LowShelf, gain_db)
    }

    pub fn set_mid_peak_gain(&mut self, gain_db: f64) -> Result<(), ParamError> {
        self.set_band_gain(FilterKind::Peak, gain_db)
    }

    pub fn set_high_shelf_gain(&mut self, gain_db: f64) -> Result<(), ParamError> {
        self.set_band_gain(FilterKind::HighShelf, gain_db)
    }

    // Any finite gain is accepted as long as its coefficients fit in f32
    fn set_band_gain(&mut self, kind: FilterKind, gain_db: f64) -> Result<(), ParamError> {
        if !gain_db.is_finite() {
            return Err(ParamError::out_of_range("band gain", gain_db));
        }
        let mut stage = self.stages[kind.index()];
        stage.gain_db = gain_db;
        stage.active = true;
        stage.derive(self.sample_rate);
        if !stage.coefficients.is_finite() {
            return Err(ParamError::out_of_range("band gain", gain_db));
        }
        self.stages[kind.index()] = stage;
        Ok(())
    }

    /// Snapshot for the render path
    pub fn coefficients(&self) -> ChainCoefficients {
        ChainCoefficients {
            stages: self.stages.map(|s| StageSnapshot {
                active: s.active,
                coefficients: s.coefficients,
            }),
        }
    }
}

/// Render-side filter state: applies the latest installed coefficient set
pub struct FilterChainProcessor {
    current: ChainCoefficients,
    /// Left/right history per stage
    state: [[BiquadState; 2]; STAGE_COUNT],
}

impl Default for FilterChainProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterChainProcessor {
    pub fn new() -> Self {
        Self {
            current: ChainCoefficients::default(),
            state: [[BiquadState::default(); 2]; STAGE_COUNT],
        }
    }

    /// Swap in a complete coefficient set between blocks
    pub fn install(&mut self, next: ChainCoefficients) {
        for (i, (old, new)) in self.current.stages.iter().zip(next.stages.iter()).enumerate() {
            // A stage coming back must not replay history from its last activation
            let revived = new.active && !old.active;
            let poisoned = !self.state[i].iter().all(BiquadState::is_finite);
            if revived || poisoned {
                self.state[i] = [BiquadState::default(); 2];
            }
        }
        self.current = next;
    }

    pub fn reset(&mut self) {
        self.state = [[BiquadState::default(); 2]; STAGE_COUNT];
    }

    /// Filter an interleaved stereo block in place
    ///
    /// A stage whose history overflows is cleared and the block is muted, so
    /// the next block starts from silence instead of feeding NaN back in.
    pub fn process(&mut self, samples: &mut [f32]) {
        for (stage, state) in self.current.stages.iter().zip(self.state.iter_mut()) {
            if !stage.active {
                continue;
            }
            let [left, right] = state;
            for frame in samples.chunks_exact_mut(2) {
                frame[0] = left.process(frame[0], &stage.coefficients);
                frame[1] = right.process(frame[1], &stage.coefficients);
            }
            if !(left.is_finite() && right.is_finite()) {
                left.reset();
                right.reset();
                samples.fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_fully_bypassed() {
        let chain = FilterChain::new(44100);
        assert!(chain.stages().iter().all(|s| !s.active));
        assert_eq!(chain.stages().map(|s| s.kind), FilterKind::CHAIN_ORDER);
    }

    #[test]
    fn test_positive_sweep_selects_high_pass() {
        let mut chain = FilterChain::new(44100);
        chain.set_frequency(-3000.0).unwrap();
        chain.set_frequency(800.0).unwrap();
        assert!(chain.is_active(FilterKind::HighPass));
        assert!(!chain.is_active(FilterKind::LowPass));
        assert_eq!(chain.stage(FilterKind::HighPass).frequency, 800.0);
    }

    #[test]
    fn test_negative_sweep_selects_low_pass() {
        let mut chain = FilterChain::new(44100);
        chain.set_frequency(800.0).unwrap();
        chain.set_frequency(-5000.0).unwrap();
        assert!(chain.is_active(FilterKind::LowPass));
        assert!(!chain.is_active(FilterKind::HighPass));
        assert_eq!(chain.stage(FilterKind::LowPass).frequency, 15000.0);
    }

    #[test]
    fn test_zero_sweep_bypasses_both() {
        let mut chain = FilterChain::new(44100);
        chain.set_frequency(-5000.0).unwrap();
        chain.set_frequency(0.0).unwrap();
        assert!(!chain.is_active(FilterKind::LowPass));
        assert!(!chain.is_active(FilterKind::HighPass));
    }

    #[test]
    fn test_sweep_out_of_range_is_ignored() {
        let mut chain = FilterChain::new(44100);
        chain.set_frequency(1200.0).unwrap();
        let before = chain.clone();

        assert!(chain.set_frequency(20000.5).is_err());
        assert!(chain.set_frequency(-25000.0).is_err());
        assert!(chain.set_frequency(f64::NAN).is_err());
        assert_eq!(chain.stages(), before.stages());
    }

    #[test]
    fn test_band_gain_accepts_any_finite_value() {
        let mut chain = FilterChain::new(48000);
        chain.set_low_shelf_gain(-48.0).unwrap();
        chain.set_mid_peak_gain(3.0).unwrap();
        chain.set_high_shelf_gain(30.0).unwrap();
        assert!(chain.is_active(FilterKind::LowShelf));
        assert_eq!(chain.stage(FilterKind::HighShelf).gain_db, 30.0);
        assert!(chain.set_mid_peak_gain(f64::INFINITY).is_err());
        assert_eq!(chain.stage(FilterKind::Peak).gain_db, 3.0);
    }

    #[test]
    fn test_overflowing_band_gain_is_rejected() {
        let mut chain = FilterChain::new(48000);
        chain.set_low_shelf_gain(6.0).unwrap();
        let before = *chain.stage(FilterKind::LowShelf);

        assert!(chain.set_low_shelf_gain(2000.0).is_err());
        assert!(chain.set_mid_peak_gain(2000.0).is_err());
        assert_eq!(*chain.stage(FilterKind::LowShelf), before);
        assert!(!chain.is_active(FilterKind::Peak));
        // a deep cut only underflows towards zero
        assert!(chain.set_high_shelf_gain(-2000.0).is_ok());
        assert!(chain.stages().iter().all(|s| s.coefficients.is_finite()));
    }

    #[test]
    fn test_huge_accepted_gain_renders_finite() {
        let mut chain = FilterChain::new(48000);
        chain.set_low_shelf_gain(1000.0).unwrap();
        chain.set_mid_peak_gain(1000.0).unwrap();
        chain.set_high_shelf_gain(1000.0).unwrap();
        let mut proc = FilterChainProcessor::new();
        proc.install(chain.coefficients());

        for _ in 0..20 {
            let mut block: Vec<f32> = (0..512).map(|i| ((i as f32) * 0.05).sin()).collect();
            proc.process(&mut block);
            assert!(block.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn test_recovers_after_non_finite_input() {
        let mut chain = FilterChain::new(48000);
        chain.set_low_shelf_gain(6.0).unwrap();
        let mut proc = FilterChainProcessor::new();
        proc.install(chain.coefficients());

        let mut block = vec![0.5f32; 64];
        block[10] = f32::NAN;
        proc.process(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));

        chain.set_low_shelf_gain(0.0).unwrap();
        proc.install(chain.coefficients());
        let mut block = vec![0.5f32; 64];
        proc.process(&mut block);
        assert!(block.iter().all(|s| s.is_finite()));
        assert!((block[63] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_sweep_endpoints() {
        let mut chain = FilterChain::new(48000);
        // full low-pass: corner at 0 Hz, clamped to 1 Hz when derived
        chain.set_frequency(-SWEEP_LIMIT_HZ).unwrap();
        assert!(chain.is_active(FilterKind::LowPass));
        assert_eq!(chain.stage(FilterKind::LowPass).frequency, 0.0);
        let lp = chain.stage(FilterKind::LowPass).coefficients;
        assert!(lp.magnitude_at(48000.0, 1000.0) < 1e-5);

        chain.set_frequency(SWEEP_LIMIT_HZ).unwrap();
        assert!(chain.is_active(FilterKind::HighPass));
        assert!(!chain.is_active(FilterKind::LowPass));
        let hp = chain.stage(FilterKind::HighPass).coefficients;
        assert!(hp.magnitude_at(48000.0, 1000.0) < 1e-2);
    }

    #[test]
    fn test_coefficients_recomputed_on_change() {
        let mut chain = FilterChain::new(48000);
        chain.set_low_shelf_gain(6.0).unwrap();
        let first = chain.stage(FilterKind::LowShelf).coefficients;
        chain.set_low_shelf_gain(-6.0).unwrap();
        assert_ne!(first, chain.stage(FilterKind::LowShelf).coefficients);
    }

    #[test]
    fn test_bypassed_processor_is_transparent() {
        let mut proc = FilterChainProcessor::new();
        proc.install(FilterChain::new(44100).coefficients());
        let mut block = vec![0.5, -0.5, 0.25, -0.25];
        proc.process(&mut block);
        assert_eq!(block, vec![0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn test_high_pass_removes_dc() {
        let mut chain = FilterChain::new(48000);
        chain.set_frequency(1000.0).unwrap();
        let mut proc = FilterChainProcessor::new();
        proc.install(chain.coefficients());

        let mut block = vec![1.0f32; 2 * 4800];
        proc.process(&mut block);
        assert!(block[block.len() - 1].abs() < 1e-3);
        assert!(block[block.len() - 2].abs() < 1e-3);
    }

    #[test]
    fn test_low_pass_keeps_dc() {
        let mut chain = FilterChain::new(48000);
        chain.set_frequency(-19000.0).unwrap(); // low-pass at 1kHz
        let mut proc = FilterChainProcessor::new();
        proc.install(chain.coefficients());

        let mut block = vec![1.0f32; 2 * 4800];
        proc.process(&mut block);
        assert!((block[block.len() - 1] - 1.0).abs() < 1e-3);
    }
}
