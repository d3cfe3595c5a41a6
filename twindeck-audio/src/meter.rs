//! Per-block RMS loudness

/// Level reported for silence (and the floor for any quieter signal)
pub const SILENCE_DB: f32 = -100.0;

/// Linear gain to decibels, floored at [`SILENCE_DB`]
#[inline]
pub fn gain_to_decibels(gain: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(SILENCE_DB)
    } else {
        SILENCE_DB
    }
}

/// Stereo loudness of one block: mean of the per-channel RMS levels in dB
///
/// No smoothing is applied across blocks.
pub struct LoudnessMeter;

impl LoudnessMeter {
    pub fn measure(samples: &[f32]) -> f32 {
        let frames = samples.len() / 2;
        if frames == 0 {
            return SILENCE_DB;
        }

        let (mut sum_l, mut sum_r) = (0.0f64, 0.0f64);
        for frame in samples.chunks_exact(2) {
            sum_l += (frame[0] as f64) * (frame[0] as f64);
            sum_r += (frame[1] as f64) * (frame[1] as f64);
        }
        let rms_l = (sum_l / frames as f64).sqrt() as f32;
        let rms_r = (sum_r / frames as f64).sqrt() as f32;

        (gain_to_decibels(rms_l) + gain_to_decibels(rms_r)) / 2.0
    }
}
