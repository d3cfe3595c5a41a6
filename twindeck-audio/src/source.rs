//! Decoded sample sources bound to decks

use crate::error::LoadError;
use std::path::Path;
use std::sync::Arc;

/// Decoded PCM ready for playback
///
/// Always interleaved stereo; the samples are shared, so cloning is cheap and
/// the waveform cache can read the same buffer the render path plays.
#[derive(Debug, Clone)]
pub struct SampleSource {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl SampleSource {
    /// Wrap interleaved stereo samples at their native rate
    pub fn new(samples: Arc<Vec<f32>>, sample_rate: u32) -> Result<Self, LoadError> {
        if sample_rate == 0 {
            return Err(LoadError::InvalidSource("sample rate is zero".into()));
        }
        if samples.len() % 2 != 0 {
            return Err(LoadError::InvalidSource(format!(
                "{} samples is not a whole number of stereo frames",
                samples.len()
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Build a stereo source from interleaved samples with any channel count
    ///
    /// Mono is duplicated to both sides; extra channels beyond two are dropped.
    pub fn from_interleaved(
        samples: &[f32],
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self, LoadError> {
        let stereo = match channels {
            0 => return Err(LoadError::InvalidSource("zero channels".into())),
            1 => samples.iter().flat_map(|&s| [s, s]).collect(),
            2 => samples.to_vec(),
            n => samples
                .chunks_exact(n)
                .flat_map(|frame| [frame[0], frame[1]])
                .collect(),
        };
        Self::new(Arc::new(stereo), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Shared handle to the sample buffer
    pub fn shared_samples(&self) -> Arc<Vec<f32>> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len_frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_secs(&self) -> f64 {
        self.len_frames() as f64 / self.sample_rate as f64
    }
}

/// The "decode file into a sample stream" capability
///
/// Decoding lives outside the audio core; the library crate provides the
/// real implementation.
pub trait SourceDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<SampleSource, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_rate() {
        assert!(matches!(
            SampleSource::new(Arc::new(vec![0.0; 4]), 0),
            Err(LoadError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_rejects_partial_frame() {
        assert!(SampleSource::new(Arc::new(vec![0.0; 3]), 44100).is_err());
    }

    #[test]
    fn test_mono_is_duplicated() {
        let src = SampleSource::from_interleaved(&[0.1, 0.2], 1, 48000).unwrap();
        assert_eq!(src.samples(), &[0.1, 0.1, 0.2, 0.2]);
        assert_eq!(src.len_frames(), 2);
    }

    #[test]
    fn test_surround_keeps_front_pair() {
        let src =
            SampleSource::from_interleaved(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 48000).unwrap();
        assert_eq!(src.samples(), &[1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_duration() {
        let src = SampleSource::new(Arc::new(vec![0.0; 2 * 44100]), 44100).unwrap();
        assert!((src.duration_secs() - 1.0).abs() < 1e-12);
    }
}
