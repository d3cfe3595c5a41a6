//! Multi-resolution amplitude envelope for waveform display

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Frames per bin of the finest envelope level
pub const FINEST_BIN_FRAMES: usize = 64;

/// Each coarser level groups this many bins of the level below
const LEVEL_FACTOR: usize = 8;

/// Maximum number of envelope levels kept per track
const MAX_LEVELS: usize = 4;

/// Dominant frequency band of an overview bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyBand {
    /// Below 250Hz - kicks, bass lines
    Bass,
    /// 250Hz to 4kHz - vocals, instruments
    #[default]
    Mid,
    /// Above 4kHz - hats, cymbals
    High,
}

/// Min/max amplitude of a span of frames (mono mixdown)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvelopeBin {
    pub min: f32,
    pub max: f32,
}

impl EnvelopeBin {
    fn merge(self, other: EnvelopeBin) -> EnvelopeBin {
        EnvelopeBin {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Peak absolute amplitude of this bin
    pub fn peak(&self) -> f32 {
        self.max.abs().max(self.min.abs())
    }
}

/// One zoom resolution of the envelope
#[derive(Debug, Clone)]
pub struct EnvelopeLevel {
    pub frames_per_bin: usize,
    pub bins: Vec<EnvelopeBin>,
}

/// Point of the fixed-size overview used for band colouring
#[derive(Debug, Clone, Copy, Default)]
pub struct OverviewPoint {
    /// Peak amplitude (0.0-1.0)
    pub amplitude: f32,
    pub band: FrequencyBand,
}

/// Complete envelope summary of one loaded track
#[derive(Debug, Clone)]
pub struct WaveformEnvelope {
    sample_rate: u32,
    total_frames: usize,
    /// Ordered finest to coarsest
    levels: Vec<EnvelopeLevel>,
    overview: Vec<OverviewPoint>,
}

impl WaveformEnvelope {
    /// Build the envelope from interleaved stereo samples
    pub fn build(samples: &[f32], sample_rate: u32, overview_points: usize) -> Self {
        let total_frames = samples.len() / 2;
        let mut levels = Vec::with_capacity(MAX_LEVELS);

        let finest: Vec<EnvelopeBin> = samples
            .chunks(FINEST_BIN_FRAMES * 2)
            .map(|chunk| {
                chunk.chunks_exact(2).fold(
                    EnvelopeBin {
                        min: f32::MAX,
                        max: f32::MIN,
                    },
                    |bin, frame| {
                        let mono = (frame[0] + frame[1]) * 0.5;
                        EnvelopeBin {
                            min: bin.min.min(mono),
                            max: bin.max.max(mono),
                        }
                    },
                )
            })
            .map(|bin| if bin.min > bin.max { EnvelopeBin::default() } else { bin })
            .collect();
        levels.push(EnvelopeLevel {
            frames_per_bin: FINEST_BIN_FRAMES,
            bins: finest,
        });

        while levels.len() < MAX_LEVELS {
            let prev = &levels[levels.len() - 1];
            if prev.bins.len() <= LEVEL_FACTOR {
                break;
            }
            let bins = prev
                .bins
                .chunks(LEVEL_FACTOR)
                .map(|group| group.iter().copied().reduce(EnvelopeBin::merge).unwrap_or_default())
                .collect();
            let frames_per_bin = prev.frames_per_bin * LEVEL_FACTOR;
            levels.push(EnvelopeLevel { frames_per_bin, bins });
        }

        let overview = BandClassifier::new(sample_rate).overview(samples, overview_points);

        Self {
            sample_rate,
            total_frames,
            levels,
            overview,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Total duration the envelope is keyed on
    pub fn total_duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_frames as f64 / self.sample_rate as f64
    }

    pub fn levels(&self) -> &[EnvelopeLevel] {
        &self.levels
    }

    pub fn overview(&self) -> &[OverviewPoint] {
        &self.overview
    }

    /// Min/max pairs for `width` columns covering `[start_secs, end_secs)`
    ///
    /// Columns outside the track (e.g. before 0 when the zoomed view is
    /// centred near the start) are returned as silence.
    pub fn draw_channel(
        &self,
        start_secs: f64,
        end_secs: f64,
        width: usize,
        vertical_scale: f32,
    ) -> Vec<(f32, f32)> {
        let mut columns = vec![(0.0, 0.0); width];
        if width == 0 || end_secs <= start_secs || self.total_frames == 0 {
            return columns;
        }

        let rate = self.sample_rate as f64;
        let frames_per_column = (end_secs - start_secs) * rate / width as f64;
        let level = self.level_for(frames_per_column);

        for (col, out) in columns.iter_mut().enumerate() {
            let col_start = start_secs * rate + col as f64 * frames_per_column;
            let col_end = col_start + frames_per_column;
            if col_end <= 0.0 || col_start >= self.total_frames as f64 {
                continue;
            }
            let first = (col_start.max(0.0) as usize) / level.frames_per_bin;
            let last = ((col_end.ceil() as usize).saturating_sub(1) / level.frames_per_bin)
                .min(level.bins.len().saturating_sub(1));
            if let Some(bin) = level.bins[first.min(last)..=last]
                .iter()
                .copied()
                .reduce(EnvelopeBin::merge)
            {
                *out = (bin.min * vertical_scale, bin.max * vertical_scale);
            }
        }

        columns
    }

    /// Coarsest level that still gives at least one bin per column
    fn level_for(&self, frames_per_column: f64) -> &EnvelopeLevel {
        self.levels
            .iter()
            .rev()
            .find(|level| level.frames_per_bin as f64 <= frames_per_column)
            .unwrap_or(&self.levels[0])
    }
}

/// Start/end seconds of a zoom window centred on a relative playhead
///
/// `fraction` is the share of the track visible (the zoomed deck view shows 1/40).
/// The window may start before zero; callers render that part as silence.
pub fn zoom_window(total_secs: f64, relative: f64, fraction: f64) -> (f64, f64) {
    let centre = relative * total_secs;
    let half = total_secs * fraction / 2.0;
    (centre - half, centre + half)
}

/// Classifies spans of audio by their dominant frequency band
struct BandClassifier {
    sample_rate: u32,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl BandClassifier {
    const FFT_SIZE: usize = 512;

    fn new(sample_rate: u32) -> Self {
        let fft_size = Self::FFT_SIZE;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let window = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();
        Self {
            sample_rate,
            fft_size,
            fft,
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    fn overview(&mut self, samples: &[f32], points: usize) -> Vec<OverviewPoint> {
        let total_frames = samples.len() / 2;
        if total_frames == 0 || points == 0 {
            return vec![OverviewPoint::default(); points];
        }
        let frames_per_point = (total_frames / points).max(1);
        let mut mono = Vec::with_capacity(frames_per_point);

        (0..points)
            .map(|idx| {
                let start = idx * frames_per_point;
                if start >= total_frames {
                    return OverviewPoint::default();
                }
                let end = (start + frames_per_point).min(total_frames);
                mono.clear();
                mono.extend(
                    samples[start * 2..end * 2]
                        .chunks_exact(2)
                        .map(|f| (f[0] + f[1]) * 0.5),
                );
                let amplitude = mono.iter().fold(0.0f32, |acc, s| acc.max(s.abs())).min(1.0);
                let band = if mono.len() >= self.fft_size / 4 {
                    self.classify(&mono)
                } else {
                    FrequencyBand::Mid
                };
                OverviewPoint { amplitude, band }
            })
            .collect()
    }

    fn classify(&mut self, mono: &[f32]) -> FrequencyBand {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = mono.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let bin_hz = self.sample_rate as f32 / self.fft_size as f32;
        let nyquist = self.fft_size / 2;
        let bass_end = ((250.0 / bin_hz) as usize).clamp(2, nyquist);
        let mid_end = ((4000.0 / bin_hz) as usize).clamp(bass_end, nyquist);

        let avg = |from: usize, to: usize| -> f32 {
            if to <= from {
                return 0.0;
            }
            self.buffer[from..to].iter().map(|c| c.norm_sqr()).sum::<f32>() / (to - from) as f32
        };
        let bass = avg(1, bass_end);
        let mid = avg(bass_end, mid_end);
        let high = avg(mid_end, nyquist);

        if bass >= mid && bass >= high {
            FrequencyBand::Bass
        } else if high >= mid {
            FrequencyBand::High
        } else {
            FrequencyBand::Mid
        }
    }
}
