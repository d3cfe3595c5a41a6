//! Varispeed playback by linear interpolation (speed changes pitch)

/// Result of rendering one block from a source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleOutcome {
    /// Source frame position after the block
    pub next_position: f64,
    /// Output frames taken from the source; the rest of the block is silence
    pub frames_written: usize,
    /// The source ran out during this block
    pub reached_end: bool,
}

/// Maps output frames onto a span of source frames
#[derive(Debug, Clone, Copy)]
pub struct Resampler;

impl Resampler {
    /// Source frames consumed per output frame
    ///
    /// Equal rates give exactly `speed_ratio`; a source at a different native
    /// rate is compensated so that ratio 1.0 always plays at original speed.
    #[inline]
    pub fn step(speed_ratio: f64, source_rate: u32, output_rate: u32) -> f64 {
        speed_ratio * source_rate as f64 / output_rate.max(1) as f64
    }

    /// Fill `out` (interleaved stereo) from `samples` (interleaved stereo)
    ///
    /// Starts at source frame `position` and advances by `step` per output
    /// frame. On running out of source the position pins to the last frame
    /// boundary and the remainder of `out` is zeroed.
    pub fn render(samples: &[f32], position: f64, step: f64, out: &mut [f32]) -> ResampleOutcome {
        let len = samples.len() / 2;
        let end = len as f64;
        let mut pos = position.max(0.0);
        let mut written = 0;
        let mut reached_end = false;

        for frame in out.chunks_exact_mut(2) {
            if pos >= end {
                reached_end = true;
                break;
            }

            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let (l0, r0) = (samples[idx * 2], samples[idx * 2 + 1]);
            if idx + 1 < len {
                let (l1, r1) = (samples[idx * 2 + 2], samples[idx * 2 + 3]);
                frame[0] = l0 + frac * (l1 - l0);
                frame[1] = r0 + frac * (r1 - r0);
            } else {
                frame[0] = l0;
                frame[1] = r0;
            }

            written += 1;
            pos += step;
        }

        if pos >= end {
            reached_end = true;
            pos = end;
        }
        out[written * 2..].fill(0.0);

        ResampleOutcome {
            next_position: pos,
            frames_written: written,
            reached_end,
        }
    }
}
