//! Audio file decoding into deck-ready sample sources

use std::path::Path;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey};
use symphonia::core::probe::Hint;
use twindeck_audio::{LoadError, SampleSource, SourceDecoder};

/// Frames per rubato processing chunk
const RESAMPLE_CHUNK: usize = 1024;

/// Track metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: f64,
    /// Rate of the file before resampling
    pub native_sample_rate: u32,
    pub channels: u16,
}

/// A decoded track: playable source plus what the file said about itself
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    pub source: SampleSource,
    pub metadata: TrackMetadata,
}

/// Audio file loader using Symphonia
///
/// Output is always stereo at the loader's target rate.
pub struct TrackLoader {
    target_sample_rate: u32,
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::with_sample_rate(48000)
    }
}

impl TrackLoader {
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<LoadedTrack, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| match e {
                SymphoniaError::Unsupported(_) => LoadError::UnsupportedFormat,
                other => LoadError::Decode(other.to_string()),
            })?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let native_rate = codec_params.sample_rate.unwrap_or(44100);
        let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|_| LoadError::UnsupportedFormat)?;

        let mut metadata = read_metadata(format.as_mut(), path);
        metadata.native_sample_rate = native_rate;
        metadata.channels = channels as u16;

        let mut interleaved: Vec<f32> = Vec::new();
        let mut skipped_packets = 0usize;
        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    tracing::warn!("{}: stopped reading at {}", path.display(), e);
                    break;
                }
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(_)) => {
                    skipped_packets += 1;
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
        if skipped_packets > 0 {
            tracing::warn!("{}: skipped {} corrupt packets", path.display(), skipped_packets);
        }

        let stereo = SampleSource::from_interleaved(&interleaved, channels, native_rate)?;
        metadata.duration_secs = stereo.duration_secs();
        if stereo.len_frames() == 0 {
            return Err(LoadError::Decode("no audio frames decoded".into()));
        }

        let source = if native_rate != self.target_sample_rate {
            let resampled = resample_stereo(stereo.samples(), native_rate, self.target_sample_rate)?;
            SampleSource::new(Arc::new(resampled), self.target_sample_rate)?
        } else {
            stereo
        };

        tracing::debug!(
            "Decoded {} ({} ch @ {} Hz -> {} Hz, {:.1}s)",
            path.display(),
            channels,
            native_rate,
            source.sample_rate(),
            metadata.duration_secs
        );

        Ok(LoadedTrack { source, metadata })
    }
}

impl SourceDecoder for TrackLoader {
    fn decode(&self, path: &Path) -> Result<SampleSource, LoadError> {
        self.load(path).map(|track| track.source)
    }
}

/// Resample interleaved stereo from `source_rate` to `target_rate`
fn resample_stereo(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, LoadError> {
    use rubato::{FftFixedInOut, Resampler};

    let frames = samples.len() / 2;
    let mut resampler =
        FftFixedInOut::<f32>::new(source_rate as usize, target_rate as usize, RESAMPLE_CHUNK, 2)
            .map_err(|e| LoadError::Decode(e.to_string()))?;

    let (left, right): (Vec<f32>, Vec<f32>) =
        samples.chunks_exact(2).map(|f| (f[0], f[1])).unzip();

    let chunk = resampler.input_frames_next();
    let expected = (frames as u64 * target_rate as u64 / source_rate as u64) as usize;
    let mut out_left = Vec::with_capacity(expected + chunk);
    let mut out_right = Vec::with_capacity(expected + chunk);

    let mut pos = 0;
    while pos < frames {
        let end = (pos + chunk).min(frames);
        let (mut in_l, mut in_r) = (left[pos..end].to_vec(), right[pos..end].to_vec());
        // Last chunk is zero padded to the fixed input size
        in_l.resize(chunk, 0.0);
        in_r.resize(chunk, 0.0);

        let out = resampler
            .process(&[in_l, in_r], None)
            .map_err(|e| LoadError::Decode(e.to_string()))?;
        out_left.extend_from_slice(&out[0]);
        out_right.extend_from_slice(&out[1]);
        pos = end;
    }

    out_left.truncate(expected);
    out_right.truncate(expected);
    Ok(out_left
        .into_iter()
        .zip(out_right)
        .flat_map(|(l, r)| [l, r])
        .collect())
}

fn read_metadata(format: &mut dyn FormatReader, path: &Path) -> TrackMetadata {
    let mut metadata = TrackMetadata {
        title: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string(),
        artist: "Unknown".to_string(),
        album: "Unknown".to_string(),
        ..Default::default()
    };

    if let Some(meta) = format.metadata().current() {
        for tag in meta.tags() {
            match tag.std_key {
                Some(StandardTagKey::TrackTitle) => metadata.title = tag.value.to_string(),
                Some(StandardTagKey::Artist) => metadata.artist = tag.value.to_string(),
                Some(StandardTagKey::Album) => metadata.album = tag.value.to_string(),
                _ => {}
            }
        }
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    /// Write a 16-bit PCM mono WAV with a quiet ramp
    fn write_wav(name: &str, rate: u32, frames: u32) -> PathBuf {
        let path = std::env::temp_dir().join(format!("twindeck-{}-{}.wav", std::process::id(), name));
        let data_len = frames * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..frames {
            let s = ((i % 100) as i16) * 50;
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&bytes).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = TrackLoader::default();
        let err = loader.load(Path::new("/definitely/not/here.wav"));
        assert!(matches!(err, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let path = std::env::temp_dir().join(format!("twindeck-{}-garbage.mp3", std::process::id()));
        std::fs::write(&path, b"this is not audio at all").unwrap();
        assert!(TrackLoader::default().load(&path).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_mono_wav_becomes_stereo() {
        let path = write_wav("mono", 48000, 4800);
        let track = TrackLoader::with_sample_rate(48000).load(&path).unwrap();
        assert_eq!(track.metadata.channels, 1);
        assert_eq!(track.source.sample_rate(), 48000);
        assert_eq!(track.source.len_frames(), 4800);
        let s = track.source.samples();
        assert_eq!(s[20], s[21]);
        assert!((track.metadata.duration_secs - 0.1).abs() < 1e-9);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_resampled_to_target_rate() {
        let path = write_wav("resample", 44100, 4410);
        let loader = TrackLoader::with_sample_rate(48000);
        let source = loader.decode(&path).unwrap();
        assert_eq!(source.sample_rate(), 48000);
        assert_eq!(source.len_frames(), 4800);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_resample_length_is_proportional() {
        let input = vec![0.25f32; 2 * 22050];
        let out = resample_stereo(&input, 22050, 44100).unwrap();
        assert_eq!(out.len(), 2 * 44100);
    }
}
