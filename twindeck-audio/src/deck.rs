//! Deck implementation - transport, varispeed, filters and gain for one track
//!
//! A deck is split in two halves that share a set of atomics:
//! - [`Deck`] lives on the control path: loads, seeks, parameter setters, cues
//! - [`DeckRenderer`] lives on the render path and turns the bound source into
//!   audio blocks without locking, blocking or allocating

use crate::cue::{CueAction, CueMark, CueSet};
use crate::error::{CueError, LoadError, ParamError};
use crate::filter::{ChainCoefficients, FilterChain, FilterChainProcessor, FilterStage, STAGE_COUNT};
use crate::meter::{LoudnessMeter, SILENCE_DB};
use crate::resampler::Resampler;
use crate::shared::{AtomicF32, AtomicF64, Mailbox};
use crate::source::{SampleSource, SourceDecoder};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use twindeck_analysis::WaveformCache;

/// Upper bound of the speed ratio domain (0, MAX_SPEED_RATIO]
pub const MAX_SPEED_RATIO: f64 = 100.0;

/// Sources waiting to be freed off the render thread
const RETIRE_CAPACITY: usize = 8;

/// Deck identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckId {
    A,
    B,
}

impl DeckId {
    pub const ALL: [DeckId; 2] = [DeckId::A, DeckId::B];

    pub fn index(self) -> usize {
        match self {
            DeckId::A => 0,
            DeckId::B => 1,
        }
    }

    pub fn other(self) -> DeckId {
        match self {
            DeckId::A => DeckId::B,
            DeckId::B => DeckId::A,
        }
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckId::A => write!(f, "A"),
            DeckId::B => write!(f, "B"),
        }
    }
}

/// State visible to both halves of a deck
pub(crate) struct DeckShared {
    volume: AtomicF32,
    /// Written only by the crossfade mixer
    crossfade_gain: AtomicF32,
    speed_ratio: AtomicF64,
    playing: AtomicBool,
    /// Source frame index; advanced by the render path, seeks come from control
    position: AtomicF64,
    loudness: AtomicF32,
    coefficients: Mailbox<ChainCoefficients>,
    /// `Some(None)` pending means eject
    source: Mailbox<Option<SampleSource>>,
}

impl DeckShared {
    fn new(volume: f32) -> Self {
        Self {
            volume: AtomicF32::new(volume),
            crossfade_gain: AtomicF32::new(1.0),
            speed_ratio: AtomicF64::new(1.0),
            playing: AtomicBool::new(false),
            position: AtomicF64::new(0.0),
            loudness: AtomicF32::new(SILENCE_DB),
            coefficients: Mailbox::new(),
            source: Mailbox::new(),
        }
    }
}

/// Write access to a deck's crossfade gain, handed to the mixer
#[derive(Clone)]
pub struct CrossfadeGainHandle(Arc<DeckShared>);

impl CrossfadeGainHandle {
    pub(crate) fn store(&self, gain: f32) {
        self.0.crossfade_gain.store(gain);
    }

    pub fn load(&self) -> f32 {
        self.0.crossfade_gain.load()
    }
}

/// Everything the view layer shows about a deck
#[derive(Debug, Clone)]
pub struct DeckSnapshot {
    pub id: DeckId,
    pub loaded: bool,
    pub playing: bool,
    pub position_relative: f64,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: f32,
    pub speed_ratio: f64,
    pub crossfade_gain: f32,
    pub effective_gain: f32,
    pub loudness_db: f32,
    pub filters: [FilterStage; STAGE_COUNT],
    pub cues: Vec<CueMark>,
    pub waveform_ready: bool,
}

/// Control half of a deck
pub struct Deck {
    id: DeckId,
    shared: Arc<DeckShared>,
    output_rate: u32,
    /// Mirror of what the render path has (or is about to have) bound
    source: Option<SampleSource>,
    filters: FilterChain,
    cues: CueSet,
    waveform: WaveformCache,
    retired: HeapCons<SampleSource>,
}

impl Deck {
    /// Create both halves of a deck rendering at `output_rate`
    ///
    /// `max_block_frames` sizes the render scratch buffer up front.
    pub fn new(
        id: DeckId,
        output_rate: u32,
        max_block_frames: usize,
        cues: CueSet,
        waveform: WaveformCache,
    ) -> (Deck, DeckRenderer) {
        let shared = Arc::new(DeckShared::new(1.0));
        let (retire_tx, retire_rx) = HeapRb::<SampleSource>::new(RETIRE_CAPACITY).split();

        let deck = Deck {
            id,
            shared: Arc::clone(&shared),
            output_rate,
            source: None,
            filters: FilterChain::new(output_rate),
            cues,
            waveform,
            retired: retire_rx,
        };
        let renderer = DeckRenderer {
            shared,
            output_rate,
            source: None,
            filters: FilterChainProcessor::new(),
            buffer: vec![0.0; max_block_frames * 2],
            retired: retire_tx,
            overflow: None,
        };
        (deck, renderer)
    }

    pub fn id(&self) -> DeckId {
        self.id
    }

    pub(crate) fn crossfade_handle(&self) -> CrossfadeGainHandle {
        CrossfadeGainHandle(Arc::clone(&self.shared))
    }

    /// Decode `path` and bind it
    ///
    /// On failure nothing changes: the previous track (if any) stays bound
    /// and keeps its position, cues and play state.
    pub fn load(&mut self, decoder: &dyn SourceDecoder, path: &Path) -> Result<(), LoadError> {
        let source = decoder.decode(path).map_err(|e| {
            tracing::warn!("Deck {}: failed to load {}: {}", self.id, path.display(), e);
            e
        })?;
        tracing::info!(
            "Deck {}: loaded {} ({:.1}s at {} Hz)",
            self.id,
            path.display(),
            source.duration_secs(),
            source.sample_rate()
        );
        self.load_source(source);
        Ok(())
    }

    /// Bind an already decoded source
    pub fn load_source(&mut self, source: SampleSource) {
        self.collect_retired();
        self.shared.playing.store(false, Ordering::Release);
        self.shared.source.publish(Some(source.clone()));
        self.shared.position.store(0.0);

        self.cues.clear();
        self.waveform
            .on_load(source.shared_samples(), source.sample_rate());
        self.source = Some(source);
    }

    /// Unbind the current source
    pub fn eject(&mut self) {
        self.collect_retired();
        self.shared.playing.store(false, Ordering::Release);
        self.shared.source.publish(None);
        self.shared.position.store(0.0);

        self.cues.clear();
        self.waveform.on_unload();
        self.source = None;
        tracing::info!("Deck {}: ejected", self.id);
    }

    /// Drop sources the render path has swapped out
    ///
    /// The renderer never frees a track itself, so the control loop calls
    /// this every tick to release the previous track's samples.
    pub fn collect_retired(&mut self) {
        while self.retired.try_pop().is_some() {}
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&SampleSource> {
        self.source.as_ref()
    }

    /// Start playback; does nothing without a track
    pub fn start(&mut self) {
        if self.is_loaded() {
            self.shared.playing.store(true, Ordering::Release);
        }
    }

    pub fn stop(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
    }

    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.start();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    pub fn volume(&self) -> f32 {
        self.shared.volume.load()
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), ParamError> {
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(self.rejected("volume", volume));
        }
        self.shared.volume.store(volume);
        Ok(())
    }

    pub fn speed_ratio(&self) -> f64 {
        self.shared.speed_ratio.load()
    }

    /// Set the playback speed; pitch follows speed
    pub fn set_speed_ratio(&mut self, ratio: f64) -> Result<(), ParamError> {
        if !ratio.is_finite() || ratio <= 0.0 || ratio > MAX_SPEED_RATIO {
            return Err(self.rejected("speed ratio", ratio));
        }
        self.shared.speed_ratio.store(ratio);
        Ok(())
    }

    fn len_frames(&self) -> usize {
        self.source.as_ref().map_or(0, SampleSource::len_frames)
    }

    /// Seek to a source frame, clamped to the track length
    pub fn set_position(&mut self, frame: usize) {
        if self.is_loaded() {
            self.shared.position.store(frame.min(self.len_frames()) as f64);
        }
    }

    pub fn set_position_secs(&mut self, secs: f64) -> Result<(), ParamError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(self.rejected("position (s)", secs));
        }
        if let Some(source) = &self.source {
            let frame = (secs * source.sample_rate() as f64).min(source.len_frames() as f64);
            self.shared.position.store(frame);
        }
        Ok(())
    }

    pub fn set_position_relative(&mut self, relative: f64) -> Result<(), ParamError> {
        if !relative.is_finite() || !(0.0..=1.0).contains(&relative) {
            return Err(self.rejected("relative position", relative));
        }
        if self.is_loaded() {
            self.shared
                .position
                .store(relative * self.len_frames() as f64);
        }
        Ok(())
    }

    /// Current source frame
    pub fn position(&self) -> f64 {
        self.shared.position.load()
    }

    /// Position within the track, 0.0 - 1.0 (0.0 when nothing is loaded)
    pub fn position_relative(&self) -> f64 {
        let len = self.len_frames();
        if len == 0 {
            return 0.0;
        }
        (self.position() / len as f64).clamp(0.0, 1.0)
    }

    pub fn position_secs(&self) -> f64 {
        self.source
            .as_ref()
            .map_or(0.0, |s| self.position() / s.sample_rate() as f64)
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.source.as_ref().map_or(0.0, SampleSource::duration_secs)
    }

    /// Loudness of the last rendered block in dB
    pub fn loudness_level(&self) -> f32 {
        self.shared.loudness.load()
    }

    pub fn crossfade_gain(&self) -> f32 {
        self.shared.crossfade_gain.load()
    }

    /// Gain applied at the end of the render chain: volume x crossfade gain
    pub fn effective_gain(&self) -> f32 {
        self.volume() * self.crossfade_gain()
    }

    pub fn filter_chain(&self) -> &FilterChain {
        &self.filters
    }

    pub fn set_filter_frequency(&mut self, freq: f64) -> Result<(), ParamError> {
        let result = self.filters.set_frequency(freq);
        self.publish_filters(result)
    }

    pub fn set_low_shelf_gain(&mut self, gain_db: f64) -> Result<(), ParamError> {
        let result = self.filters.set_low_shelf_gain(gain_db);
        self.publish_filters(result)
    }

    pub fn set_mid_peak_gain(&mut self, gain_db: f64) -> Result<(), ParamError> {
        let result = self.filters.set_mid_peak_gain(gain_db);
        self.publish_filters(result)
    }

    pub fn set_high_shelf_gain(&mut self, gain_db: f64) -> Result<(), ParamError> {
        let result = self.filters.set_high_shelf_gain(gain_db);
        self.publish_filters(result)
    }

    fn publish_filters(&mut self, result: Result<(), ParamError>) -> Result<(), ParamError> {
        match result {
            Ok(()) => {
                self.shared.coefficients.publish(self.filters.coefficients());
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Deck {}: {}", self.id, e);
                Err(e)
            }
        }
    }

    /// Recall the slot's cue (seeking to it) or capture the current position
    pub fn capture_or_recall_cue(&mut self, slot: usize) -> Result<CueAction, CueError> {
        let current = self.is_loaded().then(|| self.position_relative());
        let action = self.cues.capture_or_recall(slot, current)?;
        if let CueAction::Recalled(relative) = action {
            // marks are always stored within [0, 1]
            let _ = self.set_position_relative(relative);
        }
        Ok(action)
    }

    pub fn delete_cue(&mut self, slot: usize) -> Result<Option<CueMark>, CueError> {
        self.cues.delete(slot)
    }

    pub fn clear_cues(&mut self) {
        self.cues.clear();
    }

    pub fn cues(&self) -> &CueSet {
        &self.cues
    }

    pub fn cues_mut(&mut self) -> &mut CueSet {
        &mut self.cues
    }

    pub fn waveform(&self) -> &WaveformCache {
        &self.waveform
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn snapshot(&self) -> DeckSnapshot {
        DeckSnapshot {
            id: self.id,
            loaded: self.is_loaded(),
            playing: self.is_playing(),
            position_relative: self.position_relative(),
            position_secs: self.position_secs(),
            duration_secs: self.total_duration_secs(),
            volume: self.volume(),
            speed_ratio: self.speed_ratio(),
            crossfade_gain: self.crossfade_gain(),
            effective_gain: self.effective_gain(),
            loudness_db: self.loudness_level(),
            filters: *self.filters.stages(),
            cues: self.cues.marks(),
            waveform_ready: self.waveform.is_ready(),
        }
    }

    fn rejected(&self, param: &'static str, value: impl Into<f64>) -> ParamError {
        let err = ParamError::out_of_range(param, value);
        tracing::debug!("Deck {}: {}", self.id, err);
        err
    }
}

/// One rendered block of interleaved stereo audio
pub struct AudioBlock<'a> {
    samples: &'a [f32],
    loudness_db: f32,
}

impl AudioBlock<'_> {
    pub fn samples(&self) -> &[f32] {
        self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn loudness_db(&self) -> f32 {
        self.loudness_db
    }
}

/// Render half of a deck
pub struct DeckRenderer {
    shared: Arc<DeckShared>,
    output_rate: u32,
    source: Option<SampleSource>,
    filters: FilterChainProcessor,
    /// Pre-allocated block buffer (interleaved stereo)
    buffer: Vec<f32>,
    retired: HeapProd<SampleSource>,
    /// A retired source the queue had no room for; retried next block
    overflow: Option<SampleSource>,
}

impl DeckRenderer {
    /// Render `frames` stereo frames
    ///
    /// Order: source swap, coefficient swap, varispeed read, filter chain,
    /// effective gain, loudness measurement.
    pub fn render_block(&mut self, frames: usize) -> AudioBlock<'_> {
        self.apply_pending();

        let len = frames * 2;
        if self.buffer.len() < len {
            // Only when the host exceeds the configured block size
            self.buffer.resize(len, 0.0);
        }
        let out = &mut self.buffer[..len];

        let playing = self.shared.playing.load(Ordering::Acquire);
        match (&self.source, playing) {
            (Some(source), true) => {
                let position = self.shared.position.load();
                let step = Resampler::step(
                    self.shared.speed_ratio.load(),
                    source.sample_rate(),
                    self.output_rate,
                );
                let outcome = Resampler::render(source.samples(), position, step, out);
                // A seek that landed during the block takes precedence
                if self
                    .shared
                    .position
                    .replace_if_unchanged(position, outcome.next_position)
                    && outcome.reached_end
                {
                    self.shared.playing.store(false, Ordering::Release);
                }
            }
            _ => out.fill(0.0),
        }

        self.filters.process(out);

        let gain = self.shared.volume.load() * self.shared.crossfade_gain.load();
        for sample in out.iter_mut() {
            *sample *= gain;
        }

        let loudness_db = LoudnessMeter::measure(out);
        self.shared.loudness.store(loudness_db);

        AudioBlock {
            samples: &self.buffer[..len],
            loudness_db,
        }
    }

    fn apply_pending(&mut self) {
        if let Some(old) = self.overflow.take() {
            self.retire(old);
        }
        if let Some(next) = self.shared.source.try_take() {
            self.filters.reset();
            if let Some(old) = std::mem::replace(&mut self.source, next) {
                self.retire(old);
            }
        }
        if let Some(coefficients) = self.shared.coefficients.try_take() {
            self.filters.install(coefficients);
        }
    }

    fn retire(&mut self, source: SampleSource) {
        if let Err(source) = self.retired.try_push(source) {
            self.overflow = Some(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::DEFAULT_CUE_SLOTS;
    use crate::filter::FilterKind;
    use std::path::PathBuf;
    use std::thread;
    use std::time::{Duration, Instant};

    const RATE: u32 = 48000;

    fn deck() -> (Deck, DeckRenderer) {
        Deck::new(
            DeckId::A,
            RATE,
            1024,
            CueSet::with_seed(DeckId::A, DEFAULT_CUE_SLOTS, 1),
            WaveformCache::new(100),
        )
    }

    fn constant(frames: usize, value: f32, rate: u32) -> SampleSource {
        SampleSource::new(Arc::new(vec![value; frames * 2]), rate).unwrap()
    }

    struct FailingDecoder;

    impl SourceDecoder for FailingDecoder {
        fn decode(&self, _path: &Path) -> Result<SampleSource, LoadError> {
            Err(LoadError::UnsupportedFormat)
        }
    }

    #[test]
    fn test_deck_id() {
        assert_eq!(DeckId::A.other(), DeckId::B);
        assert_eq!(DeckId::B.index(), 1);
        assert_eq!(DeckId::B.to_string(), "B");
    }

    #[test]
    fn test_start_requires_track() {
        let (mut deck, _) = deck();
        deck.start();
        assert!(!deck.is_playing());
        deck.load_source(constant(100, 0.1, RATE));
        deck.toggle();
        assert!(deck.is_playing());
        deck.toggle();
        assert!(!deck.is_playing());
    }

    #[test]
    fn test_render_advances_position() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(RATE as usize, 0.1, RATE));
        deck.start();
        renderer.render_block(512);
        assert_eq!(deck.position(), 512.0);
    }

    #[test]
    fn test_speed_ratio_spans_more_frames() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(RATE as usize, 0.1, RATE));
        deck.set_speed_ratio(1.2).unwrap();
        deck.start();
        renderer.render_block(512);
        assert!((deck.position() - 512.0 * 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_native_rate_is_compensated() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(RATE as usize, 0.1, RATE / 2));
        deck.start();
        renderer.render_block(512);
        assert_eq!(deck.position(), 256.0);
    }

    #[test]
    fn test_stopped_deck_is_silent() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(1000, 0.5, RATE));
        let block = renderer.render_block(64);
        assert!(block.samples().iter().all(|&s| s == 0.0));
        assert_eq!(block.loudness_db(), SILENCE_DB);
        assert_eq!(deck.position(), 0.0);
    }

    #[test]
    fn test_end_of_track_stops_playback() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(100, 0.5, RATE));
        deck.start();
        let block = renderer.render_block(256);
        assert!(block.samples()[..200].iter().all(|&s| s != 0.0));
        assert!(block.samples()[200..].iter().all(|&s| s == 0.0));
        assert!(!deck.is_playing());
        assert_eq!(deck.position_relative(), 1.0);
    }

    #[test]
    fn test_effective_gain_scales_output() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(1000, 0.5, RATE));
        deck.set_volume(0.5).unwrap();
        deck.crossfade_handle().store(0.5);
        deck.start();

        assert_eq!(deck.effective_gain(), 0.25);
        let block = renderer.render_block(32);
        assert!(block.samples().iter().all(|&s| (s - 0.125).abs() < 1e-6));
        let expected = crate::meter::gain_to_decibels(0.125);
        assert!((deck.loudness_level() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_rejected_parameters_keep_previous_value() {
        let (mut deck, _) = deck();
        deck.set_volume(0.7).unwrap();
        assert!(deck.set_volume(1.01).is_err());
        assert!(deck.set_volume(-0.1).is_err());
        assert!(deck.set_volume(f32::NAN).is_err());
        assert_eq!(deck.volume(), 0.7);

        deck.set_speed_ratio(100.0).unwrap();
        assert!(deck.set_speed_ratio(0.0).is_err());
        assert!(deck.set_speed_ratio(100.5).is_err());
        assert!(deck.set_speed_ratio(-1.0).is_err());
        assert_eq!(deck.speed_ratio(), 100.0);
    }

    #[test]
    fn test_set_position_relative_out_of_range_is_noop() {
        let (mut deck, _) = deck();
        deck.load_source(constant(1000, 0.1, RATE));
        deck.set_position_relative(0.5).unwrap();
        for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(deck.set_position_relative(bad).is_err());
        }
        assert_eq!(deck.position(), 500.0);
        assert_eq!(deck.position_relative(), 0.5);
    }

    #[test]
    fn test_seek_in_seconds_and_frames() {
        let (mut deck, _) = deck();
        deck.load_source(constant(RATE as usize * 2, 0.1, RATE));
        deck.set_position_secs(1.5).unwrap();
        assert!((deck.position_secs() - 1.5).abs() < 1e-9);
        deck.set_position_secs(10.0).unwrap();
        assert_eq!(deck.position_relative(), 1.0);
        assert!(deck.set_position_secs(-1.0).is_err());

        deck.set_position(usize::MAX);
        assert_eq!(deck.position(), (RATE * 2) as f64);
        assert!((deck.total_duration_secs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_filter_sweep_reaches_renderer() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(RATE as usize, 1.0, RATE));
        deck.set_filter_frequency(-5000.0).unwrap();
        assert!(deck.filter_chain().is_active(FilterKind::LowPass));
        assert!(!deck.filter_chain().is_active(FilterKind::HighPass));
        assert_eq!(deck.filter_chain().stage(FilterKind::LowPass).frequency, 15000.0);

        // high-pass on a DC input settles to silence
        deck.set_filter_frequency(2000.0).unwrap();
        deck.start();
        let block = renderer.render_block(1024);
        assert!(block.samples()[block.samples().len() - 1].abs() < 1e-3);
    }

    #[test]
    fn test_replaced_track_is_freed() {
        let (mut deck, mut renderer) = deck();
        let first = Arc::new(vec![0.1f32; 2000]);
        deck.load_source(SampleSource::new(Arc::clone(&first), RATE).unwrap());
        deck.start();
        renderer.render_block(16);

        deck.load_source(constant(1000, 0.1, RATE));
        renderer.render_block(16);

        // the waveform build may still hold the samples for a moment
        let deadline = Instant::now() + Duration::from_secs(5);
        while Arc::strong_count(&first) > 1 && Instant::now() < deadline {
            deck.collect_retired();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(Arc::strong_count(&first), 1);
    }

    #[test]
    fn test_extreme_band_gain_never_reaches_renderer() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(RATE as usize, 0.5, RATE));
        deck.start();

        assert!(deck.set_low_shelf_gain(2000.0).is_err());
        let block = renderer.render_block(64);
        assert!(block.samples().iter().all(|s| s.is_finite()));

        deck.set_low_shelf_gain(0.0).unwrap();
        for _ in 0..50 {
            renderer.render_block(64);
        }
        let block = renderer.render_block(64);
        assert!(block.samples().iter().all(|s| s.is_finite()));
        assert!(deck.loudness_level() > SILENCE_DB);
    }

    #[test]
    fn test_cue_round_trip() {
        let (mut deck, _) = deck();
        deck.load_source(constant(1000, 0.1, RATE));
        deck.set_position_relative(0.25).unwrap();

        let captured = deck.capture_or_recall_cue(0).unwrap();
        assert!(matches!(captured, CueAction::Captured(ref m) if m.relative_position == 0.25));

        deck.set_position_relative(0.8).unwrap();
        assert_eq!(deck.capture_or_recall_cue(0).unwrap(), CueAction::Recalled(0.25));
        assert_eq!(deck.position_relative(), 0.25);
        assert_eq!(deck.cues().iter().count(), 1);
    }

    #[test]
    fn test_capture_without_track_fails() {
        let (mut deck, _) = deck();
        assert_eq!(deck.capture_or_recall_cue(0), Err(CueError::NotLoaded));
    }

    #[test]
    fn test_reload_clears_cues_and_position() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(1000, 0.1, RATE));
        deck.set_position_relative(0.5).unwrap();
        deck.capture_or_recall_cue(0).unwrap();
        deck.capture_or_recall_cue(3).unwrap();
        deck.start();
        renderer.render_block(16);

        deck.load_source(constant(2000, 0.1, RATE));
        assert!(deck.cues().is_empty());
        assert_eq!(deck.position(), 0.0);
        assert!(!deck.is_playing());
        renderer.render_block(16);
        assert_eq!(deck.position(), 0.0);
    }

    #[test]
    fn test_failed_load_keeps_previous_track() {
        let (mut deck, _) = deck();
        deck.load_source(constant(1000, 0.1, RATE));
        deck.set_position_relative(0.5).unwrap();
        deck.capture_or_recall_cue(1).unwrap();

        let err = deck.load(&FailingDecoder, &PathBuf::from("broken.mp3"));
        assert!(matches!(err, Err(LoadError::UnsupportedFormat)));
        assert!(deck.is_loaded());
        assert_eq!(deck.position_relative(), 0.5);
        assert!(deck.cues().get(1).is_some());
    }

    #[test]
    fn test_eject_silences_renderer() {
        let (mut deck, mut renderer) = deck();
        deck.load_source(constant(1000, 0.5, RATE));
        deck.start();
        renderer.render_block(16);
        deck.eject();
        deck.start();
        assert!(!deck.is_loaded());
        assert!(!deck.is_playing());
        let block = renderer.render_block(16);
        assert!(block.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_snapshot() {
        let (mut deck, _) = deck();
        deck.load_source(constant(RATE as usize, 0.1, RATE));
        deck.set_volume(0.8).unwrap();
        deck.set_mid_peak_gain(-3.0).unwrap();
        let snap = deck.snapshot();
        assert!(snap.loaded);
        assert_eq!(snap.volume, 0.8);
        assert_eq!(snap.effective_gain, 0.8);
        assert!((snap.duration_secs - 1.0).abs() < 1e-12);
        assert!(snap.filters.iter().any(|s| s.kind == FilterKind::Peak && s.active));
    }
}
