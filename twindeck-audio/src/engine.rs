//! Audio engine - two decks, the crossfader and the host mixing stage

use crate::cue::{CueAction, CueSet, DEFAULT_CUE_SLOTS};
use crate::deck::{Deck, DeckId, DeckRenderer, DeckSnapshot};
use crate::error::CommandError;
use crate::mixer::CrossfadeMixer;
use crate::source::SourceDecoder;
use std::path::PathBuf;
use std::sync::Arc;
use twindeck_analysis::{WaveformCache, DEFAULT_OVERVIEW_POINTS};

/// Default pre-allocation for render buffers, in frames
pub const MAX_BLOCK_FRAMES: usize = 4096;

/// Engine construction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Rate of the host output stream
    pub output_rate: u32,
    pub max_block_frames: usize,
    pub cue_slots: usize,
    /// Volume both decks start with
    pub initial_volume: f32,
    /// Recalling a cue also starts the deck
    pub recall_starts_playback: bool,
    /// Loading onto a playing deck starts the new track
    pub load_resumes_playback: bool,
    /// Overview resolution of the waveform caches
    pub waveform_points: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_rate: 48000,
            max_block_frames: MAX_BLOCK_FRAMES,
            cue_slots: DEFAULT_CUE_SLOTS,
            initial_volume: 0.5,
            recall_starts_playback: true,
            load_resumes_playback: true,
            waveform_points: DEFAULT_OVERVIEW_POINTS,
        }
    }
}

/// User intents handled on the control path
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Load(DeckId, PathBuf),
    Eject(DeckId),
    Start(DeckId),
    Stop(DeckId),
    Toggle(DeckId),
    SetVolume(DeckId, f32),
    /// Nudge the volume, stopping at 0 and 1
    AdjustVolume(DeckId, f32),
    SetSpeed(DeckId, f64),
    AdjustSpeed(DeckId, f64),
    SetPositionRelative(DeckId, f64),
    SetFilterFrequency(DeckId, f64),
    SetLowShelfGain(DeckId, f64),
    SetMidPeakGain(DeckId, f64),
    SetHighShelfGain(DeckId, f64),
    CaptureOrRecallCue(DeckId, usize),
    DeleteCue(DeckId, usize),
    /// Rename a cue mark; empty slots are left alone
    SetCueLabel(DeckId, usize, String),
    ClearCues(DeckId),
    SetCrossfade(f32),
    MoveCrossfade(f32),
}

/// Engine state for the view layer
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub deck_a: DeckSnapshot,
    pub deck_b: DeckSnapshot,
    pub crossfade: f32,
}

impl EngineSnapshot {
    pub fn deck(&self, id: DeckId) -> &DeckSnapshot {
        match id {
            DeckId::A => &self.deck_a,
            DeckId::B => &self.deck_b,
        }
    }
}

/// Control half of the engine
pub struct Engine {
    config: EngineConfig,
    decks: [Deck; 2],
    mixer: CrossfadeMixer,
    decoder: Arc<dyn SourceDecoder>,
}

impl Engine {
    /// Build the engine; the renderer goes to the audio callback
    pub fn new(config: EngineConfig, decoder: Arc<dyn SourceDecoder>) -> (Engine, EngineRenderer) {
        let build = |id: DeckId| {
            let (mut deck, renderer) = Deck::new(
                id,
                config.output_rate,
                config.max_block_frames,
                CueSet::new(id, config.cue_slots),
                WaveformCache::new(config.waveform_points),
            );
            if deck.set_volume(config.initial_volume).is_err() {
                tracing::warn!(
                    "Initial volume {} out of range, keeping {}",
                    config.initial_volume,
                    deck.volume()
                );
            }
            (deck, renderer)
        };
        let (deck_a, render_a) = build(DeckId::A);
        let (deck_b, render_b) = build(DeckId::B);
        let mixer = CrossfadeMixer::new(deck_a.crossfade_handle(), deck_b.crossfade_handle());

        tracing::debug!(
            "Engine created at {} Hz, {} frame blocks",
            config.output_rate,
            config.max_block_frames
        );

        let engine = Engine {
            config,
            decks: [deck_a, deck_b],
            mixer,
            decoder,
        };
        let renderer = EngineRenderer {
            decks: [render_a, render_b],
        };
        (engine, renderer)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn deck(&self, id: DeckId) -> &Deck {
        &self.decks[id.index()]
    }

    pub fn deck_mut(&mut self, id: DeckId) -> &mut Deck {
        &mut self.decks[id.index()]
    }

    pub fn mixer(&self) -> &CrossfadeMixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut CrossfadeMixer {
        &mut self.mixer
    }

    /// Free tracks both renderers have finished with; call once per UI tick
    pub fn collect_retired(&mut self) {
        for deck in self.decks.iter_mut() {
            deck.collect_retired();
        }
    }

    /// Apply one intent; rejected intents leave all state as it was
    pub fn handle_command(&mut self, cmd: EngineCommand) -> Result<(), CommandError> {
        self.collect_retired();
        match cmd {
            EngineCommand::Load(id, path) => {
                let decoder = Arc::clone(&self.decoder);
                let resume = self.config.load_resumes_playback;
                let deck = self.deck_mut(id);
                let was_playing = deck.is_playing();
                deck.load(decoder.as_ref(), &path)?;
                if resume && was_playing {
                    deck.start();
                }
            }
            EngineCommand::Eject(id) => self.deck_mut(id).eject(),
            EngineCommand::Start(id) => self.deck_mut(id).start(),
            EngineCommand::Stop(id) => self.deck_mut(id).stop(),
            EngineCommand::Toggle(id) => self.deck_mut(id).toggle(),
            EngineCommand::SetVolume(id, v) => self.deck_mut(id).set_volume(v)?,
            EngineCommand::AdjustVolume(id, delta) => {
                let deck = self.deck_mut(id);
                let target = (deck.volume() + delta).clamp(0.0, 1.0);
                deck.set_volume(target)?;
            }
            EngineCommand::SetSpeed(id, r) => self.deck_mut(id).set_speed_ratio(r)?,
            EngineCommand::AdjustSpeed(id, delta) => {
                let deck = self.deck_mut(id);
                let target = deck.speed_ratio() + delta;
                deck.set_speed_ratio(target)?;
            }
            EngineCommand::SetPositionRelative(id, p) => {
                self.deck_mut(id).set_position_relative(p)?
            }
            EngineCommand::SetFilterFrequency(id, f) => {
                self.deck_mut(id).set_filter_frequency(f)?
            }
            EngineCommand::SetLowShelfGain(id, g) => self.deck_mut(id).set_low_shelf_gain(g)?,
            EngineCommand::SetMidPeakGain(id, g) => self.deck_mut(id).set_mid_peak_gain(g)?,
            EngineCommand::SetHighShelfGain(id, g) => self.deck_mut(id).set_high_shelf_gain(g)?,
            EngineCommand::CaptureOrRecallCue(id, slot) => {
                let recall_starts = self.config.recall_starts_playback;
                let deck = self.deck_mut(id);
                match deck.capture_or_recall_cue(slot)? {
                    CueAction::Captured(mark) => {
                        tracing::debug!("Deck {}: cue {} set at {:.3}", id, slot, mark.relative_position);
                    }
                    CueAction::Recalled(_) if recall_starts => deck.start(),
                    CueAction::Recalled(_) => {}
                }
            }
            EngineCommand::DeleteCue(id, slot) => {
                self.deck_mut(id).delete_cue(slot)?;
            }
            EngineCommand::SetCueLabel(id, slot, label) => {
                self.deck_mut(id).cues_mut().set_label(slot, label)?
            }
            EngineCommand::ClearCues(id) => self.deck_mut(id).clear_cues(),
            EngineCommand::SetCrossfade(x) => self.mixer.set_crossfade(x)?,
            EngineCommand::MoveCrossfade(delta) => self.mixer.move_crossfade(delta)?,
        }
        Ok(())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            deck_a: self.decks[0].snapshot(),
            deck_b: self.decks[1].snapshot(),
            crossfade: self.mixer.crossfade(),
        }
    }
}

/// Render half of the engine, owned by the audio callback
pub struct EngineRenderer {
    decks: [DeckRenderer; 2],
}

impl EngineRenderer {
    /// Render both decks and sum them into `output` (interleaved stereo)
    pub fn process(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let frames = output.len() / 2;
        for deck in self.decks.iter_mut() {
            let block = deck.render_block(frames);
            for (out, sample) in output.iter_mut().zip(block.samples()) {
                *out += sample;
            }
        }
    }
}
