//! Playback views and the helper that keeps them in step with a deck
//!
//! Each view only knows its own relative position and whether the user is
//! dragging it. [`TransportSync`] runs once per UI tick and decides who leads:
//! a dragged view drives the deck, otherwise the deck drives every view.

use twindeck_audio::{Deck, ParamError};

/// Scrub distance per jog or zoom drag step, in seconds
pub const SCRUB_STEP_SECS: f64 = 0.1;

/// How the deck behaves while a view is being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubMode {
    /// Playback halts for the whole drag
    Halt,
    /// Playback runs while the scrub position moves and halts when it rests
    Follow,
}

/// A view showing (and possibly setting) a deck's playback position
pub trait PlaybackView {
    fn relative_position(&self) -> f64;
    /// Follow the deck; values outside 0.0 - 1.0 are clamped
    fn set_relative_position(&mut self, relative: f64);
    fn is_dragging(&self) -> bool;
    fn scrub_mode(&self) -> ScrubMode;
}

/// What [`TransportSync`] needs from a deck
pub trait Transport {
    fn is_loaded(&self) -> bool;
    fn is_playing(&self) -> bool;
    fn start(&mut self);
    fn stop(&mut self);
    fn position_relative(&self) -> f64;
    fn set_position_relative(&mut self, relative: f64) -> Result<(), ParamError>;
}

impl Transport for Deck {
    fn is_loaded(&self) -> bool {
        Deck::is_loaded(self)
    }

    fn is_playing(&self) -> bool {
        Deck::is_playing(self)
    }

    fn start(&mut self) {
        Deck::start(self)
    }

    fn stop(&mut self) {
        Deck::stop(self)
    }

    fn position_relative(&self) -> f64 {
        Deck::position_relative(self)
    }

    fn set_position_relative(&mut self, relative: f64) -> Result<(), ParamError> {
        Deck::set_position_relative(self, relative)
    }
}

/// Whole-track view: pressing or dragging jumps straight to the pointer
#[derive(Debug, Clone, Default)]
pub struct OverviewView {
    position: f64,
    dragging: bool,
    width: u16,
}

impl OverviewView {
    pub fn new(width: u16) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
    }

    /// Pointer pressed or dragged at column `x`
    pub fn press(&mut self, x: u16) {
        if self.width == 0 {
            return;
        }
        self.dragging = true;
        self.position = (x as f64 / self.width as f64).clamp(0.0, 1.0);
    }

    pub fn release(&mut self) {
        self.dragging = false;
    }
}

impl PlaybackView for OverviewView {
    fn relative_position(&self) -> f64 {
        self.position
    }

    fn set_relative_position(&mut self, relative: f64) {
        self.position = relative.clamp(0.0, 1.0);
    }

    fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn scrub_mode(&self) -> ScrubMode {
        ScrubMode::Halt
    }
}

/// Moves `position` one scrub step forwards or backwards through a track
fn scrub_step(position: f64, forward: bool, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return position;
    }
    let step = SCRUB_STEP_SECS / duration_secs;
    let next = if forward { position + step } else { position - step };
    next.clamp(0.0, 1.0)
}

/// Zoomed strip around the playhead: dragging left moves forward in time
#[derive(Debug, Clone, Default)]
pub struct ZoomView {
    position: f64,
    dragging: bool,
    duration_secs: f64,
    prev_x: Option<u16>,
}

impl ZoomView {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            ..Self::default()
        }
    }

    pub fn set_duration(&mut self, secs: f64) {
        self.duration_secs = secs;
    }

    pub fn drag_to(&mut self, x: u16) {
        self.dragging = true;
        if let Some(prev) = self.prev_x {
            if x != prev {
                self.position = scrub_step(self.position, x < prev, self.duration_secs);
            }
        }
        self.prev_x = Some(x);
    }

    pub fn release(&mut self) {
        self.dragging = false;
        self.prev_x = None;
    }
}

impl PlaybackView for ZoomView {
    fn relative_position(&self) -> f64 {
        self.position
    }

    fn set_relative_position(&mut self, relative: f64) {
        self.position = relative.clamp(0.0, 1.0);
    }

    fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn scrub_mode(&self) -> ScrubMode {
        ScrubMode::Follow
    }
}

/// Jog wheel: turning clockwise moves forward, counter-clockwise back
#[derive(Debug, Clone, Default)]
pub struct JogView {
    position: f64,
    dragging: bool,
    duration_secs: f64,
    prev_angle: Option<f64>,
}

impl JogView {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            ..Self::default()
        }
    }

    pub fn set_duration(&mut self, secs: f64) {
        self.duration_secs = secs;
    }

    /// Pointer dragged to `angle` (radians around the wheel centre)
    pub fn turn_to(&mut self, angle: f64) {
        self.dragging = true;
        if let Some(prev) = self.prev_angle {
            if angle != prev {
                self.position = scrub_step(self.position, angle > prev, self.duration_secs);
            }
        }
        self.prev_angle = Some(angle);
    }

    pub fn release(&mut self) {
        self.dragging = false;
        self.prev_angle = None;
    }

    /// Playhead angle in degrees; the wheel turns once per two seconds of audio
    pub fn playhead_degrees(&self) -> f64 {
        self.position * 360.0 * self.duration_secs / 2.0
    }
}

impl PlaybackView for JogView {
    fn relative_position(&self) -> f64 {
        self.position
    }

    fn set_relative_position(&mut self, relative: f64) {
        self.position = relative.clamp(0.0, 1.0);
    }

    fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn scrub_mode(&self) -> ScrubMode {
        ScrubMode::Follow
    }
}

/// Per-deck arbitration between views and the transport
#[derive(Debug, Clone, Default)]
pub struct TransportSync {
    /// Index of the view whose drag is in progress (or just ended)
    dragged: Option<usize>,
    last_scrub: Option<f64>,
    /// What the user last asked for with play/pause
    play_intent: bool,
}

impl TransportSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play_intent(&self) -> bool {
        self.play_intent
    }

    pub fn set_play_intent(&mut self, playing: bool) {
        self.play_intent = playing;
    }

    /// One UI tick
    pub fn tick<T: Transport + ?Sized>(&mut self, transport: &mut T, views: &mut [&mut dyn PlaybackView]) {
        if !transport.is_loaded() {
            return;
        }

        for (i, view) in views.iter_mut().enumerate() {
            if view.is_dragging() {
                let position = view.relative_position();
                self.dragged = Some(i);
                match view.scrub_mode() {
                    ScrubMode::Halt => transport.stop(),
                    ScrubMode::Follow if self.last_scrub == Some(position) => transport.stop(),
                    ScrubMode::Follow => {
                        if !transport.is_playing() {
                            transport.start();
                        }
                    }
                }
                // views clamp, so this cannot be rejected
                let _ = transport.set_position_relative(position);
                self.last_scrub = Some(position);
            } else if self.dragged == Some(i) {
                if self.play_intent {
                    transport.start();
                } else {
                    transport.stop();
                }
                self.dragged = None;
                self.last_scrub = None;
            } else {
                view.set_relative_position(transport.position_relative());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeDeck {
        loaded: bool,
        playing: bool,
        position: f64,
    }

    impl Transport for FakeDeck {
        fn is_loaded(&self) -> bool {
            self.loaded
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
        fn start(&mut self) {
            self.playing = true;
        }
        fn stop(&mut self) {
            self.playing = false;
        }
        fn position_relative(&self) -> f64 {
            self.position
        }
        fn set_position_relative(&mut self, relative: f64) -> Result<(), ParamError> {
            self.position = relative;
            Ok(())
        }
    }

    fn loaded(playing: bool, position: f64) -> FakeDeck {
        FakeDeck {
            loaded: true,
            playing,
            position,
        }
    }

    #[test]
    fn test_views_follow_deck() {
        let mut deck = loaded(true, 0.4);
        let mut overview = OverviewView::new(100);
        let mut jog = JogView::new(60.0);
        let mut sync = TransportSync::new();

        sync.tick(&mut deck, &mut [&mut overview as &mut dyn PlaybackView, &mut jog]);
        assert_eq!(overview.relative_position(), 0.4);
        assert_eq!(jog.relative_position(), 0.4);
    }

    #[test]
    fn test_unloaded_deck_is_left_alone() {
        let mut deck = FakeDeck::default();
        let mut overview = OverviewView::new(100);
        overview.press(50);
        TransportSync::new().tick(&mut deck, &mut [&mut overview as &mut dyn PlaybackView]);
        assert_eq!(deck.position, 0.0);
    }

    #[test]
    fn test_overview_drag_halts_then_resumes() {
        let mut deck = loaded(true, 0.1);
        let mut overview = OverviewView::new(200);
        let mut sync = TransportSync::new();
        sync.set_play_intent(true);

        overview.press(50);
        sync.tick(&mut deck, &mut [&mut overview as &mut dyn PlaybackView]);
        assert!(!deck.playing);
        assert_eq!(deck.position, 0.25);

        overview.release();
        sync.tick(&mut deck, &mut [&mut overview as &mut dyn PlaybackView]);
        assert!(deck.playing);
    }

    #[test]
    fn test_release_respects_paused_intent() {
        let mut deck = loaded(false, 0.0);
        let mut jog = JogView::new(10.0);
        let mut sync = TransportSync::new();

        jog.turn_to(0.0);
        jog.turn_to(0.5);
        sync.tick(&mut deck, &mut [&mut jog as &mut dyn PlaybackView]);
        assert!(deck.playing);

        jog.release();
        sync.tick(&mut deck, &mut [&mut jog as &mut dyn PlaybackView]);
        assert!(!deck.playing);
    }

    #[test]
    fn test_jog_plays_while_moving_and_stops_at_rest() {
        let mut deck = loaded(false, 0.5);
        let mut jog = JogView::new(10.0);
        let mut sync = TransportSync::new();
        sync.tick(&mut deck, &mut [&mut jog as &mut dyn PlaybackView]);

        jog.turn_to(1.0);
        jog.turn_to(1.2);
        sync.tick(&mut deck, &mut [&mut jog as &mut dyn PlaybackView]);
        assert!(deck.playing);
        assert!((deck.position - 0.51).abs() < 1e-9);

        // still held, not moved
        sync.tick(&mut deck, &mut [&mut jog as &mut dyn PlaybackView]);
        assert!(!deck.playing);

        jog.turn_to(0.9);
        sync.tick(&mut deck, &mut [&mut jog as &mut dyn PlaybackView]);
        assert!(deck.playing);
        assert!((deck.position - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_drag_direction() {
        let mut zoom = ZoomView::new(20.0);
        zoom.set_relative_position(0.5);
        zoom.drag_to(40);
        zoom.drag_to(30);
        assert!((zoom.relative_position() - 0.505).abs() < 1e-9);
        zoom.drag_to(35);
        assert!((zoom.relative_position() - 0.5).abs() < 1e-9);
        assert_eq!(zoom.scrub_mode(), ScrubMode::Follow);
    }

    #[test]
    fn test_scrub_clamps_at_track_ends() {
        let mut jog = JogView::new(1.0);
        jog.turn_to(0.0);
        jog.turn_to(-1.0);
        assert_eq!(jog.relative_position(), 0.0);
        assert_eq!(jog.playhead_degrees(), 0.0);
    }
}
