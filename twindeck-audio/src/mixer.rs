//! Crossfader - blends the two decks' output gains

use crate::deck::CrossfadeGainHandle;
use crate::error::ParamError;

/// Gains for deck A and deck B at crossfader position `x`
///
/// Only the receding deck attenuates; the approaching deck stays at unity.
/// -1.0 silences B, 0.0 leaves both at full gain, 1.0 silences A.
pub fn crossfade_gains(x: f32) -> (f32, f32) {
    if x > 0.0 {
        (1.0 - x, 1.0)
    } else if x < 0.0 {
        (1.0, 1.0 + x)
    } else {
        (1.0, 1.0)
    }
}

/// Owns the crossfader position and the only write access to each deck's
/// crossfade gain
pub struct CrossfadeMixer {
    position: f32,
    deck_a: CrossfadeGainHandle,
    deck_b: CrossfadeGainHandle,
}

impl CrossfadeMixer {
    pub fn new(deck_a: CrossfadeGainHandle, deck_b: CrossfadeGainHandle) -> Self {
        let mixer = Self {
            position: 0.0,
            deck_a,
            deck_b,
        };
        mixer.apply();
        mixer
    }

    /// Set crossfader position (-1.0 to 1.0); anything else is rejected
    pub fn set_crossfade(&mut self, x: f32) -> Result<(), ParamError> {
        if !x.is_finite() || !(-1.0..=1.0).contains(&x) {
            let err = ParamError::out_of_range("crossfade", x);
            tracing::debug!("Mixer: {}", err);
            return Err(err);
        }
        self.position = x;
        self.apply();
        Ok(())
    }

    /// Move crossfader by delta, stopping at the ends
    pub fn move_crossfade(&mut self, delta: f32) -> Result<(), ParamError> {
        if !delta.is_finite() {
            return Err(ParamError::out_of_range("crossfade delta", delta));
        }
        self.set_crossfade((self.position + delta).clamp(-1.0, 1.0))
    }

    pub fn crossfade(&self) -> f32 {
        self.position
    }

    /// Current (A, B) gain pair
    pub fn gains(&self) -> (f32, f32) {
        (self.deck_a.load(), self.deck_b.load())
    }

    fn apply(&self) {
        let (a, b) = crossfade_gains(self.position);
        self.deck_a.store(a);
        self.deck_b.store(b);
    }
}
