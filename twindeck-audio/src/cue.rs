//! Hot cue marks, keyed by slot

use crate::deck::DeckId;
use crate::error::CueError;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Default number of cue slots per deck
pub const DEFAULT_CUE_SLOTS: usize = 6;

/// A saved, recallable playback position
#[derive(Debug, Clone, PartialEq)]
pub struct CueMark {
    pub slot: usize,
    pub deck: DeckId,
    /// Position within the track, 0.0 - 1.0
    pub relative_position: f64,
    /// Colour tag, 0.0 - 1.0
    pub hue: f32,
    /// Display label; owned by the view layer
    pub label: String,
}

/// What `capture_or_recall` did
#[derive(Debug, Clone, PartialEq)]
pub enum CueAction {
    /// The slot was empty and now holds a new mark
    Captured(CueMark),
    /// The slot already had a mark; seek to this relative position
    Recalled(f64),
}

/// Cue marks for one deck
///
/// At most one mark per slot. The set never looks at the render path; the
/// deck passes in its current position.
pub struct CueSet {
    deck: DeckId,
    slots: Vec<Option<CueMark>>,
    rng: SmallRng,
}

impl CueSet {
    pub fn new(deck: DeckId, slots: usize) -> Self {
        Self::with_rng(deck, slots, SmallRng::from_os_rng())
    }

    /// Deterministic hues, for tests
    pub fn with_seed(deck: DeckId, slots: usize, seed: u64) -> Self {
        Self::with_rng(deck, slots, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(deck: DeckId, slots: usize, rng: SmallRng) -> Self {
        Self {
            deck,
            slots: vec![None; slots],
            rng,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn check_slot(&self, slot: usize) -> Result<(), CueError> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            Err(CueError::InvalidSlot(slot))
        }
    }

    /// Recall the slot's mark if it has one, otherwise record `current`
    ///
    /// `current` is `None` when no track is loaded; recall still works then.
    pub fn capture_or_recall(
        &mut self,
        slot: usize,
        current: Option<f64>,
    ) -> Result<CueAction, CueError> {
        self.check_slot(slot)?;
        if let Some(mark) = &self.slots[slot] {
            return Ok(CueAction::Recalled(mark.relative_position));
        }

        let position = current.ok_or(CueError::NotLoaded)?;
        let mark = CueMark {
            slot,
            deck: self.deck,
            relative_position: position.clamp(0.0, 1.0),
            hue: self.rng.random::<f32>(),
            label: format!("CUE {}", slot + 1),
        };
        self.slots[slot] = Some(mark.clone());
        Ok(CueAction::Captured(mark))
    }

    pub fn get(&self, slot: usize) -> Option<&CueMark> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Remove one mark, returning it
    pub fn delete(&mut self, slot: usize) -> Result<Option<CueMark>, CueError> {
        self.check_slot(slot)?;
        Ok(self.slots[slot].take())
    }

    pub fn set_label(&mut self, slot: usize, label: impl Into<String>) -> Result<(), CueError> {
        self.check_slot(slot)?;
        if let Some(mark) = &mut self.slots[slot] {
            mark.label = label.into();
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CueMark> {
        self.slots.iter().flatten()
    }

    /// Owned copy of every mark, in slot order
    pub fn marks(&self) -> Vec<CueMark> {
        self.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues() -> CueSet {
        CueSet::with_seed(DeckId::A, DEFAULT_CUE_SLOTS, 7)
    }

    #[test]
    fn test_capture_then_recall() {
        let mut set = cues();
        let mark = match set.capture_or_recall(0, Some(0.25)).unwrap() {
            CueAction::Captured(mark) => mark,
            other => panic!("expected capture, got {other:?}"),
        };
        assert_eq!(mark.relative_position, 0.25);
        assert_eq!(mark.deck, DeckId::A);
        assert_eq!(mark.label, "CUE 1");
        assert!((0.0..1.0).contains(&mark.hue));

        // second press recalls even though the deck has moved on
        assert_eq!(
            set.capture_or_recall(0, Some(0.9)).unwrap(),
            CueAction::Recalled(0.25)
        );
        assert_eq!(set.iter().count(), 1);
    }

    #[test]
    fn test_capture_needs_track() {
        let mut set = cues();
        assert_eq!(set.capture_or_recall(2, None), Err(CueError::NotLoaded));
        assert!(set.is_empty());
    }

    #[test]
    fn test_recall_does_not_need_position() {
        let mut set = cues();
        set.capture_or_recall(1, Some(0.5)).unwrap();
        assert_eq!(set.capture_or_recall(1, None), Ok(CueAction::Recalled(0.5)));
    }

    #[test]
    fn test_invalid_slot() {
        let mut set = cues();
        assert_eq!(
            set.capture_or_recall(6, Some(0.1)),
            Err(CueError::InvalidSlot(6))
        );
        assert_eq!(set.delete(10), Err(CueError::InvalidSlot(10)));
    }

    #[test]
    fn test_delete_and_clear() {
        let mut set = cues();
        set.capture_or_recall(0, Some(0.1)).unwrap();
        set.capture_or_recall(3, Some(0.4)).unwrap();

        let removed = set.delete(0).unwrap();
        assert_eq!(removed.map(|m| m.relative_position), Some(0.1));
        assert!(set.get(0).is_none());
        assert_eq!(set.marks().len(), 1);

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_seeded_hues_are_reproducible() {
        let mut a = cues();
        let mut b = cues();
        a.capture_or_recall(0, Some(0.0)).unwrap();
        b.capture_or_recall(0, Some(0.0)).unwrap();
        assert_eq!(a.get(0).map(|m| m.hue), b.get(0).map(|m| m.hue));
    }

    #[test]
    fn test_set_label() {
        let mut set = cues();
        set.capture_or_recall(4, Some(0.6)).unwrap();
        set.set_label(4, "drop").unwrap();
        assert_eq!(set.get(4).map(|m| m.label.as_str()), Some("drop"));
    }
}
