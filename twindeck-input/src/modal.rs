//! Modal state machine turning key presses into commands

use crate::commands::{parse_command_line, Command, CommandParseError, DeckId, EngineCommand, Mode};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Crossfader movement per arrow key press
pub const CROSSFADE_STEP: f32 = 0.1;
/// Volume change per `+`/`-` press
pub const VOLUME_STEP: f32 = 0.05;
/// Speed ratio change per `[`/`]` press
pub const SPEED_STEP: f64 = 0.01;

/// Shifted digits 1-6 on a US layout, used to delete cue slots
const SHIFTED_DIGITS: [char; 6] = ['!', '@', '#', '$', '%', '^'];

/// Handles keyboard input and converts to commands
pub struct InputHandler {
    mode: Mode,
    command_buffer: String,
    /// Deck that transport, volume, speed and cue keys act on
    focused_deck: DeckId,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            command_buffer: String::new(),
            focused_deck: DeckId::A,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn focused_deck(&self) -> DeckId {
        self.focused_deck
    }

    pub fn set_focused_deck(&mut self, deck: DeckId) {
        self.focused_deck = deck;
    }

    /// Current command buffer (for display)
    pub fn command_buffer(&self) -> &str {
        &self.command_buffer
    }

    /// Handle a key event
    ///
    /// `Ok(None)` means the key was consumed (or ignored) without producing a
    /// command. A malformed command line is returned as an error and the
    /// handler goes back to normal mode.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<Option<Command>, CommandParseError> {
        if key.kind == KeyEventKind::Release {
            return Ok(None);
        }
        match self.mode {
            Mode::Normal => Ok(self.handle_normal_mode(key)),
            Mode::Command => self.handle_command_mode(key),
        }
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) -> Option<Command> {
        let deck = self.focused_deck;
        let engine = |cmd: EngineCommand| Some(Command::Engine(cmd));

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Esc => Some(Command::Cancel),

            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_buffer.clear();
                Some(Command::EnterCommandMode)
            }
            KeyCode::Tab => {
                self.focused_deck = deck.other();
                Some(Command::CycleFocus(self.focused_deck))
            }

            KeyCode::Char(' ') => engine(EngineCommand::Toggle(deck)),

            // Hot cues: 1-6 capture/recall, Shift+1-6 delete
            KeyCode::Char(c @ '1'..='6') => {
                engine(EngineCommand::CaptureOrRecallCue(deck, (c as u8 - b'1') as usize))
            }
            KeyCode::Char(c) if SHIFTED_DIGITS.contains(&c) => {
                let slot = SHIFTED_DIGITS.iter().position(|&s| s == c)?;
                engine(EngineCommand::DeleteCue(deck, slot))
            }

            KeyCode::Left => engine(EngineCommand::MoveCrossfade(-CROSSFADE_STEP)),
            KeyCode::Right => engine(EngineCommand::MoveCrossfade(CROSSFADE_STEP)),

            KeyCode::Char('+') | KeyCode::Char('=') => {
                engine(EngineCommand::AdjustVolume(deck, VOLUME_STEP))
            }
            KeyCode::Char('-') => engine(EngineCommand::AdjustVolume(deck, -VOLUME_STEP)),

            KeyCode::Char('[') => engine(EngineCommand::AdjustSpeed(deck, -SPEED_STEP)),
            KeyCode::Char(']') => engine(EngineCommand::AdjustSpeed(deck, SPEED_STEP)),

            _ => None,
        }
    }

    fn handle_command_mode(&mut self, key: KeyEvent) -> Result<Option<Command>, CommandParseError> {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let line = std::mem::take(&mut self.command_buffer);
                parse_command_line(&line).map(Some)
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.command_buffer.clear();
                Ok(Some(Command::EnterNormalMode))
            }
            KeyCode::Backspace => {
                if self.command_buffer.pop().is_none() {
                    self.mode = Mode::Normal;
                    return Ok(Some(Command::EnterNormalMode));
                }
                Ok(None)
            }
            KeyCode::Char(c) => {
                self.command_buffer.push(c);
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}
