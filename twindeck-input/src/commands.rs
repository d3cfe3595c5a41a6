//! Command definitions and the `:` command-line parser

use std::path::PathBuf;
use thiserror::Error;
pub use twindeck_audio::{DeckId, EngineCommand};

/// Input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Command,
}

impl Mode {
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Command => "COMMAND",
        }
    }
}

/// Commands that can be dispatched from input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Forwarded to the engine as is
    Engine(EngineCommand),
    /// Focus moved to this deck
    CycleFocus(DeckId),
    EnterCommandMode,
    EnterNormalMode,
    Cancel,
    Quit,
}

impl From<EngineCommand> for Command {
    fn from(cmd: EngineCommand) -> Self {
        Command::Engine(cmd)
    }
}

/// A command line that could not be understood
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{command}: missing {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("not a deck: {0} (expected a or b)")]
    InvalidDeck(String),
    #[error("not a number: {0}")]
    InvalidNumber(String),
    #[error("cue slots are numbered from 1, got {0}")]
    InvalidSlot(String),
}

/// Parse one command line (without the leading `:`)
///
/// Numbers are passed through unchecked; range checks belong to the engine.
/// Cue slots are typed 1-based and converted to slot indices here.
pub fn parse_command_line(input: &str) -> Result<Command, CommandParseError> {
    let input = input.trim();
    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };

    let cmd = match name {
        "" => return Err(CommandParseError::Empty),
        "q" | "quit" => return Ok(Command::Quit),
        "load" => {
            let (deck, path) = split_deck("load", rest)?;
            let path = unquote(path);
            if path.is_empty() {
                return Err(CommandParseError::MissingArgument {
                    command: "load",
                    what: "path",
                });
            }
            EngineCommand::Load(deck, PathBuf::from(path))
        }
        "eject" => EngineCommand::Eject(only_deck("eject", rest)?),
        "play" => EngineCommand::Start(only_deck("play", rest)?),
        "stop" => EngineCommand::Stop(only_deck("stop", rest)?),
        "toggle" => EngineCommand::Toggle(only_deck("toggle", rest)?),
        "vol" => {
            let (deck, value) = deck_and_number("vol", rest)?;
            EngineCommand::SetVolume(deck, value as f32)
        }
        "speed" => {
            let (deck, value) = deck_and_number("speed", rest)?;
            EngineCommand::SetSpeed(deck, value)
        }
        "seek" => {
            let (deck, value) = deck_and_number("seek", rest)?;
            EngineCommand::SetPositionRelative(deck, value)
        }
        "filter" => {
            let (deck, value) = deck_and_number("filter", rest)?;
            EngineCommand::SetFilterFrequency(deck, value)
        }
        "low" => {
            let (deck, value) = deck_and_number("low", rest)?;
            EngineCommand::SetLowShelfGain(deck, value)
        }
        "mid" => {
            let (deck, value) = deck_and_number("mid", rest)?;
            EngineCommand::SetMidPeakGain(deck, value)
        }
        "high" => {
            let (deck, value) = deck_and_number("high", rest)?;
            EngineCommand::SetHighShelfGain(deck, value)
        }
        "cue" => {
            let (deck, slot) = deck_and_slot("cue", rest)?;
            EngineCommand::CaptureOrRecallCue(deck, slot)
        }
        "uncue" => {
            let (deck, slot) = deck_and_slot("uncue", rest)?;
            EngineCommand::DeleteCue(deck, slot)
        }
        "label" => {
            let (deck, tail) = split_deck("label", rest)?;
            let (slot, text) = match tail.split_once(char::is_whitespace) {
                Some((slot, text)) => (slot, unquote(text.trim())),
                None => (tail, ""),
            };
            if slot.is_empty() {
                return Err(CommandParseError::MissingArgument {
                    command: "label",
                    what: "slot",
                });
            }
            let slot = parse_slot(slot)?;
            if text.is_empty() {
                return Err(CommandParseError::MissingArgument {
                    command: "label",
                    what: "text",
                });
            }
            EngineCommand::SetCueLabel(deck, slot, text.to_string())
        }
        "clear" => EngineCommand::ClearCues(only_deck("clear", rest)?),
        "xfade" => {
            if rest.is_empty() {
                return Err(CommandParseError::MissingArgument {
                    command: "xfade",
                    what: "position",
                });
            }
            EngineCommand::SetCrossfade(parse_number(rest)? as f32)
        }
        other => return Err(CommandParseError::Unknown(other.to_string())),
    };
    Ok(Command::Engine(cmd))
}

fn parse_deck(word: &str) -> Result<DeckId, CommandParseError> {
    match word {
        "a" | "A" => Ok(DeckId::A),
        "b" | "B" => Ok(DeckId::B),
        other => Err(CommandParseError::InvalidDeck(other.to_string())),
    }
}

fn split_deck<'a>(
    command: &'static str,
    rest: &'a str,
) -> Result<(DeckId, &'a str), CommandParseError> {
    let (word, tail) = match rest.split_once(char::is_whitespace) {
        Some((word, tail)) => (word, tail.trim()),
        None => (rest, ""),
    };
    if word.is_empty() {
        return Err(CommandParseError::MissingArgument {
            command,
            what: "deck",
        });
    }
    Ok((parse_deck(word)?, tail))
}

fn only_deck(command: &'static str, rest: &str) -> Result<DeckId, CommandParseError> {
    split_deck(command, rest).map(|(deck, _)| deck)
}

fn parse_number(word: &str) -> Result<f64, CommandParseError> {
    word.parse::<f64>()
        .map_err(|_| CommandParseError::InvalidNumber(word.to_string()))
}

fn deck_and_number(command: &'static str, rest: &str) -> Result<(DeckId, f64), CommandParseError> {
    let (deck, tail) = split_deck(command, rest)?;
    if tail.is_empty() {
        return Err(CommandParseError::MissingArgument {
            command,
            what: "value",
        });
    }
    Ok((deck, parse_number(tail)?))
}

fn deck_and_slot(command: &'static str, rest: &str) -> Result<(DeckId, usize), CommandParseError> {
    let (deck, tail) = split_deck(command, rest)?;
    if tail.is_empty() {
        return Err(CommandParseError::MissingArgument {
            command,
            what: "slot",
        });
    }
    Ok((deck, parse_slot(tail)?))
}

/// 1-based slot number to slot index
fn parse_slot(word: &str) -> Result<usize, CommandParseError> {
    match word.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(CommandParseError::InvalidSlot(word.to_string())),
    }
}

/// Strip one pair of matching surrounding quotes
fn unquote(path: &str) -> &str {
    let quoted = path.len() >= 2
        && ((path.starts_with('\'') && path.ends_with('\''))
            || (path.starts_with('"') && path.ends_with('"')));
    if quoted {
        &path[1..path.len() - 1]
    } else {
        path
    }
}
