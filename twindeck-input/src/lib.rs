//! Input handling for twindeck - keyboard map, command lines and scrub views

mod commands;
mod modal;
mod scrub;

pub use commands::{parse_command_line, Command, CommandParseError, DeckId, EngineCommand, Mode};
pub use modal::{InputHandler, CROSSFADE_STEP, SPEED_STEP, VOLUME_STEP};
pub use scrub::{
    JogView, OverviewView, PlaybackView, ScrubMode, Transport, TransportSync, ZoomView,
    SCRUB_STEP_SECS,
};
