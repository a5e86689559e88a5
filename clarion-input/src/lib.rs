//! Modal keyboard input handling for Clarion

mod commands;
mod modal;

pub use commands::{parse_command_line, Control, Layout, Mode, ParseError};
pub use modal::InputHandler;
