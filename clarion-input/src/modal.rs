//! Modal state machine for keyboard input

use crate::commands::{parse_command_line, Control, Layout, Mode};
use clarion_audio::Command as EngineCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handles keyboard input and converts it to controls
pub struct InputHandler {
    mode: Mode,
    layout: Layout,
    command_buffer: String,
}

impl InputHandler {
    pub fn new(layout: Layout) -> Self {
        Self {
            mode: Mode::Normal,
            layout,
            command_buffer: String::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current command buffer (for display)
    pub fn command_buffer(&self) -> &str {
        &self.command_buffer
    }

    /// Handle a key event and return a control if applicable
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Control> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Control::Quit);
        }
        match self.mode {
            Mode::Normal => self.handle_normal_mode(key),
            Mode::Command => self.handle_command_mode(key),
            Mode::Help => self.handle_help_mode(key),
        }
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) -> Option<Control> {
        match key.code {
            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_buffer.clear();
                Some(Control::EnterCommandMode)
            }
            KeyCode::Char('?') => {
                self.mode = Mode::Help;
                Some(Control::ToggleHelp)
            }

            KeyCode::Char('r') if self.layout == Layout::Comparison => {
                Some(Control::Engine(EngineCommand::PlayReference))
            }
            KeyCode::Char(digit @ '1'..='9') => {
                let index = (digit as u8 - b'1') as usize;
                Some(Control::Engine(match self.layout {
                    Layout::Generic => EngineCommand::Play(index),
                    Layout::Comparison => EngineCommand::PlayCondition(index),
                }))
            }

            KeyCode::Char(' ') => Some(Control::Engine(EngineCommand::Pause)),
            KeyCode::Char('s') => Some(Control::Engine(EngineCommand::Stop)),
            KeyCode::Char('l') if self.layout == Layout::Comparison => Some(Control::ToggleLooping),
            KeyCode::Char('p') => Some(Control::Engine(EngineCommand::GetPosition(0))),

            KeyCode::Char('q') => Some(Control::Quit),
            KeyCode::Esc => Some(Control::Cancel),

            _ => None,
        }
    }

    fn handle_command_mode(&mut self, key: KeyEvent) -> Option<Control> {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let line = std::mem::take(&mut self.command_buffer);
                Some(parse_command_line(&line).unwrap_or_else(Control::Invalid))
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.command_buffer.clear();
                Some(Control::EnterNormalMode)
            }
            KeyCode::Backspace => {
                self.command_buffer.pop();
                if self.command_buffer.is_empty() {
                    self.mode = Mode::Normal;
                    Some(Control::EnterNormalMode)
                } else {
                    None
                }
            }
            KeyCode::Char(c) => {
                self.command_buffer.push(c);
                None
            }
            _ => None,
        }
    }

    fn handle_help_mode(&mut self, key: KeyEvent) -> Option<Control> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
                self.mode = Mode::Normal;
                Some(Control::ToggleHelp)
            }
            _ => None,
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new(Layout::default())
    }
}
