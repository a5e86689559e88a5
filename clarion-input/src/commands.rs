//! Control actions produced by the keyboard, and the command-line grammar

use clarion_audio::Command as EngineCommand;
use thiserror::Error;

/// Input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Command,
    Help,
}

/// Which player the number keys address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Number keys play stimuli
    #[default]
    Generic,
    /// `r` plays the reference, number keys play conditions
    Comparison,
}

/// What the application should do in response to input
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Forward to the audio engine
    Engine(EngineCommand),
    /// Flip the looping flag of the comparison player
    ToggleLooping,
    ToggleHelp,
    EnterCommandMode,
    EnterNormalMode,
    /// A command line that could not be parsed
    Invalid(ParseError),
    Quit,
    Cancel,
}

/// Command-line parse failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{command}': '{value}' is not a number")]
    InvalidNumber { command: &'static str, value: String },
    #[error("'{0}': indexes start at 1")]
    ZeroIndex(&'static str),
    #[error("'looping' expects on or off, got '{0}'")]
    InvalidFlag(String),
    #[error("'{command}': unexpected '{extra}'")]
    UnexpectedArgument { command: &'static str, extra: String },
}

struct Args<'a> {
    command: &'static str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn number(&mut self) -> Result<usize, ParseError> {
        let word = self
            .words
            .next()
            .ok_or(ParseError::MissingArgument(self.command))?;
        word.parse().map_err(|_| ParseError::InvalidNumber {
            command: self.command,
            value: word.to_string(),
        })
    }

    /// 1-based index as typed, 0-based as sent
    fn index(&mut self) -> Result<usize, ParseError> {
        match self.number()? {
            0 => Err(ParseError::ZeroIndex(self.command)),
            n => Ok(n - 1),
        }
    }

    fn optional_index(&mut self) -> Result<usize, ParseError> {
        match self.words.clone().next() {
            Some(_) => self.index(),
            None => Ok(0),
        }
    }

    fn word(&mut self) -> Result<&'a str, ParseError> {
        self.words
            .next()
            .ok_or(ParseError::MissingArgument(self.command))
    }

    fn finish(mut self, control: Control) -> Result<Control, ParseError> {
        match self.words.next() {
            Some(extra) => Err(ParseError::UnexpectedArgument {
                command: self.command,
                extra: extra.to_string(),
            }),
            None => Ok(control),
        }
    }
}

/// Parse one typed command line. Indexes are 1-based, positions are frames.
pub fn parse_command_line(line: &str) -> Result<Control, ParseError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(ParseError::Empty)?;

    let command: &'static str = match name {
        "play" | "p" => "play",
        "ref" | "reference" => "ref",
        "cond" | "c" => "cond",
        "pause" => "pause",
        "stop" => "stop",
        "seek" => "seek",
        "edit" => "edit",
        "start" => "start",
        "end" => "end",
        "loop" => "loop",
        "looping" => "looping",
        "pos" => "pos",
        "dur" => "dur",
        "help" => "help",
        "quit" | "q" => "quit",
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    let mut args = Args { command, words };

    let control = match command {
        "play" => Control::Engine(EngineCommand::Play(args.index()?)),
        "ref" => Control::Engine(EngineCommand::PlayReference),
        "cond" => Control::Engine(EngineCommand::PlayCondition(args.index()?)),
        "pause" => Control::Engine(EngineCommand::Pause),
        "stop" => Control::Engine(EngineCommand::Stop),
        "seek" => Control::Engine(EngineCommand::SetPosition {
            position: args.number()?,
            loop_edit: false,
        }),
        "edit" => Control::Engine(EngineCommand::SetPosition {
            position: args.number()?,
            loop_edit: true,
        }),
        "start" => Control::Engine(EngineCommand::SetLoopStart(args.number()?)),
        "end" => Control::Engine(EngineCommand::SetLoopEnd(args.number()?)),
        "loop" => {
            let start = args.number()?;
            let end = args.number()?;
            Control::Engine(EngineCommand::SetLoop { start, end })
        }
        "looping" => match args.word()? {
            "on" | "true" => Control::Engine(EngineCommand::SetLoopingActive(true)),
            "off" | "false" => Control::Engine(EngineCommand::SetLoopingActive(false)),
            other => return Err(ParseError::InvalidFlag(other.to_string())),
        },
        "pos" => Control::Engine(EngineCommand::GetPosition(args.optional_index()?)),
        "dur" => Control::Engine(EngineCommand::GetDuration(args.optional_index()?)),
        "help" => Control::ToggleHelp,
        _ => Control::Quit,
    };
    args.finish(control)
}
