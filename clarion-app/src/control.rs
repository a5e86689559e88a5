//! Control-thread state: key handling, command delivery, event display

use clarion_audio::{AudioEngine, Command, Event, Extent, MailboxError, Rejection, Track};
use clarion_input::{Control, InputHandler, Layout};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts before a command is given up when the queue stays full
const SEND_ATTEMPTS: usize = 50;
const SEND_RETRY_DELAY: Duration = Duration::from_millis(2);

/// Text shown by the help toggle
pub const HELP: &str = "\
keys: r reference | 1-9 condition/stimulus | space pause | s stop | l looping | p position | : command | q quit
commands: play N | ref | cond N | pause | stop | seek F | edit F | start F | end F | loop A B | looping on|off | pos [N] | dur [N] | quit";

/// What the terminal should show after handling input or events
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// A line of its own
    Line(String),
    /// Overwrite the status line
    Status(String),
}

pub struct Controller {
    engine: AudioEngine,
    input: InputHandler,
    labels: Vec<String>,
    looping: bool,
    quit: bool,
}

impl Controller {
    pub fn new(engine: AudioEngine, layout: Layout, labels: Vec<String>, looping: bool) -> Self {
        Self {
            engine,
            input: InputHandler::new(layout),
            labels,
            looping,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn input(&self) -> &InputHandler {
        &self.input
    }

    /// Route one key through the modal handler
    pub fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> Option<Output> {
        let control = self.input.handle_key(key)?;
        self.handle_control(control)
    }

    pub fn handle_control(&mut self, control: Control) -> Option<Output> {
        match control {
            Control::Engine(command) => {
                if let Command::SetLoopingActive(active) = command {
                    self.looping = active;
                }
                self.send(command)
            }
            Control::ToggleLooping => {
                self.looping = !self.looping;
                info!(looping = self.looping, "looping toggled");
                self.send(Command::SetLoopingActive(self.looping))
                    .or_else(|| {
                        Some(Output::Line(format!(
                            "looping {}",
                            if self.looping { "on" } else { "off" }
                        )))
                    })
            }
            Control::ToggleHelp => Some(Output::Line(HELP.to_string())),
            Control::EnterCommandMode => Some(Output::Status(":".to_string())),
            Control::EnterNormalMode | Control::Cancel => Some(Output::Status(String::new())),
            Control::Invalid(e) => {
                warn!(error = %e, "invalid command line");
                Some(Output::Line(format!("error: {}", e)))
            }
            Control::Quit => {
                self.quit = true;
                None
            }
        }
    }

    /// Deliver a command, waiting briefly for the audio thread to make room
    fn send(&mut self, command: Command) -> Option<Output> {
        let mut attempt = 0;
        loop {
            match self.engine.send(command) {
                Ok(()) => {
                    debug!(command = command.name(), "command sent");
                    return None;
                }
                Err(MailboxError::Full(_)) if attempt + 1 < SEND_ATTEMPTS => {
                    attempt += 1;
                    thread::sleep(SEND_RETRY_DELAY);
                }
                Err(e) => {
                    warn!(error = %e, "dropping command");
                    return Some(Output::Line(format!("error: {}", e)));
                }
            }
        }
    }

    /// Drain engine events into terminal output
    pub fn poll_events(&mut self) -> Vec<Output> {
        let events: Vec<Event> = self.engine.events().collect();
        let dropped = self.engine.dropped_events();
        if dropped > 0 {
            debug!(dropped, "events dropped by the audio thread");
        }
        events
            .into_iter()
            .filter_map(|event| self.describe(event))
            .collect()
    }

    fn label(&self, track: Track) -> String {
        match track {
            Track::Reference => "reference".to_string(),
            Track::Stimulus(i) | Track::Condition(i) => match self.labels.get(i) {
                Some(label) => format!("{} ({})", i + 1, label),
                None => format!("{}", i + 1),
            },
        }
    }

    /// Terminal text for an event. Position updates go to the status line.
    pub fn describe(&self, event: Event) -> Option<Output> {
        let line = match event {
            Event::PositionUpdate {
                sample,
                extent,
                track,
            } => {
                let track = track.map(|t| self.label(t)).unwrap_or_else(|| "-".to_string());
                let position = match extent {
                    Extent::Total(total) => format!("{}/{}", sample, total),
                    Extent::SampleRate(rate) => {
                        format!("{:.3}s", sample as f64 / rate.max(1) as f64)
                    }
                };
                return Some(Output::Status(format!("[{}] {}", track, position)));
            }
            Event::Ended { track } => format!("ended: {}", self.label(track)),
            Event::PlayReferenceTriggered { .. } => "playing reference".to_string(),
            Event::PlayConditionTriggered {
                index,
                condition_count,
            } => format!(
                "playing condition {} of {}",
                self.label(Track::Condition(index)),
                condition_count
            ),
            Event::PauseTriggered { .. } => "paused".to_string(),
            Event::StopTriggered { .. } => "stopped".to_string(),
            Event::LoopStartChanged { start, end }
            | Event::LoopEndChanged { start, end }
            | Event::LoopChanged { start, end } => format!("loop {}..{}", start, end),
            Event::Duration { track, frames } => match track {
                Some(track) => format!("duration of {}: {} frames", self.label(track), frames),
                None => format!("duration: {} frames", frames),
            },
            Event::CommandRejected { command, reason } => {
                let reason = match reason {
                    Rejection::UnknownTrack => "no such track",
                    Rejection::PositionOutOfRange => "position out of range",
                    Rejection::Unsupported => "not available in this session",
                };
                warn!(command = command.name(), reason, "command rejected");
                format!("rejected {}: {}", command.name(), reason)
            }
        };
        info!(event = %line, "engine event");
        Some(Output::Line(line))
    }
}
