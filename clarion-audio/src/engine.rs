//! Engine configuration and the control-thread handle

use crate::command::Command;
use crate::event::{Event, EventSink, EventStream};
use crate::mailbox::{command_channel, event_channel, CommandInbox, CommandSender, MailboxError};

/// Frame-based parameters shared by both players
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Raised-cosine ramp length in frames (at least 2)
    pub fade_window: usize,
    /// Shortest loop the comparison player accepts, in frames
    pub minimum_loop: usize,
    /// Whether the comparison player starts with looping enabled
    pub looping: bool,
    /// Command ring size
    pub command_capacity: usize,
    /// Event ring size
    pub event_capacity: usize,
}

impl EngineConfig {
    /// Default raised-cosine ramp (~5ms)
    pub const FADE_WINDOW_SECS: f64 = 0.005;
    /// Default minimum loop (~500ms)
    pub const MINIMUM_LOOP_SECS: f64 = 0.5;
    /// Room for command bursts between two blocks
    pub const COMMAND_CAPACITY: usize = 64;
    /// A handful of events per block, with headroom for a slow reader
    pub const EVENT_CAPACITY: usize = 1024;

    /// Defaults expressed in frames for a sample rate
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        Self::from_durations(
            sample_rate,
            Self::FADE_WINDOW_SECS,
            Self::MINIMUM_LOOP_SECS,
        )
    }

    /// Convert second-based durations to frames (truncating)
    pub fn from_durations(sample_rate: u32, fade_window_secs: f64, minimum_loop_secs: f64) -> Self {
        let to_frames = |secs: f64| (sample_rate as f64 * secs.max(0.0)) as usize;
        Self {
            fade_window: to_frames(fade_window_secs).max(2),
            minimum_loop: to_frames(minimum_loop_secs),
            looping: true,
            command_capacity: Self::COMMAND_CAPACITY,
            event_capacity: Self::EVENT_CAPACITY,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_sample_rate(48000)
    }
}

/// Handle held by the control thread
pub struct AudioEngine {
    commands: CommandSender,
    events: EventStream,
}

impl AudioEngine {
    /// Create both rings. The inbox and sink go to the player on the audio thread.
    pub fn create_channels(config: &EngineConfig) -> (Self, CommandInbox, EventSink) {
        let (commands, inbox) = command_channel(config.command_capacity);
        let (sink, events) = event_channel(config.event_capacity);
        (Self { commands, events }, inbox, sink)
    }

    /// Queue a command without blocking
    pub fn send(&mut self, command: Command) -> Result<(), MailboxError> {
        self.commands.send(command)
    }

    /// Next pending event
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.try_next()
    }

    /// All pending events in emission order
    pub fn events(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain()
    }

    /// Events the audio thread had to discard
    pub fn dropped_events(&self) -> usize {
        self.events.dropped()
    }
}
