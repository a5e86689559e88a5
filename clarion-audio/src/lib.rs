//! Audio engine for Clarion - block-based stimulus playback
//!
//! Two players share one command/event plumbing:
//! - MultiTrackPlayer: any number of stimuli, one-block linear crossfade on switch
//! - ComparisonPlayer: reference plus conditions, raised-cosine fades and a loop region
//!
//! Both run inside the host audio callback. Commands arrive through a lock-free
//! ring and take effect at the next block; events travel back the same way.

mod block;
mod command;
mod comparison;
mod engine;
mod event;
mod loop_region;
mod mailbox;
mod multitrack;
pub mod ramp;
mod stimulus;

pub use block::{AudioBlock, BlockProcessor};
pub use command::{Command, Track};
pub use comparison::{ComparisonPlayer, FadeMode};
pub use engine::{AudioEngine, EngineConfig};
pub use event::{Event, EventSink, EventStream, Extent, Rejection};
pub use loop_region::{LoopEditError, LoopRegion};
pub use mailbox::{command_channel, event_channel, CommandInbox, CommandSender, MailboxError};
pub use multitrack::MultiTrackPlayer;
pub use stimulus::{ComparisonSet, Stimulus, StimulusError, StimulusStore};
