//! Multi-track player - independent cursors with crossfade-on-switch
//!
//! Every stimulus keeps its own cursor. One stimulus is audible at a time;
//! switching blends the outgoing and incoming stimulus linearly over one block,
//! starting fades in over one block, pause and stop fade out over one block.

use crate::block::{AudioBlock, BlockProcessor};
use crate::command::{Command, Track};
use crate::engine::{AudioEngine, EngineConfig};
use crate::event::{Event, EventSink, Extent, Rejection};
use crate::mailbox::CommandInbox;
use crate::ramp::{linear_in, linear_out};
use crate::stimulus::{Stimulus, StimulusStore};

/// One-shot transport request consumed by the next block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Start,
    Switch(usize),
    Pause,
    Stop,
}

/// Latest request of each kind since the previous block
#[derive(Debug, Default)]
struct PendingRequests {
    transport: Option<Transport>,
    /// (stimulus, frame)
    position: Option<(usize, usize)>,
}

/// Player for a page of independent stimuli
pub struct MultiTrackPlayer {
    store: StimulusStore,
    cursors: Vec<usize>,
    active: Option<usize>,
    pending: PendingRequests,
    inbox: CommandInbox,
    events: EventSink,
}

impl MultiTrackPlayer {
    pub fn new(store: StimulusStore, inbox: CommandInbox, events: EventSink) -> Self {
        let cursors = vec![0; store.len()];
        Self {
            store,
            cursors,
            active: None,
            pending: PendingRequests::default(),
            inbox,
            events,
        }
    }

    /// Build the player together with its control handle
    pub fn with_handle(store: StimulusStore, config: &EngineConfig) -> (Self, AudioEngine) {
        let (engine, inbox, events) = AudioEngine::create_channels(config);
        (Self::new(store, inbox, events), engine)
    }

    /// Currently audible stimulus
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Stored cursor of a stimulus
    pub fn cursor(&self, index: usize) -> Option<usize> {
        self.cursors.get(index).copied()
    }

    pub fn store(&self) -> &StimulusStore {
        &self.store
    }

    fn position_event(&self, index: usize, sample: usize) -> Event {
        Event::PositionUpdate {
            sample,
            extent: Extent::Total(self.store.length(index).unwrap_or(0)),
            track: Some(Track::Stimulus(index)),
        }
    }

    fn reject(&mut self, command: Command, reason: Rejection) {
        self.events.emit(Event::CommandRejected { command, reason });
    }

    /// Fold one command into the pending requests
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play(index) => {
                if index >= self.store.len() {
                    return self.reject(command, Rejection::UnknownTrack);
                }
                match self.active {
                    None => {
                        self.active = Some(index);
                        self.pending.transport = Some(Transport::Start);
                    }
                    Some(current) if current != index => {
                        self.pending.transport = Some(Transport::Switch(index));
                    }
                    // Re-playing the audible stimulus cancels a queued pause/stop
                    Some(_) => {
                        if matches!(
                            self.pending.transport,
                            Some(Transport::Pause | Transport::Stop)
                        ) {
                            self.pending.transport = None;
                        }
                    }
                }
            }
            Command::Pause => {
                if self.active.is_some() {
                    self.pending.transport = Some(Transport::Pause);
                }
            }
            Command::Stop => {
                if self.active.is_some() {
                    self.pending.transport = Some(Transport::Stop);
                }
            }
            Command::SetPosition { position, .. } => {
                let index = self.active.unwrap_or(0);
                match self.store.length(index) {
                    Some(length) if position < length => {
                        self.pending.position = Some((index, position));
                        let event = self.position_event(index, position);
                        self.events.emit(event);
                    }
                    Some(_) => self.reject(command, Rejection::PositionOutOfRange),
                    None => self.reject(command, Rejection::UnknownTrack),
                }
            }
            Command::GetPosition(index) => match self.cursors.get(index).copied() {
                Some(cursor) => {
                    let event = self.position_event(index, cursor);
                    self.events.emit(event);
                }
                None => self.reject(command, Rejection::UnknownTrack),
            },
            Command::GetDuration(index) => match self.store.length(index) {
                Some(frames) => self.events.emit(Event::Duration {
                    track: Some(Track::Stimulus(index)),
                    frames,
                }),
                None => self.reject(command, Rejection::UnknownTrack),
            },
            Command::PlayReference
            | Command::PlayCondition(_)
            | Command::SetLoopStart(_)
            | Command::SetLoopEnd(_)
            | Command::SetLoop { .. }
            | Command::SetLoopingActive(_) => self.reject(command, Rejection::Unsupported),
        }
    }

    /// Copy one stimulus into the block. Returns true if it reached its end,
    /// in which case the rest of the block is silent.
    fn render_plain(
        stimulus: &Stimulus,
        cursor: &mut usize,
        block: &mut AudioBlock<'_>,
    ) -> bool {
        let length = stimulus.frames();
        for frame in 0..block.frames() {
            let (left, right) = stimulus.frame(*cursor);
            block.write_frame(frame, left, right);
            *cursor += 1;
            if *cursor >= length {
                *cursor = 0;
                block.silence_from(frame + 1);
                return true;
            }
        }
        false
    }

    /// Linear one-block blend from `outgoing` to `incoming`. Returns which of
    /// the two reached their end. A stream that ends inside the block also
    /// fades to silence over its remaining frames.
    fn render_switch(
        outgoing: (&Stimulus, &mut usize),
        incoming: (&Stimulus, &mut usize),
        block: &mut AudioBlock<'_>,
    ) -> (bool, bool) {
        let (old, old_cursor) = outgoing;
        let (new, new_cursor) = incoming;
        let frames = block.frames();
        let old_left = old.frames() - *old_cursor;
        let new_left = new.frames() - *new_cursor;
        let mut old_ended = false;
        let mut new_ended = false;

        for frame in 0..frames {
            let w_out = linear_out(frame, frames) * tail_gain(frame, old_left, frames);
            let w_in = linear_in(frame, frames) * tail_gain(frame, new_left, frames);
            let (ol, or) = if old_ended { (0.0, 0.0) } else { old.frame(*old_cursor) };
            let (nl, nr) = if new_ended { (0.0, 0.0) } else { new.frame(*new_cursor) };
            block.write_frame(frame, ol * w_out + nl * w_in, or * w_out + nr * w_in);

            if !old_ended {
                *old_cursor += 1;
                if *old_cursor >= old.frames() {
                    *old_cursor = 0;
                    old_ended = true;
                }
            }
            if !new_ended {
                *new_cursor += 1;
                if *new_cursor >= new.frames() {
                    *new_cursor = 0;
                    new_ended = true;
                }
            }
        }
        (old_ended, new_ended)
    }

    fn render(&mut self, block: &mut AudioBlock<'_>) {
        if let Some((index, position)) = self.pending.position.take() {
            if let Some(cursor) = self.cursors.get_mut(index) {
                *cursor = position;
            }
        }
        let transport = self.pending.transport.take();

        let Some(index) = self.active else {
            block.fill_silence();
            return;
        };
        let frames = block.frames();

        let switch_to = match transport {
            Some(Transport::Switch(to)) if to != index => Some(to),
            _ => None,
        };

        let mut ended = false;
        if let Some(to) = switch_to {
            let (Some(old), Some(new)) = (self.store.get(index), self.store.get(to)) else {
                block.fill_silence();
                self.active = None;
                return;
            };
            let (old_cursor, new_cursor) = pair_mut(&mut self.cursors, index, to);
            let (old_ended, new_ended) =
                Self::render_switch((old, old_cursor), (new, new_cursor), block);
            if old_ended {
                self.events.emit(Event::Ended {
                    track: Track::Stimulus(index),
                });
            }
            if new_ended {
                self.events.emit(Event::Ended {
                    track: Track::Stimulus(to),
                });
            }

            let outgoing = self.position_event(index, self.cursors[index]);
            let incoming = self.position_event(to, self.cursors[to]);
            self.events.emit(outgoing);
            self.events.emit(incoming);
            self.active = if new_ended { None } else { Some(to) };
            return;
        }

        let Some(stimulus) = self.store.get(index) else {
            block.fill_silence();
            self.active = None;
            return;
        };
        if Self::render_plain(stimulus, &mut self.cursors[index], block) {
            ended = true;
            self.events.emit(Event::Ended {
                track: Track::Stimulus(index),
            });
        }

        // Block-level envelope; a stimulus that ran out is treated as stopped
        let fading_out = ended || matches!(transport, Some(Transport::Pause | Transport::Stop));
        if fading_out {
            for frame in 0..frames {
                block.scale_frame(frame, linear_out(frame, frames));
            }
        } else if transport == Some(Transport::Start) {
            for frame in 0..frames {
                block.scale_frame(frame, linear_in(frame, frames));
            }
        }

        if transport == Some(Transport::Stop) {
            self.cursors[index] = 0;
        }
        if fading_out {
            self.active = None;
        }
        let update = self.position_event(index, self.cursors[index]);
        self.events.emit(update);
    }
}

/// Extra fade for a stream with `left` frames remaining in a block of `frames`
#[inline]
fn tail_gain(frame: usize, left: usize, frames: usize) -> f32 {
    if left < frames {
        linear_out(frame, left)
    } else {
        1.0
    }
}

/// Two distinct mutable cursors
fn pair_mut(cursors: &mut [usize], a: usize, b: usize) -> (&mut usize, &mut usize) {
    if a < b {
        let (lo, hi) = cursors.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = cursors.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

impl BlockProcessor for MultiTrackPlayer {
    fn process(&mut self, block: &mut AudioBlock<'_>) -> bool {
        while let Some(command) = self.inbox.next() {
            self.handle_command(command);
        }
        self.render(block);
        true
    }
}
