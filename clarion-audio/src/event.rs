//! Notifications sent from the block callback back to the control thread

use crate::command::{Command, Track};
use ringbuf::traits::{Consumer as _, Producer as _};
use ringbuf::{HeapCons, HeapProd};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What a `PositionUpdate` is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Total frames of the track (multi-track player)
    Total(usize),
    /// Sample rate in Hz (comparison player)
    SampleRate(u32),
}

/// Why an engine refused a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The index does not name a track of this engine
    UnknownTrack,
    /// The position lies outside the track
    PositionOutOfRange,
    /// This engine variant has no such operation
    Unsupported,
}

/// Events emitted by the engines
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    PositionUpdate {
        sample: usize,
        extent: Extent,
        track: Option<Track>,
    },
    Ended {
        track: Track,
    },
    PlayReferenceTriggered {
        condition_count: usize,
    },
    PlayConditionTriggered {
        index: usize,
        condition_count: usize,
    },
    PauseTriggered {
        condition_count: usize,
    },
    StopTriggered {
        condition_count: usize,
    },
    LoopStartChanged {
        start: usize,
        end: usize,
    },
    LoopEndChanged {
        start: usize,
        end: usize,
    },
    LoopChanged {
        start: usize,
        end: usize,
    },
    Duration {
        track: Option<Track>,
        frames: usize,
    },
    CommandRejected {
        command: Command,
        reason: Rejection,
    },
}

/// Real-time side of the event channel.
///
/// Fire-and-forget: a full ring drops the event and bumps a counter the
/// control side can read.
pub struct EventSink {
    tx: HeapProd<Event>,
    dropped: Arc<AtomicUsize>,
}

impl EventSink {
    pub(crate) fn new(tx: HeapProd<Event>, dropped: Arc<AtomicUsize>) -> Self {
        Self { tx, dropped }
    }

    #[inline]
    pub fn emit(&mut self, event: Event) {
        if self.tx.try_push(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Control side of the event channel
pub struct EventStream {
    rx: HeapCons<Event>,
    dropped: Arc<AtomicUsize>,
}

impl EventStream {
    pub(crate) fn new(rx: HeapCons<Event>, dropped: Arc<AtomicUsize>) -> Self {
        Self { rx, dropped }
    }

    /// Next pending event, if any
    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_pop()
    }

    /// Take every pending event in emission order
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        std::iter::from_fn(move || self.rx.try_pop())
    }

    /// Events discarded because the ring was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::event_channel;

    #[test]
    fn test_events_preserve_order() {
        let (mut sink, mut stream) = event_channel(8);
        sink.emit(Event::PauseTriggered { condition_count: 3 });
        sink.emit(Event::StopTriggered { condition_count: 3 });
        let events: Vec<_> = stream.drain().collect();
        assert_eq!(
            events,
            vec![
                Event::PauseTriggered { condition_count: 3 },
                Event::StopTriggered { condition_count: 3 },
            ]
        );
        assert!(stream.try_next().is_none());
    }

    #[test]
    fn test_full_ring_counts_drops() {
        let (mut sink, mut stream) = event_channel(2);
        for _ in 0..5 {
            sink.emit(Event::Ended {
                track: Track::Stimulus(0),
            });
        }
        assert_eq!(stream.dropped(), 3);
        assert_eq!(stream.drain().count(), 2);
    }
}
