//! Lock-free command and event handoff between the control and audio threads
//!
//! Both directions are single-producer single-consumer rings of small `Copy`
//! records. Neither side ever blocks: the control thread gets the command back
//! when the ring is full, the audio thread drains whatever is queued at the
//! start of each block.

use crate::command::Command;
use crate::event::{EventSink, EventStream};
use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned to the control thread
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    #[error("command queue is full, '{}' was not delivered", .0.name())]
    Full(Command),
}

/// Control side of the command ring
pub struct CommandSender {
    tx: HeapProd<Command>,
}

impl CommandSender {
    /// Queue a command without blocking
    pub fn send(&mut self, command: Command) -> Result<(), MailboxError> {
        self.tx.try_push(command).map_err(MailboxError::Full)
    }

    /// Free slots left in the ring
    pub fn capacity_left(&self) -> usize {
        self.tx.vacant_len()
    }
}

/// Audio side of the command ring
pub struct CommandInbox {
    rx: HeapCons<Command>,
}

impl CommandInbox {
    /// Next queued command in arrival order
    #[inline]
    pub fn next(&mut self) -> Option<Command> {
        self.rx.try_pop()
    }
}

/// Create the command ring
pub fn command_channel(capacity: usize) -> (CommandSender, CommandInbox) {
    let (tx, rx) = HeapRb::<Command>::new(capacity.max(1)).split();
    (CommandSender { tx }, CommandInbox { rx })
}

/// Create the event ring
pub fn event_channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = HeapRb::new(capacity.max(1)).split();
    let dropped = Arc::new(AtomicUsize::new(0));
    (
        EventSink::new(tx, dropped.clone()),
        EventStream::new(rx, dropped),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (mut tx, mut rx) = command_channel(4);
        tx.send(Command::Play(1)).unwrap();
        tx.send(Command::Stop).unwrap();
        assert_eq!(rx.next(), Some(Command::Play(1)));
        assert_eq!(rx.next(), Some(Command::Stop));
        assert_eq!(rx.next(), None);
    }

    #[test]
    fn test_full_ring_returns_command() {
        let (mut tx, _rx) = command_channel(1);
        tx.send(Command::Pause).unwrap();
        assert_eq!(tx.capacity_left(), 0);
        assert_eq!(
            tx.send(Command::PlayReference),
            Err(MailboxError::Full(Command::PlayReference))
        );
    }
}
