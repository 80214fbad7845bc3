//! In-process transport.
//!
//! [`MemoryTransport`] keeps one bounded inbound queue and one outbound log
//! per channel. Clones share the same queues, so a test can keep a handle,
//! hand another to the kernel, inject requests and inspect what came out.
//!
//! Single-threaded: a blocking receive on an empty queue can never be
//! satisfied and reports the channel as disconnected.

use crate::error::{KernelError, TransportError};
use crate::transport::{Channel, RecvMode, Transport};
use core_types::Identity;
use ipc::{Frames, Message, Session};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

/// Default per-channel capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Bounded FIFO queue of frame lists.
#[derive(Debug, Clone)]
pub struct FrameQueue {
    capacity: usize,
    frames: VecDeque<Frames>,
}

impl FrameQueue {
    /// Creates a queue with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            frames: VecDeque::new(),
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of queued frame lists.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pushes a frame list, refusing it when the queue is full.
    pub fn push(&mut self, frames: Frames) -> Result<(), Frames> {
        if self.frames.len() >= self.capacity {
            return Err(frames);
        }
        self.frames.push_back(frames);
        Ok(())
    }

    /// Pops the oldest frame list.
    pub fn pop(&mut self) -> Option<Frames> {
        self.frames.pop_front()
    }
}

#[derive(Debug)]
struct MemoryState {
    capacity: usize,
    inbound: BTreeMap<Channel, FrameQueue>,
    outbound: BTreeMap<Channel, Vec<Frames>>,
}

/// Shared in-memory transport
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryTransport {
    /// Creates a transport with the default queue capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a transport whose inbound queues hold at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(MemoryState {
                capacity,
                inbound: BTreeMap::new(),
                outbound: BTreeMap::new(),
            })),
        }
    }

    /// Queues frames as if a peer had sent them on `channel`
    pub fn push_inbound(&self, channel: Channel, frames: Frames) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        let capacity = state.capacity;
        state
            .inbound
            .entry(channel)
            .or_insert_with(|| FrameQueue::with_capacity(capacity))
            .push(frames)
            .map_err(|_| TransportError::QueueFull(channel))
    }

    /// Serializes a message and queues it inbound
    pub fn inject(
        &self,
        session: &Session,
        channel: Channel,
        message: &Message,
        identities: &[Identity],
    ) -> Result<(), KernelError> {
        let frames = session.serialize(message, identities)?;
        self.push_inbound(channel, frames)?;
        Ok(())
    }

    /// Returns the number of inbound frame lists not yet received
    pub fn pending_inbound(&self, channel: Channel) -> usize {
        self.state
            .borrow()
            .inbound
            .get(&channel)
            .map_or(0, FrameQueue::len)
    }

    /// Removes and returns everything sent on `channel` so far
    pub fn take_outbound(&self, channel: Channel) -> Vec<Frames> {
        self.state
            .borrow_mut()
            .outbound
            .remove(&channel)
            .unwrap_or_default()
    }

    /// Removes and decodes everything sent on `channel` so far
    pub fn take_messages(
        &self,
        session: &Session,
        channel: Channel,
    ) -> Result<Vec<(Vec<Identity>, Message)>, KernelError> {
        self.take_outbound(channel)
            .into_iter()
            .map(|frames| session.deserialize(frames).map_err(KernelError::from))
            .collect()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, channel: Channel, frames: Frames) -> Result<(), TransportError> {
        self.state
            .borrow_mut()
            .outbound
            .entry(channel)
            .or_default()
            .push(frames);
        Ok(())
    }

    fn recv(&mut self, channel: Channel, mode: RecvMode) -> Result<Option<Frames>, TransportError> {
        let next = self
            .state
            .borrow_mut()
            .inbound
            .get_mut(&channel)
            .and_then(FrameQueue::pop);

        match (next, mode) {
            (Some(frames), _) => Ok(Some(frames)),
            (None, RecvMode::NonBlocking) => Ok(None),
            (None, RecvMode::Blocking) => Err(TransportError::Disconnected(channel)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frames(tag: &str) -> Frames {
        vec![tag.as_bytes().to_vec()]
    }

    #[test]
    fn test_queue_ordering() {
        let mut queue = FrameQueue::with_capacity(4);
        queue.push(frames("a")).unwrap();
        queue.push(frames("b")).unwrap();

        assert_eq!(queue.pop(), Some(frames("a")));
        assert_eq!(queue.pop(), Some(frames("b")));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_queue_capacity() {
        let mut queue = FrameQueue::with_capacity(1);
        queue.push(frames("a")).unwrap();
        assert_eq!(queue.push(frames("b")), Err(frames("b")));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clones_share_queues() {
        let observer = MemoryTransport::new();
        let mut kernel_side = observer.clone();

        observer.push_inbound(Channel::Shell, frames("req")).unwrap();
        assert_eq!(observer.pending_inbound(Channel::Shell), 1);

        let received = kernel_side.recv(Channel::Shell, RecvMode::Blocking).unwrap();
        assert_eq!(received, Some(frames("req")));

        kernel_side.send(Channel::IoPub, frames("out")).unwrap();
        assert_eq!(observer.take_outbound(Channel::IoPub), vec![frames("out")]);
        assert!(observer.take_outbound(Channel::IoPub).is_empty());
    }

    #[test]
    fn test_empty_receive_modes() {
        let mut transport = MemoryTransport::new();
        assert!(matches!(
            transport.recv(Channel::Shell, RecvMode::NonBlocking),
            Ok(None)
        ));
        assert!(matches!(
            transport.recv(Channel::Shell, RecvMode::Blocking),
            Err(TransportError::Disconnected(Channel::Shell))
        ));
    }

    #[test]
    fn test_inbound_capacity_is_enforced() {
        let transport = MemoryTransport::with_capacity(1);
        transport.push_inbound(Channel::Stdin, frames("a")).unwrap();
        assert!(matches!(
            transport.push_inbound(Channel::Stdin, frames("b")),
            Err(TransportError::QueueFull(Channel::Stdin))
        ));
    }

    #[test]
    fn test_inject_and_take_messages() {
        let mut session = Session::new("test");
        let mut transport = MemoryTransport::new();
        let message = session.msg("execute_request", json!({"code": "1"}), None);

        transport
            .inject(&session, Channel::Shell, &message, &[Identity::from("fe")])
            .unwrap();
        let frames = transport.recv(Channel::Shell, RecvMode::NonBlocking).unwrap().unwrap();
        transport.send(Channel::Shell, frames).unwrap();

        let sent = transport.take_messages(&session, Channel::Shell).unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec![Identity::from("fe")]);
        assert_eq!(sent[0].1, message);
    }
}
