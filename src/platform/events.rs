//! External event source shared between producers and the platform.
//!
//! Input drivers, signal handlers or test code post event IDs here; the
//! platform hands them to the runtime one per tick through `peek_event`.

use crate::platform::EventId;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Thread-safe FIFO of external event IDs.
///
/// Cloning yields another handle to the same queue, so producers on other
/// threads can post while the platform pops from the driving thread.
#[derive(Clone, Default)]
pub struct EventQueue {
    queue: Arc<Mutex<VecDeque<EventId>>>,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an event for a later `peek_event`.
    pub fn post(&self, id: EventId) {
        self.queue.lock().push_back(id);
    }

    /// Dequeues the oldest event.
    pub fn pop(&self) -> Option<EventId> {
        self.queue.lock().pop_front()
    }

    /// Number of events not yet taken by the runtime.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Checks if no event is pending.
    ///
    /// # Returns
    /// true if the queue is empty, false otherwise
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drops every pending event.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }
}
