//! Cross-thread mailbox feeding messages to the driving loop.
//!
//! Messages live in a fixed pool of cells chained into a FIFO. The lock is
//! held only to link a cell on post, to detach the whole chain on drain, and
//! to return a finished cell to the pool. Message callbacks always run with
//! the lock released, so a slow callback never blocks a producer.

use crate::error::{Error, Result};
use crate::message::Message;
use crate::utils::pool::{CellId, Pool};

use parking_lot::Mutex;
use std::sync::Arc;

struct MessageCell {
    message: Option<Message>,
    next: Option<CellId>,
}

struct Inbox {
    cells: Pool<MessageCell>,
    head: Option<CellId>,
    tail: Option<CellId>,
    open: bool,
}

/// Handle to a runtime's message queue.
///
/// Cheap to clone and `Send + Sync`: hand clones to other threads and call
/// [`post`](Self::post) from there.
///
/// # Example
/// ```ignore
/// let mailbox = rt.mailbox();
/// std::thread::spawn(move || {
///     mailbox.post(Message::new(|cx| { let _ = cx.pop(); })).ok();
/// });
/// ```
#[derive(Clone)]
pub struct Mailbox {
    inbox: Arc<Mutex<Inbox>>,
}

impl Mailbox {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inbox: Arc::new(Mutex::new(Inbox {
                cells: Pool::new(capacity),
                head: None,
                tail: None,
                open: false,
            })),
        }
    }

    /// Appends a message to the queue.
    ///
    /// Fails with `Status` unless the runtime is prepared, and with `Resource`
    /// when every message cell is in use.
    pub fn post(&self, message: Message) -> Result<()> {
        let mut inbox = self.inbox.lock();
        if !inbox.open {
            return Err(Error::Status("runtime is not prepared"));
        }

        let id = inbox
            .cells
            .insert(MessageCell {
                message: Some(message),
                next: None,
            })
            .ok_or(Error::Resource("no free message cell"))?;

        let tail = inbox.tail;
        match tail {
            Some(tail) => {
                if let Some(cell) = inbox.cells.get_mut(tail) {
                    cell.next = Some(id);
                }
            }
            None => inbox.head = Some(id),
        }
        inbox.tail = Some(id);

        Ok(())
    }

    /// Number of cells in use, queued or being delivered.
    pub fn len(&self) -> usize {
        self.inbox.lock().cells.len()
    }

    /// Checks if no message is queued or being delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of message cells, fixed at build time.
    pub fn capacity(&self) -> usize {
        self.inbox.lock().cells.capacity()
    }

    pub(crate) fn open(&self) {
        self.inbox.lock().open = true;
    }

    /// Stops accepting posts and frees whatever is still queued.
    pub(crate) fn close(&self) -> Vec<Message> {
        let mut inbox = self.inbox.lock();
        inbox.open = false;

        let leftovers = Self::unlink(&mut inbox);
        leftovers
            .into_iter()
            .filter_map(|(id, message)| {
                inbox.cells.remove(id);
                message
            })
            .collect()
    }

    /// Detaches the queued chain in FIFO order.
    ///
    /// Cells stay allocated until [`recycle`](Self::recycle) so the pool
    /// accounts for messages that are being delivered.
    pub(crate) fn detach(&self) -> Vec<(CellId, Message)> {
        let mut inbox = self.inbox.lock();

        Self::unlink(&mut inbox)
            .into_iter()
            .filter_map(|(id, message)| message.map(|message| (id, message)))
            .collect()
    }

    pub(crate) fn recycle(&self, id: CellId) {
        self.inbox.lock().cells.remove(id);
    }

    fn unlink(inbox: &mut Inbox) -> Vec<(CellId, Option<Message>)> {
        let mut batch = Vec::new();
        let mut cursor = inbox.head.take();
        inbox.tail = None;

        while let Some(id) = cursor {
            let Some(cell) = inbox.cells.get_mut(id) else {
                break;
            };
            cursor = cell.next.take();
            batch.push((id, cell.message.take()));
        }

        batch
    }
}
