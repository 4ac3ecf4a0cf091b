//! Messages: work posted from any thread and run by the main loop.
//!
//! A message is the only way for another thread to act on the runtime. It
//! runs during the mailbox drain with full access to a [`Context`], so it can
//! push or pop handlers and arm timers like any callback.

use crate::runtime::Context;

type MessageFn = Box<dyn FnOnce(&mut Context<'_>) + Send>;
type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A unit of work posted to the runtime's mailbox.
///
/// `func` runs on the driving thread during the mailbox drain, followed by the
/// optional release closure. Both are `Send` so messages can be built on any
/// thread.
pub struct Message {
    func: MessageFn,
    release: Option<ReleaseFn>,
}

impl Message {
    /// Creates a message from the closure to run on the driving thread.
    ///
    /// # Arguments
    /// * `func` - Called once with the runtime context during the drain
    ///
    /// # Example
    /// ```ignore
    /// mailbox.post(Message::new(|cx| {
    ///     let _ = cx.pop_all();
    /// }))?;
    /// ```
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce(&mut Context<'_>) + Send + 'static,
    {
        Self {
            func: Box::new(func),
            release: None,
        }
    }

    /// Sets the closure run after `func`, or when the message is discarded
    /// undelivered at cleanup.
    pub fn on_release<R>(mut self, release: R) -> Self
    where
        R: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub(crate) fn deliver(self, cx: &mut Context<'_>) {
        (self.func)(cx);
        if let Some(release) = self.release {
            release();
        }
    }

    pub(crate) fn discard(self) {
        if let Some(release) = self.release {
            release();
        }
    }
}
