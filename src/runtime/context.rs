//! Runtime access from inside callbacks.
//!
//! Every callback receives a [`Context`] that borrows the parts of the runtime
//! it may touch: the handler stack (for bookings and handler timers), the
//! global timers, the mailbox and the platform clock. Because the runtime is
//! mutably borrowed for the duration of a callback, a callback cannot re-enter
//! `resume_and_yield` or `cleanup`.
//!
//! Stack mutations made here are only *booked*. They take effect after the
//! current callback returns, when the runtime applies them.
//!
//! # Example
//!
//! ```ignore
//! impl EventHandler for Title {
//!     fn on_init(&mut self, cx: &mut Context<'_>) {
//!         cx.set_timer(0, 500, true).ok();
//!     }
//!
//!     fn on_timer(&mut self, cx: &mut Context<'_>, _id: TimerId) {
//!         cx.push(HandlerDescriptor::new(Game::default()).with_tag(GAME)).ok();
//!     }
//! }
//! ```

use crate::error::Result;
use crate::handler::{HandlerDescriptor, Tag};
use crate::message::Message;
use crate::platform::{Platform, Tick};
use crate::runtime::queue::Mailbox;
use crate::runtime::stack::{HandlerStack, PopSelector};
use crate::timer::{GlobalTimers, TimerHandler, TimerId};

/// Handle to the runtime passed to every callback.
pub struct Context<'a> {
    stack: &'a mut HandlerStack,
    timers: &'a mut GlobalTimers,
    mailbox: &'a Mailbox,
    platform: &'a dyn Platform,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        stack: &'a mut HandlerStack,
        timers: &'a mut GlobalTimers,
        mailbox: &'a Mailbox,
        platform: &'a dyn Platform,
    ) -> Self {
        Self {
            stack,
            timers,
            mailbox,
            platform,
        }
    }

    /// Books a push of `handler` on top of the stack.
    ///
    /// # Errors
    /// - `Status` if another mutation is already booked
    /// - `Parameter` if the tag is negative
    /// - `Resource` if every handler cell is in use
    pub fn push(&mut self, handler: impl Into<HandlerDescriptor>) -> Result<()> {
        self.stack.book_push(handler.into())
    }

    /// Books removal of the top handler.
    ///
    /// Fails with `Failure` when only the root is left.
    pub fn pop(&mut self) -> Result<()> {
        self.stack.book_pop(PopSelector::Top)
    }

    /// Books removal of handlers until the top carries `tag`.
    ///
    /// The current top is always removed. When no handler below it carries
    /// `tag`, every handler above the root is removed.
    pub fn pop_by_tag(&mut self, tag: Tag) -> Result<()> {
        self.stack.book_pop(PopSelector::ByTag(tag))
    }

    /// Books removal of every handler above the root.
    pub fn pop_all(&mut self) -> Result<()> {
        self.stack.book_pop(PopSelector::All)
    }

    /// Books a pop described by `selector`.
    pub fn pop_with(&mut self, selector: PopSelector) -> Result<()> {
        self.stack.book_pop(selector)
    }

    /// Starts timer `id` of the top handler.
    ///
    /// Fails with `Status` if that timer is already running.
    pub fn set_timer(&mut self, id: TimerId, timeout: Tick, repeat: bool) -> Result<()> {
        let now = self.platform.tick();
        self.stack.set_timer(id, now, timeout, repeat)
    }

    /// Stops timer `id` of the top handler. Stopping an idle timer is fine.
    pub fn kill_timer(&mut self, id: TimerId) -> Result<()> {
        self.stack.kill_timer(id)
    }

    /// Starts global timer `id` with its own handler.
    pub fn set_global_timer(
        &mut self,
        id: TimerId,
        timeout: Tick,
        repeat: bool,
        handler: TimerHandler,
    ) -> Result<()> {
        let now = self.platform.tick();
        self.timers.set(id, now, timeout, repeat, handler)
    }

    /// Stops global timer `id`, releasing its handler if it was running.
    pub fn kill_global_timer(&mut self, id: TimerId) -> Result<()> {
        self.timers.kill(id)
    }

    /// Queues a message for the current drain or the next tick.
    pub fn post(&self, message: Message) -> Result<()> {
        self.mailbox.post(message)
    }

    /// A handle that can be moved to other threads.
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Current platform tick.
    pub fn now(&self) -> Tick {
        self.platform.tick()
    }

    /// Tag of the handler currently receiving callbacks.
    pub fn top_tag(&self) -> Option<Tag> {
        self.stack.top_tag()
    }

    /// Whether a booked mutation is waiting to be applied.
    pub fn is_pending(&self) -> bool {
        self.stack.pending().is_some()
    }
}
