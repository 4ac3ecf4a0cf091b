//! The runtime: lifecycle, the per-tick loop and deferred stack updates.
//!
//! A runtime moves through three phases:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --prepare--> Prepared
//!       ^                            |  ^                    |
//!       +---------finalize-----------+  +------cleanup-------+
//! ```
//!
//! While prepared, the application calls [`Runtime::resume_and_yield`] from
//! its main loop. Each call does, in order:
//!
//! 1. apply any mutation booked since the last tick
//! 2. dispatch at most one external event to the top handler
//! 3. fire due timers of the top handler
//! 4. fire due global timers
//! 5. deliver every message queued so far
//!
//! After every single callback the booked stack mutation, if any, is applied
//! before the next callback runs.

use crate::builder::Config;
use crate::error::{Error, Result};
use crate::handler::{EventHandler, HandlerDescriptor, Tag, valid_tag};
use crate::message::Message;
use crate::platform::{Platform, SystemPlatform, Tick};
use crate::runtime::context::Context;
use crate::runtime::queue::Mailbox;
use crate::runtime::stack::{HandlerStack, Pending, PopSelector};
use crate::timer::{GlobalTimers, TimerHandler, TimerId};
use crate::utils::pool::CellId;

/// Lifecycle phase of a [`Runtime`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Prepared,
}

/// Cooperative single-threaded runtime driving a stack of event handlers.
///
/// Everything except [`Mailbox::post`] must be called from the thread that
/// drives the loop.
///
/// # Example
/// ```ignore
/// let mut rt = Runtime::new();
/// rt.initialize()?;
/// rt.prepare(HandlerDescriptor::new(Root))?;
/// while running {
///     rt.resume_and_yield()?;
/// }
/// rt.cleanup()?;
/// rt.finalize();
/// ```
pub struct Runtime {
    phase: Phase,
    platform: Box<dyn Platform>,
    stack: HandlerStack,
    timers: GlobalTimers,
    mailbox: Mailbox,
}

impl Runtime {
    /// Creates a runtime on the system platform with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default(), Box::new(SystemPlatform::new()))
    }

    pub(crate) fn with_config(config: Config, platform: Box<dyn Platform>) -> Self {
        Self {
            phase: Phase::Uninitialized,
            platform,
            stack: HandlerStack::new(config.handler_capacity, config.timers_per_handler),
            timers: GlobalTimers::new(config.global_timers),
            mailbox: Mailbox::new(config.message_capacity),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Readies the platform layer.
    ///
    /// # Errors
    /// `Status` if already initialized; platform failures are passed through.
    pub fn initialize(&mut self) -> Result<()> {
        if self.phase != Phase::Uninitialized {
            return Err(Error::Status("runtime is already initialized"));
        }

        self.platform.initialize()?;
        self.phase = Phase::Initialized;

        log::debug!("runtime initialized");
        Ok(())
    }

    /// Shuts the runtime down, running [`cleanup`](Self::cleanup) first if
    /// needed. Calling it on an uninitialized runtime does nothing.
    pub fn finalize(&mut self) {
        if self.phase == Phase::Uninitialized {
            return;
        }

        if self.phase == Phase::Prepared {
            let _ = self.cleanup();
        }

        self.platform.finalize();
        self.phase = Phase::Uninitialized;

        log::debug!("runtime finalized");
    }

    /// Installs `root` as the bottom of the handler stack and opens the
    /// timers and mailbox. Runs the root's `on_init` and `on_appear`.
    ///
    /// # Errors
    /// - `Status` unless the runtime is initialized and not yet prepared
    /// - `Parameter` if the root tag is negative
    /// - `Resource` if the handler pool has no capacity
    pub fn prepare(&mut self, root: impl Into<HandlerDescriptor>) -> Result<()> {
        let root = root.into();

        match self.phase {
            Phase::Uninitialized => return Err(Error::Status("runtime is not initialized")),
            Phase::Prepared => return Err(Error::Status("runtime is already prepared")),
            Phase::Initialized => {}
        }

        self.platform.prepare()?;

        let root = match self.stack.push_root(root) {
            Ok(root) => root,
            Err(err) => {
                self.platform.cleanup();
                return Err(err);
            }
        };

        self.timers.open();
        self.mailbox.open();
        self.phase = Phase::Prepared;

        log::debug!("runtime prepared");

        self.invoke(root, |handler, cx| {
            handler.on_init(cx);
            handler.on_appear(cx);
        });

        Ok(())
    }

    /// Runs one iteration of the main loop.
    ///
    /// Fails with `Status` unless the runtime is prepared.
    pub fn resume_and_yield(&mut self) -> Result<()> {
        self.ensure_prepared()?;

        self.apply();
        self.dispatch_event();
        self.sweep_handler_timers();
        self.sweep_global_timers();
        self.drain_mailbox();

        Ok(())
    }

    /// Delivers remaining messages, stops global timers and tears down the
    /// whole handler stack, root included.
    ///
    /// Fails with `Status` unless the runtime is prepared.
    pub fn cleanup(&mut self) -> Result<()> {
        self.ensure_prepared()?;

        self.drain_mailbox();

        let leftovers = self.mailbox.close();
        if !leftovers.is_empty() {
            log::warn!("discarding {} undelivered message(s)", leftovers.len());
        }
        leftovers.into_iter().for_each(Message::discard);

        self.timers.close();
        self.tear_down_stack();
        self.platform.cleanup();
        self.phase = Phase::Initialized;

        log::debug!("runtime cleaned up");
        Ok(())
    }

    /// Books a push of `handler` from outside a callback.
    ///
    /// The push is applied at the start of the next [`resume_and_yield`](Self::resume_and_yield).
    ///
    /// # Arguments
    /// * `handler` - The handler to push, or a [`HandlerDescriptor`] carrying a tag
    ///
    /// # Errors
    /// - `Status` unless prepared, or if a mutation is already booked
    /// - `Parameter` if the tag is negative
    /// - `Resource` if every handler cell is in use
    ///
    /// # Example
    /// ```ignore
    /// rt.push(HandlerDescriptor::new(Menu).with_tag(MENU))?;
    /// rt.resume_and_yield()?;
    /// ```
    pub fn push(&mut self, handler: impl Into<HandlerDescriptor>) -> Result<()> {
        self.ensure_prepared()?;
        self.context().push(handler)
    }

    /// Books removal of the top handler.
    ///
    /// Fails with `Failure` when only the root is left.
    pub fn pop(&mut self) -> Result<()> {
        self.pop_with(PopSelector::Top)
    }

    /// Books removal of handlers until the top carries `tag`.
    ///
    /// The current top is always removed. When no handler below it carries
    /// `tag`, everything above the root is removed.
    ///
    /// # Arguments
    /// * `tag` - A positive application tag; anything else is a `Parameter` error
    pub fn pop_by_tag(&mut self, tag: Tag) -> Result<()> {
        self.pop_with(PopSelector::ByTag(tag))
    }

    /// Books removal of every handler above the root.
    pub fn pop_all(&mut self) -> Result<()> {
        self.pop_with(PopSelector::All)
    }

    /// Books a pop described by `selector`.
    pub fn pop_with(&mut self, selector: PopSelector) -> Result<()> {
        if let PopSelector::ByTag(tag) = selector {
            if !valid_tag(tag) {
                return Err(Error::Parameter("pop tag must be positive"));
            }
        }

        self.ensure_prepared()?;
        self.context().pop_with(selector)
    }

    /// Starts timer `id` of the top handler.
    ///
    /// # Arguments
    /// * `id` - Slot index, below the configured timers per handler
    /// * `timeout` - Period in ticks; must not be negative
    /// * `repeat` - Re-arm after every expiry instead of stopping
    ///
    /// # Errors
    /// `Status` if the timer is already running, `Parameter` for a bad id or timeout.
    pub fn set_timer(&mut self, id: TimerId, timeout: Tick, repeat: bool) -> Result<()> {
        self.ensure_prepared()?;
        self.context().set_timer(id, timeout, repeat)
    }

    /// Stops timer `id` of the top handler. Stopping an idle timer succeeds.
    pub fn kill_timer(&mut self, id: TimerId) -> Result<()> {
        self.ensure_prepared()?;
        self.context().kill_timer(id)
    }

    /// Starts global timer `id` with its own handler.
    ///
    /// The handler's release closure runs exactly once: after a one-shot
    /// expiry, on kill, or at cleanup.
    ///
    /// # Arguments
    /// * `id` - Slot index in the global table
    /// * `timeout` - Period in ticks; must not be negative
    /// * `repeat` - Re-arm after every expiry instead of stopping
    /// * `handler` - Callback fired on expiry
    ///
    /// # Example
    /// ```ignore
    /// rt.set_global_timer(0, 1000, true, TimerHandler::new(|cx| blink(cx)))?;
    /// ```
    pub fn set_global_timer(
        &mut self,
        id: TimerId,
        timeout: Tick,
        repeat: bool,
        handler: TimerHandler,
    ) -> Result<()> {
        self.ensure_prepared()?;
        self.context().set_global_timer(id, timeout, repeat, handler)
    }

    /// Stops global timer `id`, releasing its handler if it was running.
    pub fn kill_global_timer(&mut self, id: TimerId) -> Result<()> {
        self.ensure_prepared()?;
        self.context().kill_global_timer(id)
    }

    /// Queues a message. Other threads should use a [`Mailbox`] handle instead.
    pub fn post(&self, message: Message) -> Result<()> {
        self.mailbox.post(message)
    }

    /// A cloneable, thread-safe handle for posting messages.
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Number of handlers on the applied stack, root included.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Tag of the applied top handler, `None` outside the prepared phase.
    pub fn top_tag(&self) -> Option<Tag> {
        self.stack.top_tag()
    }

    /// Whether a booked mutation is waiting for the next apply.
    pub fn is_pending(&self) -> bool {
        self.stack.pending().is_some()
    }

    fn ensure_prepared(&self) -> Result<()> {
        match self.phase {
            Phase::Prepared => Ok(()),
            _ => Err(Error::Status("runtime is not prepared")),
        }
    }

    fn context(&mut self) -> Context<'_> {
        Context::new(
            &mut self.stack,
            &mut self.timers,
            &self.mailbox,
            self.platform.as_ref(),
        )
    }

    /// Runs `f` on the handler of `cell` with a context borrowing the runtime.
    fn invoke<F>(&mut self, cell: CellId, f: F)
    where
        F: FnOnce(&mut dyn EventHandler, &mut Context<'_>),
    {
        let Some(mut handler) = self.stack.take_handler(cell) else {
            return;
        };

        f(handler.as_mut(), &mut self.context());

        self.stack.restore_handler(cell, handler);
    }

    /// Applies the booked stack mutation, if any.
    fn apply(&mut self) {
        let (Some(top), Some(next_top)) = (self.stack.top(), self.stack.next_top()) else {
            return;
        };

        match self.stack.pending() {
            None => {}
            Some(Pending::Push) => {
                self.invoke(top, |handler, cx| handler.on_disappear(cx));
                self.stack.promote();
                self.invoke(next_top, |handler, cx| {
                    handler.on_init(cx);
                    handler.on_appear(cx);
                });

                log::debug!("push applied, depth {}", self.stack.depth());
            }
            Some(Pending::Pop) => {
                self.invoke(top, |handler, cx| handler.on_disappear(cx));

                let mut cursor = Some(top);
                while let Some(cell) = cursor {
                    if cell == next_top {
                        break;
                    }
                    cursor = self.stack.prev(cell);
                    self.destroy(cell);
                }

                self.stack.settle_pop();
                self.invoke(next_top, |handler, cx| handler.on_appear(cx));

                log::debug!("pop applied, depth {}", self.stack.depth());
            }
        }
    }

    /// Runs `on_destroy` and `release` for `cell` and frees it.
    fn destroy(&mut self, cell: CellId) {
        self.invoke(cell, |handler, cx| handler.on_destroy(cx));
        if let Some(handler) = self.stack.free(cell) {
            handler.release();
        }
    }

    fn dispatch_event(&mut self) {
        let Some(id) = self.platform.peek_event() else {
            return;
        };
        let Some(top) = self.stack.top() else {
            return;
        };

        log::trace!("dispatching event {id}");
        self.invoke(top, |handler, cx| handler.on_event(cx, id));
        self.apply();
    }

    fn sweep_handler_timers(&mut self) {
        let now = self.platform.tick();

        for index in 0..self.stack.timers_per_handler() {
            // Re-read: the previous callback may have changed the top.
            let Some(top) = self.stack.top() else {
                return;
            };
            if !self.stack.fire_timer(top, index, now) {
                continue;
            }

            log::trace!("timer {index} fired");
            self.invoke(top, |handler, cx| handler.on_timer(cx, index as TimerId));
            self.apply();
        }
    }

    fn sweep_global_timers(&mut self) {
        let now = self.platform.tick();

        for index in 0..self.timers.len() {
            let Some(mut firing) = self.timers.take_due(index, now) else {
                continue;
            };

            log::trace!("global timer {index} fired");
            firing.handler().fire(&mut self.context());
            self.timers.settle(firing);
            self.apply();
        }
    }

    fn drain_mailbox(&mut self) {
        let batch = self.mailbox.detach();
        if batch.is_empty() {
            return;
        }

        log::trace!("delivering {} message(s)", batch.len());
        for (cell, message) in batch {
            message.deliver(&mut self.context());
            self.mailbox.recycle(cell);
            self.apply();
        }
    }

    /// Destroys every handler, root included, without `on_disappear`.
    ///
    /// A booked but unapplied push is only released: it never got `on_init`.
    fn tear_down_stack(&mut self) {
        let (booked, chain) = self.stack.detach();

        if let Some(handler) = booked.and_then(|cell| self.stack.free(cell)) {
            handler.release();
        }

        for cell in chain {
            self.destroy(cell);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.finalize();
    }
}
