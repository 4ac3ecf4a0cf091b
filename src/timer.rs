//! Software timers polled by the runtime's main loop.
//!
//! Two kinds of timers share the same slot logic:
//!
//! - **Handler timers** live inside each stack entry and only tick while their
//!   owner is the top. Expiry calls the owner's `on_timer`.
//! - **Global timers** live in a fixed table owned by the runtime and carry
//!   their own [`TimerHandler`].
//!
//! Timers are polled, not interrupt driven: a slot is due once the platform
//! tick has reached its deadline (see [`tick_reached`]).

use crate::error::{Error, Result};
use crate::platform::{Tick, tick_reached};
use crate::runtime::Context;

/// Index of a timer slot, per handler or in the global table.
pub type TimerId = u32;

/// Deadline bookkeeping for one timer slot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TimerSlot {
    timeout: Tick,
    expire_at: Tick,
    expired: bool,
    repeat: bool,
}

impl TimerSlot {
    pub(crate) const IDLE: Self = Self {
        timeout: 0,
        expire_at: 0,
        expired: true,
        repeat: false,
    };

    pub(crate) fn is_active(&self) -> bool {
        !self.expired
    }

    pub(crate) fn arm(&mut self, now: Tick, timeout: Tick, repeat: bool) {
        self.timeout = timeout;
        self.expire_at = now.wrapping_add(timeout);
        self.expired = false;
        self.repeat = repeat;
    }

    pub(crate) fn stop(&mut self) {
        self.expired = true;
    }

    pub(crate) fn is_due(&self, now: Tick) -> bool {
        self.is_active() && tick_reached(now, self.expire_at)
    }

    pub(crate) fn repeats(&self) -> bool {
        self.repeat
    }

    /// Moves the deadline one period forward without drifting.
    pub(crate) fn reschedule(&mut self) {
        self.expire_at = self.expire_at.wrapping_add(self.timeout);
    }

    /// Consumes one expiry: repeating slots are rescheduled, one-shots stop.
    pub(crate) fn fire(&mut self) {
        if self.repeat {
            self.reschedule();
        } else {
            self.stop();
        }
    }
}

pub(crate) fn check_timeout(timeout: Tick) -> Result<()> {
    if timeout < 0 {
        return Err(Error::Parameter("timeout must not be negative"));
    }

    Ok(())
}

type TimerFn = Box<dyn FnMut(&mut Context<'_>)>;
type ReleaseFn = Box<dyn FnOnce()>;

/// Callback pair attached to a global timer.
///
/// `func` runs on every expiry. The release closure runs exactly once when the
/// timer's lifetime ends: one-shot expiry, kill, or cleanup.
pub struct TimerHandler {
    func: TimerFn,
    release: Option<ReleaseFn>,
}

impl TimerHandler {
    /// Creates a handler that runs `func` on every expiry.
    ///
    /// # Arguments
    /// * `func` - Called with the runtime context each time the timer fires
    ///
    /// # Example
    /// ```ignore
    /// let handler = TimerHandler::new(|cx| {
    ///     let _ = cx.post(Message::new(|_| autosave()));
    /// })
    /// .on_release(|| log::info!("autosave stopped"));
    /// ```
    pub fn new<F>(func: F) -> Self
    where
        F: FnMut(&mut Context<'_>) + 'static,
    {
        Self {
            func: Box::new(func),
            release: None,
        }
    }

    /// Sets the closure run once when the timer's lifetime ends.
    pub fn on_release<R>(mut self, release: R) -> Self
    where
        R: FnOnce() + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub(crate) fn fire(&mut self, cx: &mut Context<'_>) {
        (self.func)(cx);
    }

    pub(crate) fn release(self) {
        if let Some(release) = self.release {
            release();
        }
    }
}

struct GlobalSlot {
    timer: TimerSlot,
    // `None` while the handler is out being fired.
    handler: Option<TimerHandler>,
    // Bumped on every arm so a firing can tell whether its slot was replaced.
    generation: u64,
}

/// Proof that a handler was taken out of its slot for firing.
pub(crate) struct Firing {
    index: usize,
    generation: u64,
    handler: TimerHandler,
}

impl Firing {
    pub(crate) fn handler(&mut self) -> &mut TimerHandler {
        &mut self.handler
    }
}

/// Fixed table of global timers, independent of the handler stack.
pub(crate) struct GlobalTimers {
    slots: Vec<GlobalSlot>,
    open: bool,
}

impl GlobalTimers {
    pub(crate) fn new(count: usize) -> Self {
        let slots = (0..count)
            .map(|_| GlobalSlot {
                timer: TimerSlot::IDLE,
                handler: None,
                generation: 0,
            })
            .collect();

        Self { slots, open: false }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Resets every slot to idle and starts accepting timers.
    pub(crate) fn open(&mut self) {
        for slot in &mut self.slots {
            slot.timer = TimerSlot::IDLE;
            slot.handler = None;
        }
        self.open = true;
    }

    pub(crate) fn set(
        &mut self,
        id: TimerId,
        now: Tick,
        timeout: Tick,
        repeat: bool,
        handler: TimerHandler,
    ) -> Result<()> {
        if !self.open {
            return Err(Error::Status("global timers are not running"));
        }

        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(Error::Parameter("global timer id out of range"))?;
        check_timeout(timeout)?;

        if slot.timer.is_active() {
            return Err(Error::Status("global timer is already running"));
        }

        slot.timer.arm(now, timeout, repeat);
        slot.handler = Some(handler);
        slot.generation = slot.generation.wrapping_add(1);

        log::trace!("global timer {id} set: {timeout} ms, repeat {repeat}");
        Ok(())
    }

    pub(crate) fn kill(&mut self, id: TimerId) -> Result<()> {
        if !self.open {
            return Err(Error::Status("global timers are not running"));
        }

        let slot = self
            .slots
            .get_mut(id as usize)
            .ok_or(Error::Parameter("global timer id out of range"))?;

        if !slot.timer.is_active() {
            return Ok(());
        }

        slot.timer.stop();
        // A handler that is out being fired gets released by `settle`.
        if let Some(handler) = slot.handler.take() {
            handler.release();
        }

        log::trace!("global timer {id} killed");
        Ok(())
    }

    /// Takes the handler out of slot `index` if the slot is due at `now`.
    pub(crate) fn take_due(&mut self, index: usize, now: Tick) -> Option<Firing> {
        let slot = self.slots.get_mut(index)?;
        if !slot.timer.is_due(now) {
            return None;
        }

        let handler = slot.handler.take()?;
        Some(Firing {
            index,
            generation: slot.generation,
            handler,
        })
    }

    /// Returns a fired handler to its slot, or ends its lifetime.
    pub(crate) fn settle(&mut self, firing: Firing) {
        let Firing {
            index,
            generation,
            handler,
        } = firing;

        let slot = match self.slots.get_mut(index) {
            Some(slot) if slot.generation == generation && slot.timer.is_active() => slot,
            // Killed or re-armed from inside its own callback.
            _ => {
                handler.release();
                return;
            }
        };

        if slot.timer.repeats() {
            slot.timer.reschedule();
            slot.handler = Some(handler);
        } else {
            slot.timer.stop();
            handler.release();
        }
    }

    /// Releases every running timer and stops accepting new ones.
    pub(crate) fn close(&mut self) {
        for slot in &mut self.slots {
            if slot.timer.is_active() {
                if let Some(handler) = slot.handler.take() {
                    handler.release();
                }
            }
            slot.timer = TimerSlot::IDLE;
            slot.handler = None;
        }
        self.open = false;
    }

    #[cfg(test)]
    fn is_active(&self, id: TimerId) -> bool {
        self.slots[id as usize].timer.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counted(releases: &Rc<Cell<u32>>) -> TimerHandler {
        let releases = releases.clone();
        TimerHandler::new(|_| {}).on_release(move || releases.set(releases.get() + 1))
    }

    #[test]
    fn slot_due_and_repeat() {
        let mut slot = TimerSlot::IDLE;
        assert!(!slot.is_due(0));

        slot.arm(10, 5, true);
        assert!(!slot.is_due(14));
        assert!(slot.is_due(15));

        slot.fire();
        assert!(slot.is_active());
        assert!(!slot.is_due(19));
        assert!(slot.is_due(20));
    }

    #[test]
    fn slot_one_shot_stops() {
        let mut slot = TimerSlot::IDLE;
        slot.arm(0, 0, false);
        assert!(slot.is_due(0));

        slot.fire();
        assert!(!slot.is_active());
    }

    #[test]
    fn slot_survives_counter_rollover() {
        let mut slot = TimerSlot::IDLE;
        slot.arm(i32::MAX - 1, 10, false);

        assert!(!slot.is_due(i32::MAX));
        assert!(slot.is_due(i32::MIN + 8));
    }

    #[test]
    fn set_rejects_bad_arguments() {
        let mut timers = GlobalTimers::new(2);
        let releases = Rc::new(Cell::new(0));

        assert!(matches!(
            timers.set(0, 0, 10, false, counted(&releases)),
            Err(Error::Status(_))
        ));

        timers.open();
        assert!(matches!(
            timers.set(2, 0, 10, false, counted(&releases)),
            Err(Error::Parameter(_))
        ));
        assert!(matches!(
            timers.set(0, 0, -1, false, counted(&releases)),
            Err(Error::Parameter(_))
        ));
        assert!(timers.set(0, 0, 10, false, counted(&releases)).is_ok());
        assert!(matches!(
            timers.set(0, 0, 10, false, counted(&releases)),
            Err(Error::Status(_))
        ));
        // Rejected handlers are dropped, never released.
        assert_eq!(releases.get(), 0);
    }

    #[test]
    fn kill_releases_once() {
        let mut timers = GlobalTimers::new(1);
        let releases = Rc::new(Cell::new(0));
        timers.open();
        timers.set(0, 0, 10, true, counted(&releases)).unwrap();

        timers.kill(0).unwrap();
        timers.kill(0).unwrap();

        assert_eq!(releases.get(), 1);
        assert!(!timers.is_active(0));
    }

    #[test]
    fn kill_during_firing_releases_once() {
        let mut timers = GlobalTimers::new(1);
        let releases = Rc::new(Cell::new(0));
        timers.open();
        timers.set(0, 0, 10, false, counted(&releases)).unwrap();

        let firing = timers.take_due(0, 10).unwrap();
        timers.kill(0).unwrap();
        assert_eq!(releases.get(), 0);

        timers.settle(firing);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn rearm_during_firing_keeps_new_handler() {
        let mut timers = GlobalTimers::new(1);
        let old = Rc::new(Cell::new(0));
        let new = Rc::new(Cell::new(0));
        timers.open();
        timers.set(0, 0, 10, true, counted(&old)).unwrap();

        let firing = timers.take_due(0, 10).unwrap();
        timers.kill(0).unwrap();
        timers.set(0, 10, 50, false, counted(&new)).unwrap();
        timers.settle(firing);

        assert_eq!(old.get(), 1);
        assert_eq!(new.get(), 0);
        assert!(timers.is_active(0));
    }

    #[test]
    fn close_releases_running_timers_only() {
        let mut timers = GlobalTimers::new(3);
        let releases = Rc::new(Cell::new(0));
        timers.open();
        timers.set(0, 0, 10, true, counted(&releases)).unwrap();
        timers.set(2, 0, 10, false, counted(&releases)).unwrap();
        timers.kill(2).unwrap();

        timers.close();

        assert_eq!(releases.get(), 2);
        assert!(matches!(timers.kill(0), Err(Error::Status(_))));
    }
}
