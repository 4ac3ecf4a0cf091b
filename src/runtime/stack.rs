//! Event handler stack with deferred push and pop.
//!
//! The stack is a chain of pooled cells linked through `prev`, newest first.
//! Two cursors describe it:
//!
//! - `top`: the handler that currently receives callbacks
//! - `next_top`: the top once the booked mutation is applied
//!
//! `top == next_top` means nothing is booked. Booking only moves `next_top`
//! and links cells; the lifecycle callbacks and the freeing of cells happen
//! when the runtime applies the booking between two callbacks. A callback can
//! therefore never see its own cell freed under it.

use crate::error::{Error, Result};
use crate::handler::{EventHandler, HandlerDescriptor, Tag, valid_tag, valid_tag_on_push};
use crate::platform::Tick;
use crate::timer::{TimerId, TimerSlot, check_timeout};
use crate::utils::pool::{CellId, Pool};

/// Which handlers a pop removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopSelector {
    /// Exactly the top handler.
    Top,
    /// Handlers from the top down until the top carries this tag. If no
    /// handler below the top carries it, everything above the root goes.
    ByTag(Tag),
    /// Everything above the root.
    All,
}

/// Mutation waiting to be applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pending {
    Push,
    Pop,
}

pub(crate) struct HandlerCell {
    // `None` while one of its callbacks is running.
    handler: Option<Box<dyn EventHandler>>,
    tag: Tag,
    prev: Option<CellId>,
    timers: Box<[TimerSlot]>,
}

impl HandlerCell {
    fn new(descriptor: HandlerDescriptor, timers: usize) -> Self {
        Self {
            handler: Some(descriptor.handler),
            tag: descriptor.tag,
            prev: None,
            timers: vec![TimerSlot::IDLE; timers].into_boxed_slice(),
        }
    }

    fn force_stop_timers(&mut self) {
        for timer in self.timers.iter_mut() {
            timer.stop();
        }
    }
}

pub(crate) struct HandlerStack {
    cells: Pool<HandlerCell>,
    top: Option<CellId>,
    next_top: Option<CellId>,
    timers_per_handler: usize,
}

impl HandlerStack {
    pub(crate) fn new(capacity: usize, timers_per_handler: usize) -> Self {
        Self {
            cells: Pool::new(capacity),
            top: None,
            next_top: None,
            timers_per_handler,
        }
    }

    pub(crate) fn top(&self) -> Option<CellId> {
        self.top
    }

    pub(crate) fn next_top(&self) -> Option<CellId> {
        self.next_top
    }

    pub(crate) fn timers_per_handler(&self) -> usize {
        self.timers_per_handler
    }

    pub(crate) fn prev(&self, id: CellId) -> Option<CellId> {
        self.cells.get(id).and_then(|cell| cell.prev)
    }

    pub(crate) fn top_tag(&self) -> Option<Tag> {
        self.top.and_then(|top| self.cells.get(top)).map(|cell| cell.tag)
    }

    /// Number of handlers reachable from the applied top.
    pub(crate) fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.top;
        while let Some(id) = cursor {
            depth += 1;
            cursor = self.prev(id);
        }
        depth
    }

    pub(crate) fn pending(&self) -> Option<Pending> {
        let (top, next_top) = (self.top?, self.next_top?);
        if top == next_top {
            return None;
        }

        if self.prev(next_top) == Some(top) {
            Some(Pending::Push)
        } else {
            Some(Pending::Pop)
        }
    }

    /// Installs the root handler. The caller runs its `on_init`/`on_appear`.
    pub(crate) fn push_root(&mut self, descriptor: HandlerDescriptor) -> Result<CellId> {
        if self.top.is_some() {
            return Err(Error::Status("handler stack is already populated"));
        }
        if !valid_tag_on_push(descriptor.tag) {
            return Err(Error::Parameter("root tag must not be negative"));
        }

        let cell = HandlerCell::new(descriptor, self.timers_per_handler);
        let id = self
            .cells
            .insert(cell)
            .ok_or(Error::Resource("no free handler cell"))?;

        self.top = Some(id);
        self.next_top = Some(id);

        Ok(id)
    }

    pub(crate) fn book_push(&mut self, descriptor: HandlerDescriptor) -> Result<()> {
        let booked_top = self
            .next_top
            .ok_or(Error::Status("handler stack is not running"))?;
        if self.pending().is_some() {
            return Err(Error::Status("a stack mutation is already booked"));
        }
        if !valid_tag_on_push(descriptor.tag) {
            return Err(Error::Parameter("tag must not be negative"));
        }

        let tag = descriptor.tag;
        let mut cell = HandlerCell::new(descriptor, self.timers_per_handler);
        cell.prev = Some(booked_top);

        let id = self
            .cells
            .insert(cell)
            .ok_or(Error::Resource("no free handler cell"))?;
        self.next_top = Some(id);

        log::debug!("push booked (tag {tag})");
        Ok(())
    }

    pub(crate) fn book_pop(&mut self, selector: PopSelector) -> Result<()> {
        if let PopSelector::ByTag(tag) = selector {
            if !valid_tag(tag) {
                return Err(Error::Parameter("pop tag must be positive"));
            }
        }

        let mut booked_top = self
            .next_top
            .ok_or(Error::Status("handler stack is not running"))?;
        if self.pending().is_some() {
            return Err(Error::Status("a stack mutation is already booked"));
        }
        if self.prev(booked_top).is_none() {
            return Err(Error::Failure("only the root handler is left"));
        }

        loop {
            let Some(prev) = self.prev(booked_top) else {
                break;
            };
            booked_top = prev;

            let done = match selector {
                PopSelector::Top => true,
                PopSelector::ByTag(tag) => self.tag_of(booked_top) == Some(tag),
                PopSelector::All => false,
            };
            if done {
                break;
            }
        }

        self.next_top = Some(booked_top);

        log::debug!("pop booked ({selector:?})");
        Ok(())
    }

    /// Makes the booked push cell the top.
    pub(crate) fn promote(&mut self) {
        self.top = self.next_top;
    }

    /// Makes the booked pop target the top and stops its timers.
    pub(crate) fn settle_pop(&mut self) {
        self.top = self.next_top;
        if let Some(cell) = self.top.and_then(|top| self.cells.get_mut(top)) {
            cell.force_stop_timers();
        }
    }

    /// Takes a cell's handler out so its callback can borrow the runtime.
    pub(crate) fn take_handler(&mut self, id: CellId) -> Option<Box<dyn EventHandler>> {
        self.cells.get_mut(id)?.handler.take()
    }

    pub(crate) fn restore_handler(&mut self, id: CellId, handler: Box<dyn EventHandler>) {
        if let Some(cell) = self.cells.get_mut(id) {
            cell.handler = Some(handler);
        }
    }

    /// Frees a cell, handing back its handler for `release`.
    pub(crate) fn free(&mut self, id: CellId) -> Option<Box<dyn EventHandler>> {
        let mut cell = self.cells.remove(id)?;
        cell.force_stop_timers();
        cell.handler.take()
    }

    /// Detaches the whole chain for teardown.
    ///
    /// Returns the booked push cell (if any), then the applied chain from top
    /// to root. Both cursors are cleared, so later bookings fail.
    pub(crate) fn detach(&mut self) -> (Option<CellId>, Vec<CellId>) {
        let booked = match self.pending() {
            Some(Pending::Push) => self.next_top,
            _ => None,
        };

        let mut chain = Vec::new();
        let mut cursor = self.top;
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.prev(id);
        }

        self.top = None;
        self.next_top = None;

        (booked, chain)
    }

    pub(crate) fn set_timer(
        &mut self,
        id: TimerId,
        now: Tick,
        timeout: Tick,
        repeat: bool,
    ) -> Result<()> {
        let slot = self.top_timer(id)?;
        check_timeout(timeout)?;

        if slot.is_active() {
            return Err(Error::Status("timer is already running"));
        }

        slot.arm(now, timeout, repeat);
        Ok(())
    }

    pub(crate) fn kill_timer(&mut self, id: TimerId) -> Result<()> {
        self.top_timer(id)?.stop();
        Ok(())
    }

    /// Consumes an expiry of the top's timer `index`, returning whether it was due.
    pub(crate) fn fire_timer(&mut self, cell: CellId, index: usize, now: Tick) -> bool {
        let Some(slot) = self
            .cells
            .get_mut(cell)
            .and_then(|cell| cell.timers.get_mut(index))
        else {
            return false;
        };

        if !slot.is_due(now) {
            return false;
        }

        slot.fire();
        true
    }

    fn top_timer(&mut self, id: TimerId) -> Result<&mut TimerSlot> {
        let top = self
            .top
            .ok_or(Error::Status("handler stack is not running"))?;
        let cell = self
            .cells
            .get_mut(top)
            .ok_or(Error::Status("top handler is being removed"))?;

        cell.timers
            .get_mut(id as usize)
            .ok_or(Error::Parameter("timer id out of range"))
    }

    fn tag_of(&self, id: CellId) -> Option<Tag> {
        self.cells.get(id).map(|cell| cell.tag)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cells.len()
    }
}
