//! Hand-driven platform for deterministic tests and simulations.
//!
//! Time only moves when the test calls [`ManualClock::advance`] or
//! [`ManualClock::set`], so timer expiry can be checked tick by tick,
//! including across counter rollover.

use crate::error::PlatformError;
use crate::platform::{EventId, EventQueue, Platform, Tick};

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

/// Shared handle to a clock that only moves when told to.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI32>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    pub fn new(start: Tick) -> Self {
        Self {
            now: Arc::new(AtomicI32::new(start)),
        }
    }

    /// Current tick.
    pub fn now(&self) -> Tick {
        self.now.load(Ordering::SeqCst)
    }

    /// Jumps the clock to `tick`, backwards included.
    pub fn set(&self, tick: Tick) {
        self.now.store(tick, Ordering::SeqCst);
    }

    /// Moves the clock forward, wrapping like a hardware counter.
    pub fn advance(&self, millis: Tick) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

/// Deterministic platform for tests and simulations.
///
/// # Example
/// ```ignore
/// let platform = ManualPlatform::new();
/// let clock = platform.clock();
/// let mut rt = RuntimeBuilder::new().platform(platform).build();
/// clock.advance(100);
/// ```
#[derive(Default)]
pub struct ManualPlatform {
    clock: ManualClock,
    events: EventQueue,
    init_error: Option<PlatformError>,
}

impl ManualPlatform {
    /// Creates a platform whose clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the clock at `tick` instead of zero.
    pub fn starting_at(tick: Tick) -> Self {
        Self {
            clock: ManualClock::new(tick),
            ..Self::default()
        }
    }

    /// Makes `initialize` fail with `error`.
    pub fn failing_initialize(mut self, error: PlatformError) -> Self {
        self.init_error = Some(error);
        self
    }

    /// Handle to the clock read by `tick`.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Handle for posting events from the test.
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }
}

impl Platform for ManualPlatform {
    fn initialize(&mut self) -> Result<(), PlatformError> {
        match &self.init_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn tick(&self) -> Tick {
        self.clock.now()
    }

    fn peek_event(&mut self) -> Option<EventId> {
        self.events.pop()
    }
}
