//! Platform backed by the host operating system.
//!
//! The tick is `CLOCK_MONOTONIC` in milliseconds, truncated to 32 bits so it
//! wraps the way a hardware counter would.

use crate::error::PlatformError;
use crate::platform::{EventId, EventQueue, Platform, Tick};

use libc::{CLOCK_MONOTONIC, clock_gettime, timespec};

/// Platform backed by the host's monotonic clock.
///
/// External events come from the [`EventQueue`] returned by [`events`](Self::events).
#[derive(Default)]
pub struct SystemPlatform {
    events: EventQueue,
}

impl SystemPlatform {
    /// Creates a platform with an empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for posting events from any thread.
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }
}

impl Platform for SystemPlatform {
    fn initialize(&mut self) -> Result<(), PlatformError> {
        monotonic_millis()
            .map(|_| ())
            .ok_or_else(|| PlatformError::new("CLOCK_MONOTONIC is unavailable"))
    }

    fn prepare(&mut self) -> Result<(), PlatformError> {
        self.events.clear();
        Ok(())
    }

    fn tick(&self) -> Tick {
        // Truncation to 32 bits is the wraparound the timers are built for.
        monotonic_millis().unwrap_or(0) as Tick
    }

    fn peek_event(&mut self) -> Option<EventId> {
        self.events.pop()
    }
}

fn monotonic_millis() -> Option<i64> {
    let mut ts = timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    let res = unsafe { clock_gettime(CLOCK_MONOTONIC, &mut ts) };
    if res != 0 {
        return None;
    }

    Some(ts.tv_sec as i64 * 1000 + ts.tv_nsec as i64 / 1_000_000)
}
