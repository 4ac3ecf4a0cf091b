//! Platform layer consumed by the runtime.
//!
//! The runtime never talks to the operating system directly. Everything
//! machine-dependent goes through the [`Platform`] trait:
//!
//! - lifecycle hooks around initialization and the main loop
//! - a monotonic millisecond tick that is allowed to wrap around
//! - at most one pending external event per call
//!
//! Two implementations are provided:
//!
//! - [`SystemPlatform`]: reads `CLOCK_MONOTONIC`
//! - [`ManualPlatform`]: clock advanced by hand, for tests and simulations
//!
//! Both source their events from an [`EventQueue`] that any thread may post to.
//!
//! # Example
//!
//! ```ignore
//! use loopcell::{RuntimeBuilder, SystemPlatform};
//!
//! let platform = SystemPlatform::new();
//! let events = platform.events();
//! let mut rt = RuntimeBuilder::new().platform(platform).build();
//!
//! std::thread::spawn(move || events.post(42));
//! ```

mod events;
mod manual;
mod system;

pub use events::EventQueue;
pub use manual::{ManualClock, ManualPlatform};
pub use system::SystemPlatform;

use crate::error::PlatformError;

/// Millisecond tick counter. Wraps around; compare with [`tick_reached`].
pub type Tick = i32;

/// Identifier of an external event delivered to `on_event`.
pub type EventId = u32;

/// Machine-dependent services required by the runtime.
pub trait Platform {
    /// Called once by `Runtime::initialize`.
    fn initialize(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Called once by `Runtime::finalize`.
    fn finalize(&mut self) {}

    /// Called by `Runtime::prepare` before the root handler is pushed.
    fn prepare(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Called by `Runtime::cleanup`, and when `prepare` fails after the
    /// platform was already prepared.
    fn cleanup(&mut self) {}

    /// Current monotonic tick in milliseconds.
    fn tick(&self) -> Tick;

    /// Takes the next pending external event, if any.
    fn peek_event(&mut self) -> Option<EventId>;
}

/// Returns true once `now` has reached `deadline`.
///
/// The subtraction wraps and is read as signed, so the answer stays correct
/// across counter rollover as long as the real distance is under half the
/// counter range.
pub fn tick_reached(now: Tick, deadline: Tick) -> bool {
    now.wrapping_sub(deadline) >= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reached_at_and_after_deadline() {
        assert!(tick_reached(100, 100));
        assert!(tick_reached(101, 100));
        assert!(!tick_reached(99, 100));
    }

    #[test]
    fn reached_across_rollover() {
        let deadline = i32::MAX.wrapping_add(5);
        assert!(!tick_reached(i32::MAX, deadline));
        assert!(tick_reached(i32::MIN + 4, deadline));
        assert!(tick_reached(i32::MIN + 10, deadline));
    }

    #[test]
    fn negative_ticks_compare_normally() {
        assert!(tick_reached(-5, -10));
        assert!(!tick_reached(-10, -5));
    }
}
