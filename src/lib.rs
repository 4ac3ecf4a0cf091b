//! Cooperative, single-threaded event-handler runtime for constrained targets.
//!
//! An application is a stack of event handlers (modes, scenes, screens)
//! driven by one loop that calls [`Runtime::resume_and_yield`] every tick.
//!
//! # Architecture
//!
//! - **Runtime**: lifecycle and the per-tick loop
//! - **Handler stack**: nested [`EventHandler`]s with deferred push/pop
//! - **Handler timers**: per-handler timers that only tick while their owner is the top
//! - **Global timers**: timers with their own [`TimerHandler`], independent of the stack
//! - **Mailbox**: thread-safe FIFO of [`Message`]s executed by the loop
//! - **Platform**: clock and external event source behind the [`Platform`] trait
//! - **RuntimeBuilder**: fixed pool sizes and platform selection
//!
//! Stack mutations requested from a callback are booked and applied right
//! after that callback returns, one mutation at a time.

mod builder;
mod error;
mod handler;
mod message;
mod platform;
mod runtime;
mod timer;
mod utils;

pub use builder::{Config, RuntimeBuilder};
pub use error::{Error, PlatformError, Result};
pub use handler::{EventHandler, HandlerDescriptor, Tag, UNTAGGED};
pub use message::Message;
pub use platform::{
    EventId, EventQueue, ManualClock, ManualPlatform, Platform, SystemPlatform, Tick,
    tick_reached,
};
pub use runtime::{Context, Mailbox, Phase, PopSelector, Runtime};
pub use timer::{TimerHandler, TimerId};
