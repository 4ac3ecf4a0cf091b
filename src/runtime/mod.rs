//! Runtime subsystem modules.

mod context;
mod core;
pub(crate) mod queue;
pub(crate) mod stack;

pub use context::Context;
pub use self::core::{Phase, Runtime};
pub use queue::Mailbox;
pub use stack::PopSelector;
