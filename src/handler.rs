//! Event handlers: the application modes stacked by the runtime.
//!
//! An event handler bundles the lifecycle callbacks of one "mode" or scene
//! with the data it needs. The value implementing [`EventHandler`] *is* the
//! user data; every callback has a no-op default so a handler only overrides
//! what it cares about.
//!
//! # Lifecycle
//!
//! For a handler pushed on top of another one, the runtime calls, in order:
//!
//! 1. `on_disappear` on the handler being covered
//! 2. `on_init` then `on_appear` on the new handler
//! 3. `on_event` / `on_timer` while it is the top
//! 4. when popped: `on_disappear`, `on_destroy`, then `release`
//! 5. `on_appear` on the handler uncovered by the pop
//!
//! # Example
//!
//! ```ignore
//! use loopcell::{Context, EventHandler, EventId, HandlerDescriptor};
//!
//! struct Menu;
//!
//! impl EventHandler for Menu {
//!     fn on_event(&mut self, cx: &mut Context<'_>, id: EventId) {
//!         if id == 0 {
//!             let _ = cx.pop();
//!         }
//!     }
//! }
//!
//! let descriptor = HandlerDescriptor::new(Menu).with_tag(1);
//! ```

use crate::platform::EventId;
use crate::runtime::Context;
use crate::timer::TimerId;

/// Label used to pop back down to a handler.
///
/// Positive values are application tags; `0` means untagged. Negative values
/// are rejected.
pub type Tag = i32;

/// Tag of a handler that does not take part in [`pop_by_tag`](crate::Context::pop_by_tag).
pub const UNTAGGED: Tag = 0;

/// Callbacks for one entry of the handler stack.
#[allow(unused_variables)]
pub trait EventHandler {
    /// Called once, right after the handler becomes the top.
    fn on_init(&mut self, cx: &mut Context<'_>) {}

    /// Called whenever the handler becomes the visible top, including after
    /// `on_init` and after the handlers above it are popped.
    fn on_appear(&mut self, cx: &mut Context<'_>) {}

    /// Called for an external event while the handler is the top.
    fn on_event(&mut self, cx: &mut Context<'_>, id: EventId) {}

    /// Called when one of this handler's timers expires.
    fn on_timer(&mut self, cx: &mut Context<'_>, id: TimerId) {}

    /// Called when the handler stops being the top, by push or pop.
    fn on_disappear(&mut self, cx: &mut Context<'_>) {}

    /// Called when the handler is removed from the stack.
    fn on_destroy(&mut self, cx: &mut Context<'_>) {}

    /// Consumes the handler after its last callback.
    fn release(self: Box<Self>) {}
}

/// A handler together with its stack tag.
pub struct HandlerDescriptor {
    pub(crate) handler: Box<dyn EventHandler>,
    pub(crate) tag: Tag,
}

impl HandlerDescriptor {
    /// Wraps an untagged handler.
    ///
    /// # Example
    /// ```ignore
    /// rt.prepare(HandlerDescriptor::new(Title))?;
    /// ```
    pub fn new(handler: impl EventHandler + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            tag: UNTAGGED,
        }
    }

    /// Wraps an already boxed handler.
    pub fn from_box(handler: Box<dyn EventHandler>) -> Self {
        Self {
            handler,
            tag: UNTAGGED,
        }
    }

    /// Sets the tag used by `pop_by_tag`.
    ///
    /// # Arguments
    /// * `tag` - Positive to take part in `pop_by_tag`, [`UNTAGGED`] otherwise.
    ///   Negative tags are rejected when the descriptor is pushed.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    /// Returns the tag the handler will be pushed with.
    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl<H: EventHandler + 'static> From<H> for HandlerDescriptor {
    fn from(handler: H) -> Self {
        Self::new(handler)
    }
}

pub(crate) fn valid_tag(tag: Tag) -> bool {
    tag > 0
}

pub(crate) fn valid_tag_on_push(tag: Tag) -> bool {
    valid_tag(tag) || tag == UNTAGGED
}
