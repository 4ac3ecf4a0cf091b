//! Fluent builder for Runtime construction.
//!
//! Every pool and table in the runtime has a fixed size chosen here. Size
//! them for the worst case: handler capacity bounds the stack depth (root
//! and a booked push included), message capacity bounds the mailbox depth.

use crate::platform::{Platform, SystemPlatform};
use crate::runtime::Runtime;

/// Sizes of the runtime's fixed pools and tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Handler cells, root and booked push included.
    pub handler_capacity: usize,
    /// Message cells, queued and in delivery.
    pub message_capacity: usize,
    /// Timer slots in each handler.
    pub timers_per_handler: usize,
    /// Slots in the global timer table.
    pub global_timers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            handler_capacity: 16,
            message_capacity: 16,
            timers_per_handler: 8,
            global_timers: 8,
        }
    }
}

/// Builder for constructing Runtime instances with fluent API.
///
/// # Example
/// ```ignore
/// let rt = RuntimeBuilder::new()
///     .handler_capacity(4)
///     .platform(ManualPlatform::new())
///     .build();
/// ```
pub struct RuntimeBuilder {
    config: Config,
    platform: Option<Box<dyn Platform>>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder with the default [`Config`] and the system platform.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            platform: None,
        }
    }

    /// Sets the number of handler cells.
    pub fn handler_capacity(mut self, capacity: usize) -> Self {
        self.config.handler_capacity = capacity;
        self
    }

    /// Sets the number of message cells.
    pub fn message_capacity(mut self, capacity: usize) -> Self {
        self.config.message_capacity = capacity;
        self
    }

    /// Sets the number of timer slots in each handler.
    pub fn timers_per_handler(mut self, count: usize) -> Self {
        self.config.timers_per_handler = count;
        self
    }

    /// Sets the number of global timer slots.
    pub fn global_timers(mut self, count: usize) -> Self {
        self.config.global_timers = count;
        self
    }

    /// Replaces every size at once.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Platform layer to run on. Defaults to [`SystemPlatform`].
    pub fn platform(mut self, platform: impl Platform + 'static) -> Self {
        self.platform = Some(Box::new(platform));
        self
    }

    /// Returns the sizes the runtime will be built with.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Builds an uninitialized runtime.
    pub fn build(self) -> Runtime {
        let platform = self
            .platform
            .unwrap_or_else(|| Box::new(SystemPlatform::new()));

        Runtime::with_config(self.config, platform)
    }
}
