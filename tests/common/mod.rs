#![allow(dead_code)]

use loopcell::{
    Context, EventHandler, EventId, EventQueue, HandlerDescriptor, ManualClock, ManualPlatform,
    Runtime, RuntimeBuilder, Tag, TimerId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Ordered record of callback invocations, shared by every probe.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Returns the entries and clears the journal.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

type Action = Box<dyn FnMut(&mut Context<'_>, u32)>;

/// Handler that records every callback as `"<name>.<hook>"` and can run a
/// scripted action per hook.
pub struct Probe {
    name: &'static str,
    journal: Journal,
    actions: HashMap<&'static str, Action>,
}

impl Probe {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            actions: HashMap::new(),
        }
    }

    /// Runs `action` whenever `hook` is called. The second argument is the
    /// event or timer ID, or 0 for lifecycle hooks.
    pub fn on<F>(mut self, hook: &'static str, action: F) -> Self
    where
        F: FnMut(&mut Context<'_>, u32) + 'static,
    {
        self.actions.insert(hook, Box::new(action));
        self
    }

    pub fn tagged(self, tag: Tag) -> HandlerDescriptor {
        HandlerDescriptor::new(self).with_tag(tag)
    }

    fn hit(&mut self, hook: &'static str, cx: &mut Context<'_>, arg: u32) {
        self.journal.record(format!("{}.{}", self.name, hook));
        if let Some(action) = self.actions.get_mut(hook) {
            action(cx, arg);
        }
    }
}

impl EventHandler for Probe {
    fn on_init(&mut self, cx: &mut Context<'_>) {
        self.hit("init", cx, 0);
    }

    fn on_appear(&mut self, cx: &mut Context<'_>) {
        self.hit("appear", cx, 0);
    }

    fn on_event(&mut self, cx: &mut Context<'_>, id: EventId) {
        self.journal.record(format!("{}.event({})", self.name, id));
        if let Some(action) = self.actions.get_mut("event") {
            action(cx, id);
        }
    }

    fn on_timer(&mut self, cx: &mut Context<'_>, id: TimerId) {
        self.journal.record(format!("{}.timer({})", self.name, id));
        if let Some(action) = self.actions.get_mut("timer") {
            action(cx, id);
        }
    }

    fn on_disappear(&mut self, cx: &mut Context<'_>) {
        self.hit("disappear", cx, 0);
    }

    fn on_destroy(&mut self, cx: &mut Context<'_>) {
        self.hit("destroy", cx, 0);
    }

    fn release(self: Box<Self>) {
        self.journal.record(format!("{}.release", self.name));
    }
}

/// A runtime on a manual platform, with handles to its clock and events.
pub struct Harness {
    pub rt: Runtime,
    pub clock: ManualClock,
    pub events: EventQueue,
    pub journal: Journal,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RuntimeBuilder::new())
    }

    pub fn with(builder: RuntimeBuilder) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let platform = ManualPlatform::new();
        let clock = platform.clock();
        let events = platform.events();
        let rt = builder.platform(platform).build();

        Self {
            rt,
            clock,
            events,
            journal: Journal::default(),
        }
    }

    /// Initializes and prepares with a recording root probe, then clears
    /// the journal.
    pub fn prepared() -> Self {
        Self::prepared_with(RuntimeBuilder::new())
    }

    pub fn prepared_with(builder: RuntimeBuilder) -> Self {
        let mut harness = Self::with(builder);
        let root = harness.probe("root");
        harness.rt.initialize().unwrap();
        harness.rt.prepare(root).unwrap();
        harness.journal.take();
        harness
    }

    pub fn probe(&self, name: &'static str) -> Probe {
        Probe::new(name, &self.journal)
    }

    pub fn tick(&mut self) {
        self.rt.resume_and_yield().unwrap();
    }
}
