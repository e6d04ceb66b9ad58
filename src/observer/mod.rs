//! Glob-pattern subscription layer that translates child-backend events
//! back into composite-namespace events and dispatches them synchronously
//! or through a background worker (spec §4.7).

pub mod decorator;
pub mod dispatcher;
pub mod glob;

pub use decorator::ObserverDecorator;
pub use dispatcher::{CallerThreadDispatcher, Dispatcher, Job, WorkerDispatcher};
pub use glob::GlobPattern;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Kind of a single observer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Create,
    Delete,
    Change,
    Rename,
    Error,
}

/// An event delivered to a subscriber. `new_path` is populated only for
/// [`EventKind::Rename`].
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub path: String,
    pub new_path: Option<String>,
    pub time: SystemTime,
}

impl Event {
    pub fn new(kind: EventKind, path: impl Into<String>) -> Self {
        Self { kind, path: path.into(), new_path: None, time: SystemTime::now() }
    }

    pub fn rename(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Rename,
            path: old_path.into(),
            new_path: Some(new_path.into()),
            time: SystemTime::now(),
        }
    }

    /// The path this event's glob filter should be matched against: the
    /// old path for a rename, the single path otherwise.
    pub fn filter_path(&self) -> &str {
        &self.path
    }
}

pub type RawCallback = Box<dyn FnMut(Event) + Send>;

/// A caller-supplied observer: receives events and, exactly once, a
/// completion signal when its subscription ends.
pub trait Observer: Send {
    fn on_event(&mut self, event: Event);

    fn on_complete(&mut self) {}
}

impl<F: FnMut(Event) + Send> Observer for F {
    fn on_event(&mut self, event: Event) {
        self(event)
    }
}

/// A source of raw, unfiltered-by-dispatcher backend events: every
/// concrete backend (and the composite layers built over them) implements
/// this so [`ObserverDecorator`] can subscribe without caring which kind
/// of source it is.
pub trait EventSource: Send + Sync {
    /// Subscribes `callback` to every event whose path matches `filter`.
    /// Returns an id usable with [`EventSource::unsubscribe`].
    fn subscribe(&self, filter: &str, callback: RawCallback) -> u64;

    fn unsubscribe(&self, id: u64);

    /// Registers a one-shot callback fired when this source itself is
    /// disposed (e.g. the backing filesystem is torn down), so a
    /// decorator subscribed to it can complete spontaneously.
    fn on_source_disposed(&self, callback: Box<dyn FnOnce() + Send>) -> u64;

    fn cancel_on_source_disposed(&self, id: u64);
}

struct RawSubscription {
    pattern: Arc<glob::CompiledGlob>,
    callback: RawCallback,
}

/// A concrete, glob-filtered publish/subscribe hub. Every leaf backend
/// (e.g. `MemoryFileSystem`) owns one and publishes its structural/content
/// events through it; [`EventSource`] is implemented directly in terms of
/// it.
pub struct EventHub {
    next_id: Mutex<u64>,
    subscriptions: Mutex<HashMap<u64, RawSubscription>>,
    on_disposed: Mutex<HashMap<u64, Box<dyn FnOnce() + Send>>>,
}

impl EventHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: Mutex::new(0),
            subscriptions: Mutex::new(HashMap::new()),
            on_disposed: Mutex::new(HashMap::new()),
        })
    }

    fn alloc_id(&self) -> u64 {
        let mut next_id = self.next_id.lock().expect("event hub lock poisoned");
        let id = *next_id;
        *next_id += 1;
        id
    }

    /// Publishes `event` to every subscription whose filter matches its path.
    pub fn publish(&self, event: Event) {
        let mut subs = self.subscriptions.lock().expect("event hub lock poisoned");
        for sub in subs.values_mut() {
            if sub.pattern.matches(event.filter_path()) {
                (sub.callback)(event.clone());
            }
        }
    }

    /// Disposes the hub: runs every registered `on_source_disposed`
    /// callback exactly once.
    pub fn dispose(&self) {
        let callbacks: Vec<_> =
            self.on_disposed.lock().expect("event hub lock poisoned").drain().map(|(_, cb)| cb).collect();
        for cb in callbacks {
            cb();
        }
    }
}

impl EventSource for EventHub {
    fn subscribe(&self, filter: &str, callback: RawCallback) -> u64 {
        let pattern = glob::CompiledGlob::compile_cached(filter);
        let id = self.alloc_id();
        self.subscriptions
            .lock()
            .expect("event hub lock poisoned")
            .insert(id, RawSubscription { pattern, callback });
        id
    }

    fn unsubscribe(&self, id: u64) {
        self.subscriptions.lock().expect("event hub lock poisoned").remove(&id);
    }

    fn on_source_disposed(&self, callback: Box<dyn FnOnce() + Send>) -> u64 {
        let id = self.alloc_id();
        self.on_disposed.lock().expect("event hub lock poisoned").insert(id, callback);
        id
    }

    fn cancel_on_source_disposed(&self, id: u64) {
        self.on_disposed.lock().expect("event hub lock poisoned").remove(&id);
    }
}

/// A live subscription created through [`ObserverDecorator`]; disposing it
/// is the only cancellation mechanism (spec §5).
pub struct ObserverHandle {
    decorator: Arc<decorator::ObserverDecorator>,
}

impl ObserverHandle {
    pub(crate) fn new(decorator: Arc<decorator::ObserverDecorator>) -> Self {
        Self { decorator }
    }

    pub fn dispose(&self) {
        self.decorator.dispose();
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.decorator.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hub_delivers_only_matching_events() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        hub.subscribe(
            "/tmp/*.txt",
            Box::new(move |_event| {
                count2.fetch_add(1, Ordering::SeqCst);
            }),
        );

        hub.publish(Event::new(EventKind::Create, "/tmp/a.txt"));
        hub.publish(Event::new(EventKind::Create, "/tmp/a.rs"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let id = hub.subscribe("**", Box::new(move |_| { count2.fetch_add(1, Ordering::SeqCst); }));
        hub.unsubscribe(id);
        hub.publish(Event::new(EventKind::Create, "/x"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
