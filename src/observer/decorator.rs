//! `ObserverDecorator`: adapts one caller-supplied [`Observer`] into N
//! per-backend subscriptions and merges their events back into the
//! composite namespace (spec §4.7 points 1-7).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::dispatcher::{Dispatcher, Job};
use super::{Event, EventKind, EventSource, Observer, ObserverHandle, RawCallback};
use crate::dispose::Belate;
use crate::error::Result;
use crate::path_converter::PathConverter;

/// One backend this decorator forwards events from/to, paired with the
/// path converter that rewrites its namespace into the composite's.
pub struct Forwardee {
    pub source: Arc<dyn EventSource>,
    pub converter: PathConverter,
}

struct RegisteredForwardee {
    source: Arc<dyn EventSource>,
    subscription_id: u64,
    disposed_hook_id: u64,
}

struct State {
    observer: Box<dyn Observer>,
    forwardees: Vec<RegisteredForwardee>,
}

/// Lifecycle driver for one client subscription over N backends.
pub struct ObserverDecorator {
    dispatcher: Arc<dyn Dispatcher>,
    state: Mutex<Option<State>>,
    active_forwardee_count: AtomicUsize,
    disposed: AtomicBool,
    belate: Arc<Belate>,
}

impl ObserverDecorator {
    /// Creates the decorator, immediately delivering a synthetic `start`
    /// event, then installs one raw subscription per forwardee whose
    /// converter accepts the filter's literal prefix.
    pub fn subscribe(
        forwardees: Vec<Forwardee>,
        filter: &str,
        mut observer: Box<dyn Observer>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> (Arc<Self>, ObserverHandle) {
        observer.on_event(Event::new(EventKind::Start, ""));

        let decorator = Arc::new(Self {
            dispatcher,
            state: Mutex::new(Some(State { observer, forwardees: Vec::new() })),
            active_forwardee_count: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
            belate: Belate::new(),
        });

        let info = super::glob::CompiledGlob::compile(filter).info();

        for forwardee in forwardees {
            let Some(child_prefix) = forwardee.converter.parent_to_child(&info.prefix) else {
                continue;
            };
            let child_filter = format!("{child_prefix}{}", info.suffix);
            decorator.clone().install_forwardee(forwardee, &child_filter);
        }

        let handle = ObserverHandle::new(decorator.clone());
        (decorator, handle)
    }

    fn install_forwardee(self: Arc<Self>, forwardee: Forwardee, child_filter: &str) {
        let converter = forwardee.converter.clone();
        let weak_self = Arc::downgrade(&self);
        let converter_for_event = converter.clone();

        let callback: RawCallback = Box::new(move |event| {
            if event.kind == EventKind::Start {
                // Each backend's own subscription lifecycle start is
                // internal; the composite already emitted its own.
                return;
            }
            let Some(decorator) = weak_self.upgrade() else { return };
            let Some(translated) = translate(&converter_for_event, &event) else { return };
            decorator.deliver(translated);
        });

        let subscription_id = forwardee.source.subscribe(child_filter, callback);

        let weak_self_for_disposal = Arc::downgrade(&self);
        let disposed_hook_id = forwardee.source.on_source_disposed(Box::new(move || {
            if let Some(decorator) = weak_self_for_disposal.upgrade() {
                decorator.on_forwardee_disposed();
            }
        }));

        let mut state = self.state.lock().expect("observer decorator lock poisoned");
        if let Some(state) = state.as_mut() {
            state.forwardees.push(RegisteredForwardee {
                source: forwardee.source,
                subscription_id,
                disposed_hook_id,
            });
        }
        drop(state);
        self.active_forwardee_count.fetch_add(1, Ordering::AcqRel);
    }

    fn deliver(self: &Arc<Self>, event: Event) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        let Ok(guard) = self.belate.acquire() else { return };
        let this = self.clone();
        let job: Job = Box::new(move || {
            let _guard = guard;
            let mut state = this.state.lock().expect("observer decorator lock poisoned");
            if let Some(state) = state.as_mut() {
                state.observer.on_event(event);
            }
        });
        self.dispatcher.dispatch(job);
    }

    fn on_forwardee_disposed(self: &Arc<Self>) {
        if self.active_forwardee_count.fetch_sub(1, Ordering::AcqRel) == 1 {
            // The last forwardee completed spontaneously.
            self.dispose();
        }
    }

    /// Disposes every forwardee and calls `complete` on the caller
    /// observer exactly once.
    pub fn dispose(self: &Arc<Self>) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let this = self.clone();
        self.belate.on_disposed(move || {
            let mut state = this.state.lock().expect("observer decorator lock poisoned");
            let Some(mut state) = state.take() else { return };
            for forwardee in state.forwardees.drain(..) {
                forwardee.source.unsubscribe(forwardee.subscription_id);
                forwardee.source.cancel_on_source_disposed(forwardee.disposed_hook_id);
            }
            state.observer.on_complete();
            tracing::debug!(backend = "observer_decorator", "subscription completed");
        });
        self.belate.dispose();
    }
}

pub(crate) fn translate(converter: &PathConverter, event: &Event) -> Option<Event> {
    let path = converter.child_to_parent(&event.path)?.into_owned();
    let new_path = match &event.new_path {
        Some(p) => Some(converter.child_to_parent(p)?.into_owned()),
        None => None,
    };
    Some(Event { kind: event.kind, path, new_path, time: event.time })
}

/// Convenience for the common single-backend case (e.g. a leaf filesystem
/// exposing its own `observe`), where no path translation is needed.
pub fn subscribe_single(
    source: Arc<dyn EventSource>,
    filter: &str,
    observer: Box<dyn Observer>,
    dispatcher: Arc<dyn Dispatcher>,
) -> Result<ObserverHandle> {
    let forwardee = Forwardee { source, converter: PathConverter::identity() };
    let (_decorator, handle) = ObserverDecorator::subscribe(vec![forwardee], filter, observer, dispatcher);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{CallerThreadDispatcher, EventHub};
    use std::sync::atomic::AtomicUsize;

    struct RecordingObserver {
        events: Arc<Mutex<Vec<Event>>>,
        completed: Arc<AtomicUsize>,
    }

    impl Observer for RecordingObserver {
        fn on_event(&mut self, event: Event) {
            self.events.lock().unwrap().push(event);
        }

        fn on_complete(&mut self) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emits_start_before_installing_forwardees() {
        let hub = EventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicUsize::new(0));
        let observer = RecordingObserver { events: events.clone(), completed };

        let handle = subscribe_single(
            hub.clone(),
            "**",
            Box::new(observer),
            Arc::new(CallerThreadDispatcher),
        )
        .unwrap();

        assert_eq!(events.lock().unwrap()[0].kind, EventKind::Start);
        drop(handle);
    }

    #[test]
    fn translates_child_events_into_parent_namespace() {
        let hub = EventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicUsize::new(0));
        let observer = RecordingObserver { events: events.clone(), completed };

        let forwardee = Forwardee { source: hub.clone(), converter: PathConverter::new("/mnt", "") };
        let (_decorator, _handle) = ObserverDecorator::subscribe(
            vec![forwardee],
            "/mnt/*.txt",
            Box::new(observer),
            Arc::new(CallerThreadDispatcher),
        );

        hub.publish(Event::new(EventKind::Create, "/a.txt"));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2); // start + create
        assert_eq!(events[1].path, "/mnt/a.txt");
    }

    #[test]
    fn dispose_unsubscribes_and_completes_exactly_once() {
        let hub = EventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicUsize::new(0));
        let observer = RecordingObserver { events: events.clone(), completed: completed.clone() };

        let handle = subscribe_single(
            hub.clone(),
            "**",
            Box::new(observer),
            Arc::new(CallerThreadDispatcher),
        )
        .unwrap();

        handle.dispose();
        handle.dispose();
        assert_eq!(completed.load(Ordering::SeqCst), 1);

        hub.publish(Event::new(EventKind::Create, "/after-dispose"));
        assert_eq!(events.lock().unwrap().len(), 1); // only the start event
    }

    #[test]
    fn spontaneous_source_disposal_completes_the_decorator() {
        let hub = EventHub::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicUsize::new(0));
        let observer = RecordingObserver { events: events.clone(), completed: completed.clone() };

        let _handle = subscribe_single(
            hub.clone(),
            "**",
            Box::new(observer),
            Arc::new(CallerThreadDispatcher),
        )
        .unwrap();

        hub.dispose();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }
}
