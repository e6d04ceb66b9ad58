//! Counted dispose (spec §5/§9): an object transitions through
//! `live -> dispose_called -> disposing -> disposed`. The transition into
//! `disposing` is held back by a [`Belate`] counter so that a worker
//! mid-operation keeps the object usable until it finishes.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum State {
    Live = 0,
    DisposeCalled = 1,
    Disposing = 2,
    Disposed = 3,
}

impl From<u8> for State {
    fn from(v: u8) -> Self {
        match v {
            0 => State::Live,
            1 => State::DisposeCalled,
            2 => State::Disposing,
            _ => State::Disposed,
        }
    }
}

/// Anything with child disposables and/or a dispose action.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
}

/// A counted-dispose guard: `dispose()` is deferred until the belate
/// counter drops to zero. A holder acquires a [`BelateGuard`] at the start
/// of an in-progress operation and releases it (by dropping the guard) at
/// the end.
pub struct Belate {
    state: AtomicU8,
    count: Mutex<u64>,
    children: Mutex<Vec<Arc<dyn Disposable>>>,
    on_disposed: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Belate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(State::Live as u8),
            count: Mutex::new(0),
            children: Mutex::new(Vec::new()),
            on_disposed: Mutex::new(None),
        })
    }

    fn state(&self) -> State {
        State::from(self.state.load(Ordering::Acquire))
    }

    /// Registers a child disposable to be disposed when this object is.
    pub fn add_child(&self, child: Arc<dyn Disposable>) {
        self.children.lock().expect("belate children lock poisoned").push(child);
    }

    /// Registers a one-shot action to run once the object reaches
    /// `disposed`, after children have been disposed.
    pub fn on_disposed(&self, action: impl FnOnce() + Send + 'static) {
        *self.on_disposed.lock().expect("belate on_disposed lock poisoned") = Some(Box::new(action));
    }

    /// Acquires a belate handle, deferring the `disposing -> disposed`
    /// transition until it (and every other outstanding handle) is
    /// released. Fails if the object is already disposed.
    pub fn acquire(self: &Arc<Self>) -> Result<BelateGuard> {
        if self.state() == State::Disposed {
            return Err(Error::Disposed);
        }
        *self.count.lock().expect("belate count lock poisoned") += 1;
        Ok(BelateGuard { belate: self.clone() })
    }

    fn release(&self) {
        let mut count = self.count.lock().expect("belate count lock poisoned");
        *count -= 1;
        let reached_zero = *count == 0;
        drop(count);
        if reached_zero && self.state() == State::DisposeCalled {
            self.advance_to_disposed();
        }
    }

    /// Begins disposal. If belate handles are outstanding, the object
    /// transitions to `dispose_called` and finishes once they all release.
    pub fn dispose(self: &Arc<Self>) {
        let prev = self.state.swap(State::DisposeCalled as u8, Ordering::AcqRel);
        if prev != State::Live as u8 {
            return;
        }
        let outstanding = *self.count.lock().expect("belate count lock poisoned") > 0;
        if !outstanding {
            self.advance_to_disposed();
        }
    }

    fn advance_to_disposed(&self) {
        self.state.store(State::Disposing as u8, Ordering::Release);
        let children = std::mem::take(&mut *self.children.lock().expect("belate children lock poisoned"));
        for child in children {
            child.dispose();
        }
        self.state.store(State::Disposed as u8, Ordering::Release);
        if let Some(action) = self.on_disposed.lock().expect("belate on_disposed lock poisoned").take() {
            action();
        }
        tracing::debug!(backend = "belate", "disposal complete");
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == State::Disposed
    }

    /// Returns an error if the object has passed `live`, for call sites
    /// that must fail fast on a disposed resource.
    pub fn check_live(&self) -> Result<()> {
        if self.state() != State::Live {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }
}

/// A held belate reference; dropping it releases the hold.
pub struct BelateGuard {
    belate: Arc<Belate>,
}

impl Drop for BelateGuard {
    fn drop(&mut self) {
        self.belate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn dispose_without_outstanding_handles_completes_immediately() {
        let belate = Belate::new();
        belate.dispose();
        assert!(belate.is_disposed());
    }

    #[test]
    fn dispose_waits_for_outstanding_handle_release() {
        let belate = Belate::new();
        let guard = belate.acquire().unwrap();
        belate.dispose();
        assert!(!belate.is_disposed());
        drop(guard);
        assert!(belate.is_disposed());
    }

    #[test]
    fn acquire_after_disposed_fails() {
        let belate = Belate::new();
        belate.dispose();
        assert!(matches!(belate.acquire(), Err(Error::Disposed)));
    }

    #[test]
    fn dispose_cascades_to_children() {
        struct Flag(Arc<AtomicBool>);
        impl Disposable for Flag {
            fn dispose(&self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let flagged = Arc::new(AtomicBool::new(false));
        let belate = Belate::new();
        belate.add_child(Arc::new(Flag(flagged.clone())));
        belate.dispose();
        assert!(flagged.load(Ordering::SeqCst));
    }
}
