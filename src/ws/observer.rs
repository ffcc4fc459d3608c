//! Caller-supplied callbacks fanned out by the connection manager.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// A registrable callback handle.
///
/// Clones share an identity, so registering the same handle twice leaves a
/// single registration and removing it once unregisters it.
pub struct Observer<T: ?Sized> {
    id: u64,
    callback: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T: ?Sized> Observer<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            id: NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed),
            callback: Arc::new(callback),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T: ?Sized> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish()
    }
}

/// Set of observers keyed by handle identity.
pub(crate) struct Registry<T: ?Sized> {
    label: &'static str,
    observers: DashMap<u64, Observer<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            label,
            observers: DashMap::new(),
        }
    }

    pub(crate) fn add(&self, observer: Observer<T>) {
        self.observers.insert(observer.id, observer);
    }

    pub(crate) fn remove(&self, observer: &Observer<T>) {
        self.remove_id(observer.id);
    }

    pub(crate) fn remove_id(&self, id: u64) {
        self.observers.remove(&id);
    }

    pub(crate) fn clear(&self) {
        self.observers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Invoke every observer with `value`.
    ///
    /// Callbacks run against a snapshot, so they may add or remove observers.
    /// A panicking observer is logged and skipped.
    pub(crate) fn notify(&self, value: &T) {
        let snapshot: Vec<Observer<T>> = self
            .observers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for observer in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| (observer.callback)(value)));
            if let Err(panic) = outcome {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    observer = observer.id,
                    kind = self.label,
                    panic = panic_message(panic.as_ref()),
                    "observer panicked"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = (panic_message(panic.as_ref()), self.label);
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
