// Live status tracker - Which packages are currently streaming
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub type LiveSet = HashSet<String>;

type Listener = Arc<dyn Fn(&LiveSet) + Send + Sync>;

#[derive(Default)]
struct TrackerInner {
    packages: LiveSet,
    next_listener_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Holds the set of live package ids pushed from an external source.
///
/// Listeners run synchronously inside [`LiveStatusTracker::set_live_packages`],
/// after the new set is stored. Only the latest set is kept.
///
/// Concurrent pushes are serialised, so every listener sees the sets in
/// the order they were stored.
#[derive(Clone, Default)]
pub struct LiveStatusTracker {
    inner: Arc<Mutex<TrackerInner>>,
    notify: Arc<Mutex<()>>,
}

/// Unsubscribes its listener when dropped.
pub struct Subscription {
    id: u64,
    tracker: Weak<Mutex<TrackerInner>>,
}

impl LiveStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        // A listener panicking must not wedge the tracker.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_live(&self, package_id: &str) -> bool {
        self.lock().packages.contains(package_id)
    }

    pub fn live_packages(&self) -> LiveSet {
        self.lock().packages.clone()
    }

    /// Replace the live set and notify every listener.
    pub fn set_live_packages<I>(&self, packages: I)
    where
        I: IntoIterator<Item = String>,
    {
        // Held across store and notify; listeners must not push themselves.
        let _ordering = self.notify.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (snapshot, listeners) = {
            let mut inner = self.lock();
            inner.packages = packages.into_iter().collect();
            let listeners: Vec<Listener> = inner.listeners.values().cloned().collect();
            (inner.packages.clone(), listeners)
        };

        tracing::debug!("Live set changed: {} packages live", snapshot.len());

        for listener in listeners {
            listener(&snapshot);
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LiveSet) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.insert(id, Arc::new(listener));

        Subscription {
            id,
            tracker: Arc::downgrade(&self.inner),
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.tracker.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.listeners.remove(&self.id);
        }
    }
}
