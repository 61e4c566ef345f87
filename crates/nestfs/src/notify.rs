//! Change notification: a per-prefix subscription registry.
//!
//! The facade announces one event per successful mutation. Delivery is
//! synchronous and in registration order; a subscriber fires when its
//! prefix prefix-matches the event path (for renames, either endpoint).
//! Ordering between independent subscribers is not part of the contract.

use std::sync::{Arc, Mutex, Weak};

use crate::path;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
    Rename,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::Rename => "rename",
        };
        write!(f, "{}", s)
    }
}

/// A single mutation announcement. `old_path` is set only for renames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: String,
    pub old_path: Option<String>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
        }
    }

    pub fn rename(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Rename,
            path: path.into(),
            old_path: Some(old_path.into()),
        }
    }

    fn matches(&self, prefix: &str) -> bool {
        path::is_prefix_of(prefix, &self.path)
            || self
                .old_path
                .as_deref()
                .is_some_and(|old| path::is_prefix_of(prefix, old))
    }
}

pub type WatchCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Subscription {
    id: u64,
    prefix: String,
    callback: WatchCallback,
}

#[derive(Default)]
struct Registry {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

/// Shared subscription registry, cloned into every facade handle.
#[derive(Clone, Default)]
pub struct Notifier(Arc<Mutex<Registry>>);

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every event under `prefix` (which must
    /// already be normalized). Dropping the handle does not unsubscribe;
    /// call [`WatchHandle::unsubscribe`].
    pub fn subscribe(&self, prefix: &str, callback: WatchCallback) -> WatchHandle {
        let mut registry = lock(&self.0);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscriptions.push(Subscription {
            id,
            prefix: prefix.to_string(),
            callback,
        });
        WatchHandle {
            id,
            registry: Arc::downgrade(&self.0),
        }
    }

    /// Deliver an event to every matching subscriber, registration order.
    ///
    /// Matching callbacks are snapshotted before any is invoked, so a
    /// callback may subscribe or unsubscribe without deadlocking; such
    /// changes take effect from the next event.
    pub fn notify(&self, event: &ChangeEvent) {
        let matching: Vec<WatchCallback> = {
            let registry = lock(&self.0);
            registry
                .subscriptions
                .iter()
                .filter(|s| event.matches(&s.prefix))
                .map(|s| s.callback.clone())
                .collect()
        };
        for callback in matching {
            callback(event);
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        lock(&self.0).subscriptions.len()
    }
}

/// Undoes a subscription.
#[derive(Debug)]
pub struct WatchHandle {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl WatchHandle {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscriptions.retain(|s| s.id != self.id);
        }
    }
}

// A poisoned registry only means a callback panicked mid-delivery; the
// subscription list itself is still coherent.
fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: Arc<AtomicUsize>) -> WatchCallback {
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_prefix_filtering() {
        let notifier = Notifier::new();
        let hits_a = Arc::new(AtomicUsize::new(0));
        let hits_z = Arc::new(AtomicUsize::new(0));
        notifier.subscribe("/a", counting(hits_a.clone()));
        notifier.subscribe("/z", counting(hits_z.clone()));

        notifier.notify(&ChangeEvent::new(ChangeKind::Create, "/a/b.txt"));

        assert_eq!(hits_a.load(Ordering::SeqCst), 1);
        assert_eq!(hits_z.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rename_matches_both_endpoints() {
        let notifier = Notifier::new();
        let hits_old = Arc::new(AtomicUsize::new(0));
        let hits_new = Arc::new(AtomicUsize::new(0));
        notifier.subscribe("/old", counting(hits_old.clone()));
        notifier.subscribe("/new", counting(hits_new.clone()));

        notifier.notify(&ChangeEvent::rename("/old/dir", "/new/dir"));

        assert_eq!(hits_old.load(Ordering::SeqCst), 1);
        assert_eq!(hits_new.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let notifier = Notifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = notifier.subscribe("/a", counting(hits.clone()));

        notifier.notify(&ChangeEvent::new(ChangeKind::Create, "/a/one"));
        handle.unsubscribe();
        notifier.notify(&ChangeEvent::new(ChangeKind::Create, "/a/two"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
