//! SubscriberRegistry - ordered, copy-on-write set of handlers
//!
//! Writers replace the whole handler list under a short write lock; readers
//! clone the current `Arc`. A snapshot never changes after it is taken, so
//! dispatch can iterate it without holding any lock while handlers run.

use std::sync::{Arc, PoisonError, RwLock};

use contracts::{DuplicatePolicy, MessageHandler};
use tracing::debug;

/// Immutable view of the registry at one instant
pub type Snapshot = Arc<Vec<Arc<dyn MessageHandler>>>;

/// Thread-safe ordered handler registry
pub struct SubscriberRegistry {
    handlers: RwLock<Snapshot>,
    duplicates: DuplicatePolicy,
}

impl SubscriberRegistry {
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self {
            handlers: RwLock::new(Arc::new(Vec::new())),
            duplicates,
        }
    }

    /// Append a handler
    ///
    /// Returns false only when the handler is already registered and the
    /// policy rejects duplicates.
    pub fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> bool {
        let mut guard = self.handlers.write().unwrap_or_else(PoisonError::into_inner);

        if self.duplicates == DuplicatePolicy::Reject
            && guard.iter().any(|h| same_handler(h, &handler))
        {
            debug!(handler = handler.name(), "Duplicate subscription refused");
            return false;
        }

        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(handler);
        *guard = Arc::new(next);
        true
    }

    /// Remove the first registration of `handler`
    ///
    /// Unknown handlers are a no-op; returns whether anything was removed.
    pub fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool {
        let mut guard = self.handlers.write().unwrap_or_else(PoisonError::into_inner);

        let Some(position) = guard.iter().position(|h| same_handler(h, handler)) else {
            return false;
        };

        let mut next: Vec<_> = guard.iter().cloned().collect();
        next.remove(position);
        *guard = Arc::new(next);
        true
    }

    /// Current handlers in registration order
    pub fn snapshot(&self) -> Snapshot {
        let guard = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

/// Identity comparison on the allocation, ignoring vtable pointers
fn same_handler(a: &Arc<dyn MessageHandler>, b: &Arc<dyn MessageHandler>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
