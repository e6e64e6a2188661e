//! Per-thread cache of in-flight handler instances.
//!
//! Each dispatcher owns a `LifecycleCache` scope. Instances live in a
//! thread-local map keyed by scope and then handler name, so a thread only
//! ever sees its own instances and no locking is needed. Lookups borrow the
//! handler name; only registering a new instance allocates a key. An instance stays registered
//! from the outermost entry that created it until that entry's exit.

mod guard;

pub use guard::ReleaseGuard;

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A handler instance shared between the cache and the handles of one thread.
pub type Instance = Rc<RefCell<Box<dyn Any>>>;

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ACTIVE: RefCell<HashMap<u64, HashMap<Box<str>, Instance>>> = RefCell::new(HashMap::new());
}

/// Handle on this dispatcher's slice of the thread-local instance map.
#[derive(Debug)]
pub struct LifecycleCache {
    scope: u64,
}

impl LifecycleCache {
    pub fn new() -> Self {
        Self {
            scope: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Instance of `handler` currently registered on this thread.
    pub fn active(&self, handler: &str) -> Option<Instance> {
        ACTIVE.with(|map| map.borrow().get(&self.scope)?.get(handler).cloned())
    }

    pub fn register(&self, handler: &str, instance: Instance) {
        ACTIVE.with(|map| {
            map.borrow_mut()
                .entry(self.scope)
                .or_default()
                .insert(handler.into(), instance)
        });
    }

    /// Remove `handler`'s instance from this thread.
    pub fn release(&self, handler: &str) {
        let removed = ACTIVE.with(|map| {
            let mut map = map.borrow_mut();
            let handlers = map.get_mut(&self.scope)?;
            let removed = handlers.remove(handler);
            if handlers.is_empty() {
                map.remove(&self.scope);
            }
            removed
        });
        // Dropping runs handler code; do it outside the map borrow.
        drop(removed);
    }

    /// Guard that releases `handler` when dropped.
    pub fn release_on_drop<'a>(&'a self, handler: &'a str) -> ReleaseGuard<'a> {
        ReleaseGuard::new(self, handler)
    }

    /// Number of instances registered on this thread for this scope.
    pub fn active_count(&self) -> usize {
        ACTIVE.with(|map| map.borrow().get(&self.scope).map_or(0, HashMap::len))
    }

    /// Whether this thread still holds an entry for this scope.
    #[cfg(test)]
    fn is_tracked(&self) -> bool {
        ACTIVE.with(|map| map.borrow().contains_key(&self.scope))
    }
}

impl Default for LifecycleCache {
    fn default() -> Self {
        Self::new()
    }
}
