//! RAII release of a cached instance.

use super::LifecycleCache;

/// Removes a handler instance from the current thread's cache when dropped.
///
/// Used on exit so the instance is released even if an After capability
/// fails or panics.
#[derive(Debug)]
pub struct ReleaseGuard<'a> {
    cache: &'a LifecycleCache,
    handler: &'a str,
    released: bool,
}

impl<'a> ReleaseGuard<'a> {
    pub(super) fn new(cache: &'a LifecycleCache, handler: &'a str) -> Self {
        Self {
            cache,
            handler,
            released: false,
        }
    }

    /// Release now instead of at end of scope.
    pub fn release(mut self) {
        self.released = true;
        self.cache.release(self.handler);
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.cache.release(self.handler);
        }
    }
}
