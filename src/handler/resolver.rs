//! Handler resolution.
//!
//! The isolation domain that loads handler code is external; the dispatcher
//! only sees it through `HandlerResolver`.

use super::HandlerType;
use crate::error::{HookError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a handler name to its in-process type.
pub trait HandlerResolver<C>: Send + Sync {
    fn resolve(&self, handler_name: &str) -> Result<Arc<HandlerType<C>>>;
}

/// Resolver over a fixed set of handler types, all living in one domain.
pub struct StaticResolver<C> {
    handlers: HashMap<String, Arc<HandlerType<C>>>,
}

impl<C> StaticResolver<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler type under its name, replacing any previous one.
    pub fn register(&mut self, handler: HandlerType<C>) -> &mut Self {
        self.handlers
            .insert(handler.name().to_string(), Arc::new(handler));
        self
    }

    pub fn with(mut self, handler: HandlerType<C>) -> Self {
        self.register(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C> Default for StaticResolver<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> HandlerResolver<C> for StaticResolver<C> {
    fn resolve(&self, handler_name: &str) -> Result<Arc<HandlerType<C>>> {
        self.handlers
            .get(handler_name)
            .cloned()
            .ok_or_else(|| HookError::Resolution(handler_name.to_string()))
    }
}
