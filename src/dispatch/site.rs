//! Per call-site resolution results and their cache.

use crate::handler::HandlerType;
use crate::signature::MethodSignature;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A handler resolved for one call site, with the capabilities that match it.
pub(crate) struct Binding<C> {
    pub(crate) handler_name: String,
    pub(crate) skip_nested_calls: bool,
    pub(crate) handler: Arc<HandlerType<C>>,
    pub(crate) before: Vec<usize>,
    pub(crate) after: Vec<usize>,
}

pub(crate) type Bindings<C> = Arc<[Arc<Binding<C>>]>;

/// Resolution results keyed by target type, then method signature.
pub(crate) struct SiteCache<C> {
    sites: RwLock<HashMap<String, HashMap<MethodSignature, Bindings<C>>>>,
}

impl<C> SiteCache<C> {
    pub(crate) fn new() -> Self {
        Self {
            sites: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, target_type: &str, method: &MethodSignature) -> Option<Bindings<C>> {
        self.sites
            .read()
            .get(target_type)
            .and_then(|methods| methods.get(method))
            .cloned()
    }

    pub(crate) fn insert(&self, target_type: &str, method: &MethodSignature, bindings: Bindings<C>) {
        self.sites
            .write()
            .entry(target_type.to_string())
            .or_default()
            .insert(method.clone(), bindings);
    }

    pub(crate) fn len(&self) -> usize {
        self.sites.read().values().map(HashMap::len).sum()
    }

    pub(crate) fn clear(&self) {
        self.sites.write().clear();
    }
}
