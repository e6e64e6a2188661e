//! Call dispatch.
//!
//! The instrumentation mechanism calls `on_entry` before an intercepted
//! method body runs and `on_exit` after it completes. In between, the
//! dispatcher decides which handlers apply, manages their per-thread
//! instances, and runs their entry points.
//!
//! # Matching
//!
//! For a call on `target_type` to `method`:
//!
//! 1. Compute the target type's ancestor closure.
//! 2. Keep registry entries targeting any type in the closure.
//! 3. Keep entries declaring a signature with the same name and arity.
//! 4. Resolve the handler and keep it only if one of its capabilities
//!    matches the parameter types exactly.
//!
//! Results of steps 1-4 are cached per (target type, method) once every
//! candidate has resolved.
//!
//! # Failure isolation
//!
//! Resolution, construction and invocation failures (including panics) are
//! sent to the `DiagnosticSink` and never reach the caller. A failing handler
//! does not prevent other handlers from running.

mod diagnostics;
mod hierarchy;
mod site;

pub use diagnostics::{CollectingSink, DiagnosticSink, DispatchFailure, FailureKind, TracingSink};
pub use hierarchy::{TypeGraph, TypeHierarchy};

use crate::config::AgentConfig;
use crate::error::Result;
use crate::handler::{HandlerResolver, Invocation, Outcome, Thrown};
use crate::lifecycle::{Instance, LifecycleCache};
use crate::metadata::{HandlerMetadata, Registry};
use crate::signature::{CapabilityKind, MethodSignature};
use serde_json::Value;
use site::{Binding, Bindings, SiteCache};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::Rc;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// One handler taking part in an intercepted call.
pub struct ActiveHandle<C> {
    binding: Arc<Binding<C>>,
    instance: Instance,
    is_recursive: bool,
}

impl<C> ActiveHandle<C> {
    pub fn handler_name(&self) -> &str {
        &self.binding.handler_name
    }

    /// Whether this call re-entered a handler already active on this thread.
    pub fn is_recursive(&self) -> bool {
        self.is_recursive
    }

    /// Whether two handles share the same handler instance.
    pub fn same_instance(&self, other: &ActiveHandle<C>) -> bool {
        Rc::ptr_eq(&self.instance, &other.instance)
    }
}

impl<C> fmt::Debug for ActiveHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveHandle")
            .field("handler", &self.binding.handler_name)
            .field("is_recursive", &self.is_recursive)
            .finish()
    }
}

/// Token returned by `on_entry` that must be passed, unmodified, to `on_exit`.
///
/// Handles are bound to the thread that created them.
#[must_use = "pass the handles to on_exit, or handler instances stay registered on this thread"]
#[derive(Debug)]
pub struct ActiveHandles<C> {
    handles: Vec<ActiveHandle<C>>,
}

impl<C> ActiveHandles<C> {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActiveHandle<C>> {
        self.handles.iter()
    }
}

/// The dispatch engine.
///
/// Built once at startup and shared by reference with every call site.
pub struct Dispatcher<C> {
    registry: Arc<Registry>,
    resolver: Arc<dyn HandlerResolver<C>>,
    hierarchy: Arc<dyn TypeHierarchy>,
    context: Arc<C>,
    diagnostics: Arc<dyn DiagnosticSink>,
    sites: Option<SiteCache<C>>,
    instances: LifecycleCache,
}

/// Builder for `Dispatcher`.
pub struct DispatcherBuilder<C> {
    registry: Arc<Registry>,
    resolver: Arc<dyn HandlerResolver<C>>,
    context: Arc<C>,
    hierarchy: Arc<dyn TypeHierarchy>,
    diagnostics: Arc<dyn DiagnosticSink>,
    cache_dispatch: bool,
}

impl<C: Send + Sync + 'static> DispatcherBuilder<C> {
    /// Extract the registry described by `config` and start a builder over it.
    pub fn from_config(
        config: &AgentConfig,
        resolver: Arc<dyn HandlerResolver<C>>,
        context: Arc<C>,
    ) -> Result<Self> {
        let registry = config.extractor()?.extract(&config.roots)?;
        tracing::info!(
            handlers = registry.len(),
            roots = config.roots.len(),
            "hook registry built"
        );
        Ok(Dispatcher::builder(Arc::new(registry), resolver, context)
            .cache_dispatch(config.cache_dispatch))
    }

    pub fn hierarchy(mut self, hierarchy: Arc<dyn TypeHierarchy>) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn cache_dispatch(mut self, enabled: bool) -> Self {
        self.cache_dispatch = enabled;
        self
    }

    pub fn build(self) -> Dispatcher<C> {
        Dispatcher {
            registry: self.registry,
            resolver: self.resolver,
            hierarchy: self.hierarchy,
            context: self.context,
            diagnostics: self.diagnostics,
            sites: self.cache_dispatch.then(SiteCache::new),
            instances: LifecycleCache::new(),
        }
    }
}

impl<C: Send + Sync + 'static> Dispatcher<C> {
    pub fn builder(
        registry: Arc<Registry>,
        resolver: Arc<dyn HandlerResolver<C>>,
        context: Arc<C>,
    ) -> DispatcherBuilder<C> {
        DispatcherBuilder {
            registry,
            resolver,
            context,
            hierarchy: Arc::new(TypeGraph::new()),
            diagnostics: Arc::new(TracingSink),
            cache_dispatch: true,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    /// Target types and the signatures to intercept on each.
    pub fn instrumented_targets(&self) -> BTreeMap<String, BTreeSet<MethodSignature>> {
        self.registry.instrumented_targets()
    }

    /// Number of call sites with cached resolution results.
    pub fn cached_sites(&self) -> usize {
        self.sites.as_ref().map_or(0, SiteCache::len)
    }

    pub fn clear_cache(&self) {
        if let Some(sites) = &self.sites {
            sites.clear();
        }
    }

    /// Handler instances currently registered on the calling thread.
    pub fn active_instances(&self) -> usize {
        self.instances.active_count()
    }

    /// Called before the body of an intercepted method runs.
    pub fn on_entry(
        &self,
        target_type: &str,
        method: &MethodSignature,
        args: &[Value],
    ) -> ActiveHandles<C> {
        let bindings = self.bindings_for(target_type, method);
        let mut handles = Vec::with_capacity(bindings.len());

        for binding in bindings.iter() {
            let (instance, is_recursive) = match self.instances.active(&binding.handler_name) {
                Some(_) if binding.skip_nested_calls => {
                    tracing::trace!(handler = %binding.handler_name, %method, "skipping nested call");
                    continue;
                }
                Some(existing) => (existing, true),
                None => match self.construct(binding, method) {
                    Some(instance) => {
                        self.instances
                            .register(&binding.handler_name, instance.clone());
                        (instance, false)
                    }
                    None => continue,
                },
            };
            handles.push(ActiveHandle {
                binding: binding.clone(),
                instance,
                is_recursive,
            });
        }

        for handle in &handles {
            self.invoke(handle, CapabilityKind::Before, method, args, Outcome::Entry);
        }

        ActiveHandles { handles }
    }

    /// Called after the body of an intercepted method completed or failed.
    ///
    /// `returned` is ignored when `thrown` is set; capture-return slots then
    /// receive `Value::Null`.
    pub fn on_exit(
        &self,
        handles: ActiveHandles<C>,
        method: &MethodSignature,
        args: &[Value],
        returned: Option<&Value>,
        thrown: Option<&Thrown>,
    ) {
        let outcome = Outcome::Exit {
            returned: returned.unwrap_or(&NULL),
            thrown,
        };

        for handle in handles.handles {
            let _release = (!handle.is_recursive)
                .then(|| self.instances.release_on_drop(&handle.binding.handler_name));
            self.invoke(&handle, CapabilityKind::After, method, args, outcome);
        }
    }

    /// Run `body` as an intercepted call on `target_type`.
    ///
    /// A panic in `body` is reported to handlers as a thrown `panic` and then
    /// resumed.
    pub fn call<F>(
        &self,
        target_type: &str,
        method: &MethodSignature,
        args: &[Value],
        body: F,
    ) -> std::result::Result<Value, Thrown>
    where
        F: FnOnce() -> std::result::Result<Value, Thrown>,
    {
        let handles = self.on_entry(target_type, method, args);
        match catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => {
                self.on_exit(handles, method, args, Some(&value), None);
                Ok(value)
            }
            Ok(Err(thrown)) => {
                self.on_exit(handles, method, args, None, Some(&thrown));
                Err(thrown)
            }
            Err(panic) => {
                let thrown = Thrown::new("panic", panic_message(panic.as_ref()));
                self.on_exit(handles, method, args, None, Some(&thrown));
                resume_unwind(panic)
            }
        }
    }

    fn bindings_for(&self, target_type: &str, method: &MethodSignature) -> Bindings<C> {
        if let Some(sites) = &self.sites
            && let Some(hit) = sites.get(target_type, method)
        {
            return hit;
        }

        let (bindings, complete) = self.resolve_site(target_type, method);
        let bindings: Bindings<C> = bindings.into();
        if complete && let Some(sites) = &self.sites {
            sites.insert(target_type, method, bindings.clone());
        }
        bindings
    }

    /// Steps 1-4 of matching. The flag is false when a candidate failed to
    /// resolve, in which case the result must not be cached.
    fn resolve_site(
        &self,
        target_type: &str,
        method: &MethodSignature,
    ) -> (Vec<Arc<Binding<C>>>, bool) {
        let closure = self.hierarchy.ancestor_closure(target_type);
        let mut complete = true;
        let mut seen = HashSet::new();
        let mut bindings = Vec::new();

        let candidates = self.registry.iter().filter(|metadata| {
            metadata.targets_any(&closure)
                && metadata.declares_shape(&method.name, method.parameter_count())
        });

        for metadata in candidates {
            if !seen.insert(metadata.handler_name.as_str()) {
                continue;
            }
            match self.bind(metadata, method) {
                Ok(Some(binding)) => bindings.push(Arc::new(binding)),
                Ok(None) => {
                    tracing::debug!(
                        handler = %metadata.handler_name,
                        %method,
                        "no capability matches parameter types"
                    );
                }
                Err(err) => {
                    complete = false;
                    self.report(
                        FailureKind::Resolution,
                        &metadata.handler_name,
                        method,
                        err.to_string(),
                    );
                }
            }
        }

        (bindings, complete)
    }

    fn bind(
        &self,
        metadata: &HandlerMetadata,
        method: &MethodSignature,
    ) -> Result<Option<Binding<C>>> {
        let handler = self.resolver.resolve(&metadata.handler_name)?;
        let before = handler.matching(CapabilityKind::Before, method);
        let after = handler.matching(CapabilityKind::After, method);
        if before.is_empty() && after.is_empty() {
            return Ok(None);
        }
        Ok(Some(Binding {
            handler_name: metadata.handler_name.clone(),
            skip_nested_calls: metadata.skip_nested_calls,
            handler,
            before,
            after,
        }))
    }

    fn construct(&self, binding: &Binding<C>, method: &MethodSignature) -> Option<Instance> {
        match catch_unwind(AssertUnwindSafe(|| binding.handler.construct(&self.context))) {
            Ok(Ok(instance)) => Some(Rc::new(RefCell::new(instance))),
            Ok(Err(err)) => {
                self.report(
                    FailureKind::Construction,
                    &binding.handler_name,
                    method,
                    format!("{:#}", err),
                );
                None
            }
            Err(panic) => {
                self.report(
                    FailureKind::Construction,
                    &binding.handler_name,
                    method,
                    format!("constructor panicked: {}", panic_message(panic.as_ref())),
                );
                None
            }
        }
    }

    fn invoke(
        &self,
        handle: &ActiveHandle<C>,
        kind: CapabilityKind,
        method: &MethodSignature,
        args: &[Value],
        outcome: Outcome<'_>,
    ) {
        let binding = &handle.binding;
        let indices = match kind {
            CapabilityKind::Before => &binding.before,
            CapabilityKind::After => &binding.after,
        };

        for &index in indices {
            let bound = binding.handler.bound(index);
            let invocation = match Invocation::build(method, &bound.capability, args, outcome) {
                Ok(invocation) => invocation,
                Err(message) => {
                    self.report(FailureKind::Invocation, &binding.handler_name, method, message);
                    continue;
                }
            };

            let Ok(mut instance) = handle.instance.try_borrow_mut() else {
                self.report(
                    FailureKind::Invocation,
                    &binding.handler_name,
                    method,
                    format!("{} entry point re-entered while its instance is executing", kind),
                );
                continue;
            };

            let result = catch_unwind(AssertUnwindSafe(|| (bound.call)(&mut **instance, &invocation)));
            drop(instance);

            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.report(
                    FailureKind::Invocation,
                    &binding.handler_name,
                    method,
                    format!("{} entry point failed: {:#}", kind, err),
                ),
                Err(panic) => self.report(
                    FailureKind::Invocation,
                    &binding.handler_name,
                    method,
                    format!("{} entry point panicked: {}", kind, panic_message(panic.as_ref())),
                ),
            }
        }
    }

    fn report(
        &self,
        kind: FailureKind,
        handler: &str,
        method: &MethodSignature,
        message: impl Into<String>,
    ) {
        self.diagnostics
            .report(DispatchFailure::new(kind, handler, method.to_string(), message));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
