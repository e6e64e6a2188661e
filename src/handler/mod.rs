//! In-process handler types.
//!
//! A `HandlerType` is the runtime counterpart of a manifest: a constructor
//! taking the shared collaborator context, plus one closure per declared
//! capability. Closures are type-erased once, when the handler type is
//! built, so dispatch never looks anything up by name.
//!
//! ```
//! use hookscope::handler::HandlerType;
//! use hookscope::metrics::MetricsRegistry;
//! use hookscope::signature::Parameter;
//! use std::sync::Arc;
//!
//! struct RequestCounter {
//!     metrics: Arc<MetricsRegistry>,
//! }
//!
//! let handler = HandlerType::<MetricsRegistry>::builder("com.example.RequestCounter", |metrics| {
//!     Ok(RequestCounter { metrics: metrics.clone() })
//! })
//! .instruments(["com.example.Servlet"])
//! .before(["service"], vec![Parameter::plain("com.example.Request")], |hook: &mut RequestCounter, _call| {
//!     hook.metrics.increment("requests_total", &[]);
//!     Ok(())
//! })
//! .build()
//! .unwrap();
//!
//! assert_eq!(handler.capabilities().count(), 1);
//! ```

mod invocation;
mod resolver;

pub use invocation::{Invocation, Slot, Thrown};
pub(crate) use invocation::Outcome;
pub use resolver::{HandlerResolver, StaticResolver};

use crate::error::{HookError, Result};
use crate::extract::{EntryPointManifest, HandlerManifest, ParameterManifest};
use crate::metadata::HandlerMetadata;
use crate::signature::{CapabilityKind, HandlerCapability, MethodSignature, Parameter, canonical_type_name};
use std::any::Any;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

type ConstructFn<C> = Arc<dyn Fn(&Arc<C>) -> anyhow::Result<Box<dyn Any>> + Send + Sync>;
type CapabilityFn = Arc<dyn Fn(&mut dyn Any, &Invocation<'_>) -> anyhow::Result<()> + Send + Sync>;

/// A capability together with the closure that runs it.
pub(crate) struct BoundCapability {
    pub(crate) capability: HandlerCapability,
    pub(crate) call: CapabilityFn,
}

/// A resolvable handler: constructor plus bound capabilities.
pub struct HandlerType<C> {
    name: String,
    target_types: BTreeSet<String>,
    skip_nested_calls: bool,
    construct: ConstructFn<C>,
    capabilities: Vec<BoundCapability>,
}

impl<C> std::fmt::Debug for HandlerType<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerType")
            .field("name", &self.name)
            .field("target_types", &self.target_types)
            .field("skip_nested_calls", &self.skip_nested_calls)
            .field("capabilities", &self.capabilities().collect::<Vec<_>>())
            .finish()
    }
}

impl<C: 'static> HandlerType<C> {
    /// Start building a handler whose instances are of type `H`.
    pub fn builder<H, F>(name: impl Into<String>, construct: F) -> HandlerTypeBuilder<C, H>
    where
        H: 'static,
        F: Fn(&Arc<C>) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        HandlerTypeBuilder {
            name: name.into(),
            target_types: Vec::new(),
            skip_nested_calls: true,
            construct: erase_constructor(construct),
            pending: Vec::new(),
            _instance: PhantomData,
        }
    }
}

impl<C> HandlerType<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skip_nested_calls(&self) -> bool {
        self.skip_nested_calls
    }

    pub fn target_types(&self) -> &BTreeSet<String> {
        &self.target_types
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &HandlerCapability> {
        self.capabilities.iter().map(|bound| &bound.capability)
    }

    pub(crate) fn bound(&self, index: usize) -> &BoundCapability {
        &self.capabilities[index]
    }

    /// Indices of capabilities of `kind` that exactly match `method`.
    pub(crate) fn matching(&self, kind: CapabilityKind, method: &MethodSignature) -> Vec<usize> {
        self.capabilities
            .iter()
            .enumerate()
            .filter(|(_, bound)| bound.capability.kind == kind && bound.capability.matches(method))
            .map(|(index, _)| index)
            .collect()
    }

    /// Construct a fresh instance.
    pub(crate) fn construct(&self, context: &Arc<C>) -> anyhow::Result<Box<dyn Any>> {
        (self.construct)(context)
    }

    /// Metadata equivalent to what extraction produces from `manifest()`.
    pub fn metadata(&self) -> Option<HandlerMetadata> {
        HandlerMetadata::from_capabilities(
            self.name.clone(),
            self.target_types.clone(),
            self.skip_nested_calls,
            self.capabilities(),
        )
    }

    /// Manifest describing this handler, for the packaging step.
    pub fn manifest(&self) -> HandlerManifest {
        let entry_points = self
            .capabilities()
            .map(|cap| {
                let names: Vec<String> = cap.bound_names.iter().cloned().collect();
                let (before, after) = match cap.kind {
                    CapabilityKind::Before => (names, Vec::new()),
                    CapabilityKind::After => (Vec::new(), names),
                };
                EntryPointManifest {
                    name: None,
                    before,
                    after,
                    parameters: cap
                        .parameters
                        .iter()
                        .map(|p| ParameterManifest {
                            type_name: p.type_name.clone(),
                            role: p.role,
                        })
                        .collect(),
                }
            })
            .collect();

        HandlerManifest {
            handler: self.name.clone(),
            instruments: self.target_types.iter().cloned().collect(),
            skip_nested_calls: self.skip_nested_calls,
            extends: None,
            entry_points,
        }
    }
}

fn erase_constructor<C, H, F>(construct: F) -> ConstructFn<C>
where
    C: 'static,
    H: 'static,
    F: Fn(&Arc<C>) -> anyhow::Result<H> + Send + Sync + 'static,
{
    Arc::new(move |context: &Arc<C>| Ok(Box::new(construct(context)?) as Box<dyn Any>))
}

fn erase_capability<H, F>(f: F) -> CapabilityFn
where
    H: 'static,
    F: Fn(&mut H, &Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(move |instance: &mut dyn Any, invocation: &Invocation<'_>| {
        let instance = instance
            .downcast_mut::<H>()
            .ok_or_else(|| anyhow::anyhow!("instance is not a {}", std::any::type_name::<H>()))?;
        f(instance, invocation)
    })
}

struct PendingCapability {
    kind: CapabilityKind,
    names: Vec<String>,
    parameters: Vec<Parameter>,
    call: CapabilityFn,
}

/// Builder for `HandlerType`; `H` is the instance type.
pub struct HandlerTypeBuilder<C, H> {
    name: String,
    target_types: Vec<String>,
    skip_nested_calls: bool,
    construct: ConstructFn<C>,
    pending: Vec<PendingCapability>,
    _instance: PhantomData<fn() -> H>,
}

impl<C, H: 'static> HandlerTypeBuilder<C, H> {
    /// Types this handler observes.
    pub fn instruments<I, S>(mut self, target_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_types
            .extend(target_types.into_iter().map(Into::into));
        self
    }

    /// Whether nested calls on the same thread are hidden (default true).
    pub fn skip_nested_calls(mut self, skip: bool) -> Self {
        self.skip_nested_calls = skip;
        self
    }

    /// Add a Before capability.
    pub fn before<I, S, F>(self, names: I, parameters: Vec<Parameter>, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut H, &Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.capability(CapabilityKind::Before, names, parameters, f)
    }

    /// Add an After capability.
    pub fn after<I, S, F>(self, names: I, parameters: Vec<Parameter>, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut H, &Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.capability(CapabilityKind::After, names, parameters, f)
    }

    fn capability<I, S, F>(
        mut self,
        kind: CapabilityKind,
        names: I,
        parameters: Vec<Parameter>,
        f: F,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut H, &Invocation<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pending.push(PendingCapability {
            kind,
            names: names.into_iter().map(Into::into).collect(),
            parameters,
            call: erase_capability(f),
        });
        self
    }

    /// Validate declarations and produce the handler type.
    pub fn build(self) -> Result<HandlerType<C>> {
        if self.name.trim().is_empty() {
            return Err(HookError::Manifest("handler name is empty".to_string()));
        }

        let target_types = self
            .target_types
            .iter()
            .map(|t| canonical_type_name(t))
            .collect::<Result<BTreeSet<_>>>()?;

        let capabilities = self
            .pending
            .into_iter()
            .map(|pending| {
                Ok(BoundCapability {
                    capability: HandlerCapability::new(
                        pending.kind,
                        pending.names,
                        pending.parameters,
                    )?,
                    call: pending.call,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(HandlerType {
            name: self.name,
            target_types,
            skip_nested_calls: self.skip_nested_calls,
            construct: self.construct,
            capabilities,
        })
    }
}
