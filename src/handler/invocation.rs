//! Values handed to a capability when it runs.

use crate::signature::{HandlerCapability, MethodSignature, ParameterRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An error raised by the intercepted call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thrown {
    pub type_name: String,
    pub message: String,
}

impl Thrown {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// One parameter slot of a capability, filled for a specific call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    /// Positional argument of the intercepted call.
    Arg(&'a Value),
    /// Return value, or `Value::Null` when the call threw.
    Returned(&'a Value),
    /// The error raised by the call, if any.
    Thrown(Option<&'a Thrown>),
}

/// Outcome of the intercepted call, known only at exit.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome<'a> {
    Entry,
    Exit {
        returned: &'a Value,
        thrown: Option<&'a Thrown>,
    },
}

static NULL: Value = Value::Null;

/// Arguments of a single capability invocation, laid out in the capability's
/// declared parameter order.
#[derive(Debug)]
pub struct Invocation<'a> {
    method: &'a MethodSignature,
    slots: Vec<Slot<'a>>,
}

impl<'a> Invocation<'a> {
    /// Lay out `args` and the call outcome into the capability's slots.
    pub(crate) fn build(
        method: &'a MethodSignature,
        capability: &HandlerCapability,
        args: &'a [Value],
        outcome: Outcome<'a>,
    ) -> Result<Self, String> {
        let mut slots = Vec::with_capacity(capability.parameters.len());
        let mut next_arg = 0;

        for parameter in &capability.parameters {
            let slot = match (parameter.role, outcome) {
                (ParameterRole::Plain, _) => {
                    let arg = args.get(next_arg).ok_or_else(|| {
                        format!(
                            "call to {} supplied {} argument(s), capability needs more",
                            method,
                            args.len()
                        )
                    })?;
                    next_arg += 1;
                    Slot::Arg(arg)
                }
                (ParameterRole::Returned, Outcome::Exit { returned, thrown }) => {
                    if thrown.is_some() {
                        Slot::Returned(&NULL)
                    } else {
                        Slot::Returned(returned)
                    }
                }
                (ParameterRole::Thrown, Outcome::Exit { thrown, .. }) => Slot::Thrown(thrown),
                (role, Outcome::Entry) => {
                    return Err(format!("{:?} parameter cannot be filled at entry", role));
                }
            };
            slots.push(slot);
        }

        Ok(Self { method, slots })
    }

    /// The intercepted method.
    pub fn method(&self) -> &MethodSignature {
        self.method
    }

    pub fn slots(&self) -> &[Slot<'a>] {
        &self.slots
    }

    /// Slot at `index` in declared parameter order.
    pub fn slot(&self, index: usize) -> Option<Slot<'a>> {
        self.slots.get(index).copied()
    }

    /// The plain arguments, in order.
    pub fn args(&self) -> impl Iterator<Item = &'a Value> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Arg(value) => Some(*value),
            _ => None,
        })
    }

    /// The `index`-th plain argument.
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args().nth(index)
    }

    /// Value of the first returned slot.
    pub fn returned(&self) -> Option<&'a Value> {
        self.slots.iter().find_map(|slot| match slot {
            Slot::Returned(value) => Some(*value),
            _ => None,
        })
    }

    /// Value of the first thrown slot.
    pub fn thrown(&self) -> Option<&'a Thrown> {
        self.slots.iter().find_map(|slot| match slot {
            Slot::Thrown(thrown) => *thrown,
            _ => None,
        })
    }
}
