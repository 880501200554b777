//! Name → handler routing with lifecycle gating.
//!
//! Routes are registered once when the controller is built. Each carries the
//! [`Requirement`] checked before its handler runs. Handler failures, panics
//! included, come back as a [`CommandError`] so every command still gets a
//! reply.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::Value;

use crate::camera::TransitionRequest;
use crate::controller::State;
use crate::error::CommandError;
use crate::handlers::Ctx;
use crate::lifecycle::Requirement;
use crate::protocol::Command;

pub(crate) type Handler = fn(&mut Ctx<'_>, &Value) -> Result<Outcome, CommandError>;

/// Completion the controller finishes after the handler returns.
#[derive(Debug)]
pub enum Deferred {
    /// Resolve once the engine signals map-ready.
    MapReady,
    Transition(TransitionRequest),
    LastLocation,
    AmbientCache,
}

#[derive(Debug)]
pub enum Outcome {
    Value(Value),
    Deferred(Deferred),
}

impl Outcome {
    pub fn empty() -> Self {
        Self::Value(Value::Null)
    }
}

impl From<Value> for Outcome {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

#[derive(Clone, Copy)]
struct Route {
    requirement: Requirement,
    handler: Handler,
}

#[derive(Default)]
pub struct Router {
    routes: HashMap<&'static str, Route>,
}

impl Router {
    pub(crate) fn route(&mut self, name: &'static str, requirement: Requirement, handler: Handler) {
        let previous = self.routes.insert(
            name,
            Route {
                requirement,
                handler,
            },
        );
        debug_assert!(previous.is_none(), "duplicate route {name}");
    }

    pub fn knows(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn requirement(&self, name: &str) -> Option<Requirement> {
        self.routes.get(name).map(|r| r.requirement)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn dispatch(
        &self,
        state: &mut State,
        command: &Command,
    ) -> Result<Outcome, CommandError> {
        if state.lifecycle.is_disposed() {
            return Err(CommandError::disposed());
        }
        let Some(route) = self.routes.get(command.method.as_str()).copied() else {
            return Err(CommandError::unimplemented(&command.method));
        };
        let mut ctx = state.ctx(route.requirement)?;
        let args = &command.arguments;
        match catch_unwind(AssertUnwindSafe(|| (route.handler)(&mut ctx, args))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(method = %command.method, %message, "handler panicked");
                Err(CommandError::engine(message))
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
