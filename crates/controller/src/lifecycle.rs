//! Controller phase tracking and command gating.

use engine::{MapEngine, StyleRequestId};
use tracing::{info, warn};

use crate::error::CommandError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    AwaitingStyle,
    Ready,
    Disposed,
}

/// What a command needs before its handler may run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Runs in any live phase.
    None,
    /// The engine has signalled map-ready.
    Map,
    /// A style is loaded.
    Style,
}

#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    map_ready: bool,
    latest_style: Option<StyleRequestId>,
    next_id: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            map_ready: false,
            latest_style: None,
            next_id: 1,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_map_ready(&self) -> bool {
        self.map_ready
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == Phase::Disposed
    }

    pub fn is_style_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Returns `false` when the signal is a duplicate or arrives after dispose.
    pub fn on_map_ready(&mut self) -> bool {
        if self.map_ready || self.is_disposed() {
            return false;
        }
        self.map_ready = true;
        info!("map ready");
        true
    }

    /// Allocates the id for a new style load and drops back to
    /// `AwaitingStyle`. Any load still in flight is superseded.
    pub fn begin_style_load(&mut self) -> StyleRequestId {
        let id = StyleRequestId(self.next_id);
        self.next_id += 1;
        if let Some(prev) = self.latest_style.replace(id)
            && self.phase == Phase::AwaitingStyle
        {
            info!(superseded = prev.0, request = id.0, "style load superseded");
        }
        if !self.is_disposed() {
            self.phase = Phase::AwaitingStyle;
        }
        id
    }

    /// Returns `true` when `id` is the latest request and the controller moved
    /// to `Ready`. Stale completions are discarded.
    pub fn on_style_loaded(&mut self, id: StyleRequestId) -> bool {
        if self.is_disposed() {
            return false;
        }
        if self.latest_style != Some(id) {
            warn!(request = id.0, latest = ?self.latest_style.map(|l| l.0), "discarding stale style load");
            return false;
        }
        if self.phase == Phase::Ready {
            warn!(request = id.0, "duplicate style-loaded signal");
            return false;
        }
        self.phase = Phase::Ready;
        info!(request = id.0, "style loaded");
        true
    }

    /// Returns `true` the first time only.
    pub fn dispose(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.phase = Phase::Disposed;
        info!("controller disposed");
        true
    }

    pub fn check(&self, requirement: Requirement) -> Result<(), CommandError> {
        if self.is_disposed() {
            return Err(CommandError::disposed());
        }
        match requirement {
            Requirement::None => Ok(()),
            Requirement::Map if self.map_ready => Ok(()),
            Requirement::Map => Err(CommandError::map_not_ready()),
            Requirement::Style if self.phase == Phase::Ready => Ok(()),
            Requirement::Style => Err(CommandError::style_not_ready()),
        }
    }
}

/// Engine access granted by the gate for one command.
///
/// Holding one only proves that `requirement` was met when it was acquired.
/// A `Requirement::None` grant may exist before the map is ready.
pub struct EngineAccess<'a> {
    engine: &'a mut dyn MapEngine,
    requirement: Requirement,
}

impl<'a> EngineAccess<'a> {
    pub(crate) fn acquire(
        lifecycle: &Lifecycle,
        requirement: Requirement,
        engine: &'a mut dyn MapEngine,
    ) -> Result<Self, CommandError> {
        lifecycle.check(requirement)?;
        Ok(Self {
            engine,
            requirement,
        })
    }

    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    pub fn engine(&mut self) -> &mut dyn MapEngine {
        &mut *self.engine
    }
}
