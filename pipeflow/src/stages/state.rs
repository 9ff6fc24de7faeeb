//! Stage lifecycle states.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The lifecycle state of a running stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Stage is reading and emitting values.
    #[default]
    Running,
    /// Upstream closed; the stage is flushing what it holds.
    Draining,
    /// The cancellation token fired.
    Cancelled,
    /// The stage task exited and released its output.
    Closed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl StageState {
    /// Returns true once the stage task has exited.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Running, Self::Draining | Self::Cancelled | Self::Closed)
            | (Self::Draining, Self::Cancelled | Self::Closed)
            | (Self::Cancelled, Self::Closed) => true,
            _ => false,
        }
    }
}

/// Shared view of one stage's state, readable from its output sequence.
#[derive(Debug, Clone)]
pub struct StageMonitor {
    name: Arc<str>,
    state: Arc<RwLock<StageState>>,
}

impl StageMonitor {
    /// Creates a monitor for a stage that is starting.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(RwLock::new(StageState::Running)),
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> StageState {
        *self.state.read()
    }

    /// Moves to `next` if the transition is legal.
    ///
    /// Returns false and leaves the state untouched otherwise.
    pub fn transition(&self, next: StageState) -> bool {
        let mut state = self.state.write();
        if state.can_transition_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }
}
