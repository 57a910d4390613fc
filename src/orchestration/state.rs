//! Saga state tracking for a single publish or unpublish request
//!
//! Nothing here is persisted: the publish status row is the only durable
//! record. The transition history is returned to the caller in the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress of a publication saga
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    Unclaimed,
    Claimed,
    ExternallyPublished,
    ManifestWritten,
    Finalized,
    Completed,
    Failed,
}

impl SagaState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: SagaState,

    pub to: SagaState,

    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Records the states a saga passes through
#[derive(Debug, Clone)]
pub struct SagaTracker {
    current: SagaState,
    transitions: Vec<StateTransition>,
}

impl Default for SagaTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SagaTracker {
    pub fn new() -> Self {
        Self {
            current: SagaState::Unclaimed,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, to: SagaState, detail: Option<String>) {
        debug!(from = ?self.current, to = ?to, "saga transition");

        self.transitions.push(StateTransition {
            from: self.current,
            to,
            timestamp: Utc::now(),
            detail,
        });
        self.current = to;
    }

    pub fn state(&self) -> SagaState {
        self.current
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn into_history(self) -> Vec<StateTransition> {
        self.transitions
    }
}
