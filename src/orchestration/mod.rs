//! Orchestration layer for collection publication
//!
//! This module provides the publication saga driver together with its
//! compensation stack, state tracking and per-call deadlines.

pub mod deadline;
pub mod publication;
pub mod saga;
pub mod state;

// Re-export main types for convenience
pub use deadline::{RequestDeadline, StepBudget, bounded};
pub use publication::{
    Collaborators, MAX_BANNER_URLS, OrchestratorOptions, PublicationOrchestrator, PublishReport,
    PublishRequest, RemovalReport,
};
pub use saga::{
    Compensation, CompensationFailure, CompensationStack, Compensator, with_compensation_failures,
};
pub use state::{SagaState, SagaTracker, StateTransition};
