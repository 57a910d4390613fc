//! Time bounds for remote calls

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::error::CollectionError;

/// Bounds each remote call of a request by a per-step timeout and, when
/// present, by the request's absolute deadline
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline {
    at: Option<Instant>,
    step_timeout: Duration,
}

impl RequestDeadline {
    pub fn new(at: Option<Instant>, step_timeout: Duration) -> Self {
        Self { at, step_timeout }
    }

    /// Budget available to the next call
    pub fn remaining(&self) -> Duration {
        match self.at {
            Some(at) => self
                .step_timeout
                .min(at.saturating_duration_since(Instant::now())),
            None => self.step_timeout,
        }
    }

    /// Run `call` within the remaining budget
    ///
    /// An exhausted budget fails without starting the call.
    pub async fn run<T, E, F>(&self, operation: &str, call: F) -> Result<T, CollectionError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<CollectionError>,
    {
        bounded(operation, self.remaining(), call).await
    }

    /// Budget for a call that must not be cancelled once started
    ///
    /// Fails without starting when nothing is left. The caller awaits the
    /// call to completion and then asks [`StepBudget::check`] whether it
    /// overran.
    pub fn start(&self, operation: &str) -> Result<StepBudget, CollectionError> {
        let limit = self.remaining();
        if limit.is_zero() {
            return Err(CollectionError::Timeout {
                operation: operation.to_string(),
            });
        }

        Ok(StepBudget {
            operation: operation.to_string(),
            limit,
            started: Instant::now(),
        })
    }
}

/// Time allowance of one uncancellable call
#[derive(Debug, Clone)]
pub struct StepBudget {
    operation: String,
    limit: Duration,
    started: Instant,
}

impl StepBudget {
    /// Timeout when the call took longer than its allowance
    pub fn check(&self) -> Result<(), CollectionError> {
        if self.started.elapsed() > self.limit {
            Err(CollectionError::Timeout {
                operation: self.operation.clone(),
            })
        } else {
            Ok(())
        }
    }
}

/// Run `call`, failing with [`CollectionError::Timeout`] after `limit`
pub async fn bounded<T, E, F>(operation: &str, limit: Duration, call: F) -> Result<T, CollectionError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<CollectionError>,
{
    if limit.is_zero() {
        return Err(CollectionError::Timeout {
            operation: operation.to_string(),
        });
    }

    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(CollectionError::Timeout {
            operation: operation.to_string(),
        }),
    }
}
