//! Compensating actions for multi-step applies.
//!
//! Each completed create registers an undo step. If a later step fails, the
//! undo steps run newest first. Undo futures are lazy and only run on abort.

use std::future::Future;
use std::pin::Pin;

use crate::errors::AppError;

type Compensation = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send>>;

/// Undo log for one apply.
#[derive(Default)]
pub struct Saga {
    steps: Vec<(String, Compensation)>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register how to undo something that was just created.
    pub fn record<F>(&mut self, description: impl Into<String>, undo: F)
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        self.steps.push((description.into(), Box::pin(undo)));
    }

    /// The apply succeeded; forget the undo steps.
    pub fn commit(self) {
        drop(self.steps);
    }

    /// Undo every recorded step in reverse order and return the error to report.
    ///
    /// Returns `cause` when the rollback is clean, otherwise a
    /// [`AppError::PartialApply`] naming what was left behind.
    pub async fn abort(self, cause: AppError) -> AppError {
        if self.steps.is_empty() {
            return cause;
        }

        tracing::warn!(
            "Apply failed ({}), rolling back {} step(s)",
            cause,
            self.steps.len()
        );

        let mut leftover = Vec::new();
        for (description, undo) in self.steps.into_iter().rev() {
            match undo.await {
                Ok(()) => tracing::debug!("Rolled back {}", description),
                Err(e) => {
                    tracing::error!("Failed to roll back {}: {}", description, e);
                    leftover.push(description);
                }
            }
        }

        if leftover.is_empty() {
            cause
        } else {
            AppError::PartialApply {
                message: format!(
                    "Apply failed ({}) and {} created entit{} could not be removed",
                    cause.message(),
                    leftover.len(),
                    if leftover.len() == 1 { "y" } else { "ies" }
                ),
                leftover,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_abort_runs_in_reverse_and_returns_cause() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new();

        for name in ["project", "room 1", "room 2"] {
            let log = Arc::clone(&log);
            saga.record(name, async move {
                log.lock().unwrap().push(name);
                Ok(())
            });
        }

        let err = saga
            .abort(AppError::Database("disk full".to_string()))
            .await;

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(*log.lock().unwrap(), vec!["room 2", "room 1", "project"]);
    }

    #[tokio::test]
    async fn test_failed_undo_reports_partial_apply() {
        let mut saga = Saga::new();
        saga.record("project p1", async { Ok(()) });
        saga.record("room r1", async {
            Err(AppError::Database("locked".to_string()))
        });

        let err = saga.abort(AppError::Internal("boom".to_string())).await;

        match err {
            AppError::PartialApply { leftover, message } => {
                assert_eq!(leftover, vec!["room r1".to_string()]);
                assert!(message.contains("boom"));
            }
            other => panic!("expected partial apply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_commit_never_runs_undo() {
        let ran = Arc::new(Mutex::new(false));
        let mut saga = Saga::new();
        let flag = Arc::clone(&ran);
        saga.record("room", async move {
            *flag.lock().unwrap() = true;
            Ok(())
        });

        saga.commit();
        assert!(!*ran.lock().unwrap());
    }
}
