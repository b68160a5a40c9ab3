use thiserror::Error;

/// Aggregated failure of an executor run.
///
/// A run reports at most one error. When several tasks fail, which one is returned depends on completion order and is not deterministic; only "some error iff something failed or the run was cancelled" holds.
#[derive(Debug, Error)]
pub enum RunError<E> {
    /// Error returned by the worker, passed through unchanged.
    #[error("task failed: {0}")]
    Task(#[source] E),

    /// Worker panicked; the panic was caught at the task boundary.
    ///
    /// `backtrace` is recorded where the panic was raised.
    #[error("task panicked: {message}")]
    Panicked { message: String, backtrace: String },

    /// Caller's context was cancelled before the run completed.
    #[error("run cancelled")]
    Cancelled,
}

impl<E> RunError<E> {
    /// Worker error, if this is one.
    pub fn task_error(&self) -> Option<&E> {
        match self {
            RunError::Task(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_task_error(self) -> Option<E> {
        match self {
            RunError::Task(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled)
    }

    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, RunError::Panicked { .. })
    }
}

/// Failure of the run-context helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("no metadata available in context")]
    MissingMetadata,
}
