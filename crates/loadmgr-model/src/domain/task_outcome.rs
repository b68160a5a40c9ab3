use serde::{Deserialize, Serialize};

/// How a single executor task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskOutcome {
    /// Worker returned `Ok`.
    Succeeded,
    /// Worker returned an error.
    Failed,
    /// Worker panicked; the panic was converted into an error.
    Panicked,
}

impl TaskOutcome {
    /// Label value for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Succeeded => "succeeded",
            TaskOutcome::Failed => "failed",
            TaskOutcome::Panicked => "panicked",
        }
    }

    /// Returns `true` for outcomes that count as errors.
    pub fn is_error(&self) -> bool {
        !matches!(self, TaskOutcome::Succeeded)
    }
}
