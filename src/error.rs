//! Engine error taxonomy.
//!
//! Every failure mode the engine can surface has a distinct variant so
//! callers can tell a rejected submission apart from a per-email failure.
//! Optional-step failures never become errors — the interpreter absorbs
//! them locally and records a warning in the execution log instead.

use thiserror::Error;

/// Errors surfaced by the subscription engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The submission was malformed (empty email list, invalid address).
    /// Rejected before any task exists.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The URL matches no registered site adapter. Rejected before any
    /// task exists.
    #[error("unsupported website URL: {0}")]
    UnsupportedSite(String),

    /// No candidate target for a required step became visible within the
    /// step timeout.
    #[error("step {step} failed to resolve a target: {message}")]
    StepResolution { step: usize, message: String },

    /// A required step's action kept failing after exhausting its retries.
    #[error("step {step} action failed after {attempts} attempt(s): {message}")]
    StepExecution {
        step: usize,
        attempts: u32,
        message: String,
    },

    /// The browser (or its proxy) could not be launched. Scoped to the
    /// single email being processed.
    #[error("browser session launch failed: {0}")]
    SessionLaunch(String),

    /// The adapter homepage failed to load.
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// No task exists under the queried id.
    #[error("task not found: {0}")]
    TaskNotFound(String),
}

impl EngineError {
    /// Whether this error rejects a submission outright (no task is ever
    /// created) as opposed to costing one email inside a running task.
    pub fn rejects_submission(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_) | EngineError::UnsupportedSite(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_errors_classified() {
        assert!(EngineError::Validation("empty".into()).rejects_submission());
        assert!(EngineError::UnsupportedSite("https://example.com".into()).rejects_submission());
        assert!(!EngineError::SessionLaunch("boom".into()).rejects_submission());
        assert!(!EngineError::StepResolution {
            step: 2,
            message: "no candidate visible".into()
        }
        .rejects_submission());
    }

    #[test]
    fn test_display_includes_context() {
        let err = EngineError::StepExecution {
            step: 3,
            attempts: 2,
            message: "click intercepted".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("step 3"));
        assert!(msg.contains("2 attempt(s)"));
        assert!(msg.contains("click intercepted"));
    }
}
