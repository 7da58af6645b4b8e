use thiserror::Error;

/// Error taxonomy for the optimization engine.
///
/// Kinds, not exception hierarchies: each variant maps to one entry in the
/// propagation policy (absorbed locally vs. surfaced to the orchestrator vs.
/// fatal). Callers inspect the variant to decide whether to retry, degrade a
/// single run, or abort the enclosing task.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("scorer error: {0}")]
    Scorer(String),

    #[error("judge panel error: {0}")]
    Panel(String),

    #[error("cancelled")]
    Cancellation,

    #[error("fatal invariant violation: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Absorbed-locally errors degrade a single run/judge rather than
    /// aborting the enclosing step.
    pub fn is_locally_absorbed(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_) | EngineError::Scorer(_)
        )
    }

    /// Surfaces to the orchestrator and aborts the current step.
    pub fn is_surfacing(&self) -> bool {
        matches!(
            self,
            EngineError::Panel(_) | EngineError::Transport(_) | EngineError::Cancellation
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_))
    }

    /// Short categorized label surfaced to callers (timeout, connection,
    /// rate-limit, schema, ...).
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "configuration",
            EngineError::Transport(_) => "connection",
            EngineError::Timeout(_) => "timeout",
            EngineError::Validation(_) => "schema",
            EngineError::Scorer(_) => "scorer",
            EngineError::Panel(_) => "panel",
            EngineError::Cancellation => "cancelled",
            EngineError::Fatal(_) => "fatal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_validation_and_scorer_errors_absorb_locally() {
        assert!(EngineError::Validation("x".into()).is_locally_absorbed());
        assert!(EngineError::Scorer("x".into()).is_locally_absorbed());
        assert!(!EngineError::Panel("x".into()).is_locally_absorbed());
    }

    #[test]
    fn unit_fatal_is_neither_absorbed_nor_merely_surfacing() {
        let err = EngineError::Fatal("phi monotonicity violated".into());
        assert!(err.is_fatal());
        assert!(!err.is_locally_absorbed());
        assert!(!err.is_surfacing());
    }

    #[test]
    fn unit_category_labels_are_stable() {
        assert_eq!(EngineError::Timeout(120_000).category(), "timeout");
        assert_eq!(EngineError::Transport("boom".into()).category(), "connection");
    }
}
