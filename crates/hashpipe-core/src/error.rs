//! Common error type for pipeline execution

use std::sync::Mutex;

/// Error from running a pipeline or one of its stages.
#[derive(Debug)]
pub enum PipelineError {
    /// The consumer of an output stream is gone.
    StreamClosed,
    /// The run was cancelled because another stage failed.
    Cancelled,
    /// A stage thread (or one of its workers) panicked.
    StagePanicked { stage: String },
    /// A stage reported a failure of its own.
    Stage { stage: String, message: String },
    /// Failed to spawn a stage thread.
    Spawn(std::io::Error),
    /// Failed to build a per-stage worker pool.
    Pool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StreamClosed => write!(f, "output stream closed by consumer"),
            Self::Cancelled => write!(f, "pipeline cancelled"),
            Self::StagePanicked { stage } => write!(f, "stage {stage} panicked"),
            Self::Stage { stage, message } => write!(f, "stage {stage}: {message}"),
            Self::Spawn(e) => write!(f, "failed to spawn stage thread: {e}"),
            Self::Pool(e) => write!(f, "failed to build worker pool: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) => Some(e),
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for PipelineError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::Pool(e)
    }
}

impl PipelineError {
    /// Build a stage-reported failure.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether this error is only a consequence of a failure elsewhere.
    ///
    /// A closed stream or a cancelled read happen after some other stage
    /// already failed; the executor prefers reporting the root cause.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::StreamClosed | Self::Cancelled)
    }
}

/// First-error slot shared by the workers of one stage.
///
/// Workers record failures here instead of returning them; the stage reads
/// the slot after its worker scope joined.
#[derive(Debug, Default)]
pub struct ErrorSlot(Mutex<Option<PipelineError>>);

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `err` unless an error was already recorded.
    pub fn record(&self, err: PipelineError) {
        let mut slot = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Consume the slot: `Err` with the first recorded failure, else `Ok`.
    pub fn into_result(self) -> Result<(), PipelineError> {
        match self.0.into_inner().unwrap_or_else(|e| e.into_inner()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_and_cancelled_are_secondary() {
        assert!(PipelineError::StreamClosed.is_secondary());
        assert!(PipelineError::Cancelled.is_secondary());
    }

    #[test]
    fn stage_failures_are_primary() {
        assert!(!PipelineError::stage("combine", "boom").is_secondary());
        let panicked = PipelineError::StagePanicked {
            stage: "single_hash".to_string(),
        };
        assert!(!panicked.is_secondary());
    }

    #[test]
    fn display_stage() {
        let err = PipelineError::stage("multi_hash", "bad input");
        assert_eq!(format!("{err}"), "stage multi_hash: bad input");
    }

    #[test]
    fn display_panicked() {
        let err = PipelineError::StagePanicked {
            stage: "combine".to_string(),
        };
        assert_eq!(format!("{err}"), "stage combine panicked");
    }

    #[test]
    fn error_slot_keeps_first() {
        let slot = ErrorSlot::new();
        assert!(!slot.is_set());
        slot.record(PipelineError::stage("a", "first"));
        slot.record(PipelineError::stage("b", "second"));
        assert!(slot.is_set());
        let err = slot.into_result().unwrap_err();
        assert_eq!(format!("{err}"), "stage a: first");
    }

    #[test]
    fn empty_error_slot_is_ok() {
        assert!(ErrorSlot::new().into_result().is_ok());
    }
}
