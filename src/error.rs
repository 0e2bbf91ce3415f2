//! Pipeline error taxonomy
//!
//! Only a failed generation step reaches the caller. Every other upstream
//! problem degrades the answer and is recorded as a [`Degradation`].

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("processing failed: language model call failed in {branch} branch")]
    GenerationFailed {
        branch: &'static str,
        #[source]
        source: eyre::Report,
    },
}

impl PipelineError {
    pub fn generation(branch: &'static str, source: eyre::Report) -> Self {
        PipelineError::GenerationFailed { branch, source }
    }
}

/// Recoverable failures observed while answering one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Degradation {
    /// Model-assisted name extraction failed or returned names absent from the query
    ExtractionDegraded(String),
    /// A named non-persona entity has no profile
    EntityNotFound(String),
    /// Power comparison could not be computed for this entity
    RelationUnknown(String),
    /// A collaborator service could not be reached
    UpstreamUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failed_message_names_branch() {
        let err = PipelineError::generation("identity", eyre::eyre!("timeout"));
        assert!(err.to_string().contains("identity"));
        assert!(err.to_string().starts_with("processing failed"));
    }

    #[test]
    fn test_degradation_serializes_tagged() {
        let json = serde_json::to_value(Degradation::EntityNotFound("Tsubasa".to_string())).unwrap();
        assert_eq!(json["kind"], "entity_not_found");
        assert_eq!(json["detail"], "Tsubasa");
    }
}
