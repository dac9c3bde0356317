use crate::domain::ids::ResourceKind;
use crate::ports::ApiError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResourceRegistration,
    CodecConfiguration,
    EncodingGraph,
    JobExecution,
    ManifestConstruction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResourceRegistration => "resource registration",
            Stage::CodecConfiguration => "codec configuration",
            Stage::EncodingGraph => "encoding graph",
            Stage::JobExecution => "job execution",
            Stage::ManifestConstruction => "manifest construction",
        };
        f.write_str(name)
    }
}

/// A remote resource created before the run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedResource {
    pub kind: ResourceKind,
    pub id: String,
}

/// First failing call of a run. Resources already created stay on the
/// remote service and are listed in `created` for manual cleanup.
#[derive(Debug, Error)]
#[error("{stage} stage failed at {call}: {source}")]
pub struct WorkflowError {
    pub stage: Stage,
    pub call: &'static str,
    pub created: Vec<CreatedResource>,
    #[source]
    pub source: ApiError,
}

impl WorkflowError {
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}
