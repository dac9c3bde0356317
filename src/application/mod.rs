//! Application layer - the encoding workflow, generic over the API port.

pub mod error;
pub mod stages;
pub mod workflow;

pub use error::{CreatedResource, Stage, WorkflowError};
pub use workflow::{EncodingWorkflow, WorkflowReport};
