//! Bitmovin VOD - submit one source file for encoding and publish DASH and
//! HLS manifests over the results.
//!
//! Hexagonal Architecture:
//! - domain/: Request payloads, ids and the output path layout
//! - ports/: The `EncodingApi` trait and its error type
//! - adapters/: REST client and in-memory service
//! - application/: The staged encoding workflow
//! - config: Environment configuration
//! - cli: Command line entry point

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use adapters::bitmovin::BitmovinClient;
pub use adapters::memory::InMemoryApi;
pub use application::{EncodingWorkflow, WorkflowError, WorkflowReport};
pub use config::WorkflowConfig;
pub use error::AppError;
