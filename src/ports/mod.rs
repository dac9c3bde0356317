//! Ports - the boundary to the remote encoding service.

pub mod encoding_api;
pub mod error;

pub use encoding_api::EncodingApi;
pub use error::ApiError;

#[cfg(test)]
pub use encoding_api::MockEncodingApi;
