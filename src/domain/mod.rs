//! Domain layer - resource models and the output layout convention.

pub mod demo;
pub mod ids;
pub mod layout;
pub mod resources;
