//! Adapters - Concrete implementations of ports.

pub mod bitmovin;
pub mod memory;
