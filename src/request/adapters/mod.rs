//! Adapter implementations for request lifecycle ports.

pub mod memory;
pub mod postgres;
