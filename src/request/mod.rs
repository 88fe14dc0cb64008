//! Request lifecycle management.
//!
//! Governs how a resource-allocation request moves from draft through its
//! workflow to completion and provisioning, together with the action gate,
//! proposal, second-opinion and sharing sub-flows. Every mutating command
//! runs inside one [`services::TransactionCoordinator`] scope that commits
//! the request store before the notification sink.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//! - Tunables in [`config`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
