//! Resourcing: request lifecycle engine for resource allocation.
//!
//! Resource-allocation and change requests move from draft through a
//! template-driven workflow to completion and provisioning into an external
//! org chart. Required actions gate transitions, proposals and second
//! opinions run alongside the workflow, and people can be granted
//! visibility of individual requests.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business rules with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for the store, the notification
//!   sink and external collaborators
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`request`]: Request lifecycle domain, ports, adapters and services

pub mod request;
