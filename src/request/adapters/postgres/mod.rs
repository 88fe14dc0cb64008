//! `PostgreSQL` adapters for request lifecycle persistence.
//!
//! The expected schema lives in `migrations/`.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresRequestStore, RequestPgPool};
