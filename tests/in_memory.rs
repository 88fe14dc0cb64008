//! In-memory request lifecycle integration tests.
//!
//! Tests are organized into modules by concern:
//! - `lifecycle_tests`: Draft to provisioned flows, action gating, restarts
//! - `concurrency_tests`: Racing initializations and approvals
//! - `consistency_tests`: Conflict retries and partial commits

mod in_memory {
    pub mod helpers;

    mod concurrency_tests;
    mod consistency_tests;
    mod lifecycle_tests;
}
