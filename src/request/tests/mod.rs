//! Unit tests for the request lifecycle module.
//!
//! Domain rules are exercised directly; services run against the in-memory
//! adapters, with mocked ports where call counts matter.

mod sharing_tests;
mod support;
mod template_tests;
