//! In-memory adapters for every request lifecycle port.
//!
//! Used by tests and local wiring. Each adapter is cheap to clone and shares
//! its state between clones.

mod authorization;
mod notification;
mod org_chart;
mod profile;
mod store;

pub use authorization::StaticAuthorizationOracle;
pub use notification::{InMemoryNotificationSink, SinkCall};
pub use org_chart::InMemoryOrgChart;
pub use profile::InMemoryProfileResolver;
pub use store::InMemoryRequestStore;
