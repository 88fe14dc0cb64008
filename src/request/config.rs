//! Tunables for lifecycle services.

use serde::{Deserialize, Serialize};

/// Behaviour switches shared by the lifecycle services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How often a command is retried after an optimistic-concurrency
    /// conflict before it fails.
    pub max_conflict_retries: u32,
    /// Close unpublished second-opinion responses when the workflow
    /// completes.
    pub close_second_opinions_on_completion: bool,
    /// Stage a provisioning request event when a workflow reaches its
    /// provisioning point.
    pub publish_provisioning_requests: bool,
}

impl LifecycleConfig {
    /// Default number of conflict retries.
    pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

    /// Sets the conflict retry budget.
    #[must_use]
    pub const fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Enables or disables closing second opinions on completion.
    #[must_use]
    pub const fn with_close_second_opinions_on_completion(mut self, enabled: bool) -> Self {
        self.close_second_opinions_on_completion = enabled;
        self
    }

    /// Enables or disables provisioning request events.
    #[must_use]
    pub const fn with_publish_provisioning_requests(mut self, enabled: bool) -> Self {
        self.publish_provisioning_requests = enabled;
        self
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: Self::DEFAULT_MAX_CONFLICT_RETRIES,
            close_second_opinions_on_completion: true,
            publish_provisioning_requests: true,
        }
    }
}
