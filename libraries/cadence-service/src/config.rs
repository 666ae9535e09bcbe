//! Service configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Command loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Commands buffered before callers wait for the loop
    pub command_buffer: usize,

    /// Period of progress updates and load-timeout checks (milliseconds)
    pub progress_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command_buffer: 32,
            progress_interval_ms: 1000,
        }
    }
}

impl ServiceConfig {
    /// Progress period, never zero
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Channel capacity, never zero
    pub(crate) fn channel_capacity(&self) -> usize {
        self.command_buffer.max(1)
    }
}
