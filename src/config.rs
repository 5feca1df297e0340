//! Runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::structure::ModelConfig;
use crate::tracker::TieBreakPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Per-query deadline; `None` lets queries run to completion
    pub query_timeout: Option<Duration>,
    pub tie_break: TieBreakPolicy,
    pub model: ModelConfig,
}

impl TrackerConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}
