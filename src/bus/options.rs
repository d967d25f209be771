//! Bus construction options.

use serde::{Deserialize, Serialize};

use crate::retry_queue::RetryQueueOptions;

/// Options for a [`Bus`](crate::Bus).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusOptions {
    #[serde(default)]
    pub retry_queue: RetryQueueOptions,
}

impl BusOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_queue(mut self, retry_queue: RetryQueueOptions) -> Self {
        self.retry_queue = retry_queue;
        self
    }
}

impl From<RetryQueueOptions> for BusOptions {
    fn from(retry_queue: RetryQueueOptions) -> Self {
        Self { retry_queue }
    }
}
