//! Retry queue configuration.

use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BusError;

/// How often a bus drains its retry queue on a timer.
///
/// Accepts a number of milliseconds or a duration string such as `"100ms"`,
/// `"5s"` or `"1m"`. `false`, `0`, `""` (or absence) disable the timer; the
/// queue is then only drained on inbound traffic, reconnects or manual calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RetryInterval {
    #[default]
    Disabled,
    Millis(u64),
    Text(String),
}

impl RetryInterval {
    /// Interval from a `Duration`, saturating at `u64::MAX` milliseconds.
    pub fn every(duration: Duration) -> Self {
        RetryInterval::Millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    /// Resolve into a concrete period, `None` when the timer is disabled.
    ///
    /// A zero period and a blank string disable the timer, like `false`.
    /// A string that is not a duration is a configuration error.
    pub fn resolve(&self) -> Result<Option<Duration>, BusError> {
        let period = match self {
            RetryInterval::Disabled => return Ok(None),
            RetryInterval::Millis(ms) => Duration::from_millis(*ms),
            RetryInterval::Text(text) => parse_duration(text)?,
        };

        Ok(Some(period).filter(|period| !period.is_zero()))
    }
}

fn parse_duration(text: &str) -> Result<Duration, BusError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Duration::ZERO);
    }
    if let Ok(ms) = text.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(text)
        .map_err(|err| BusError::InvalidRetryInterval(format!("{text:?}: {err}")))
}

impl From<Duration> for RetryInterval {
    fn from(duration: Duration) -> Self {
        RetryInterval::every(duration)
    }
}

impl From<u64> for RetryInterval {
    fn from(ms: u64) -> Self {
        RetryInterval::Millis(ms)
    }
}

impl From<&str> for RetryInterval {
    fn from(text: &str) -> Self {
        RetryInterval::Text(text.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInterval {
    Flag(bool),
    Millis(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for RetryInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<RawInterval>::deserialize(deserializer)? {
            None | Some(RawInterval::Flag(false)) => Ok(RetryInterval::Disabled),
            Some(RawInterval::Flag(true)) => Err(D::Error::custom(
                "retryInterval must be a duration, a number of milliseconds or false",
            )),
            Some(RawInterval::Millis(ms)) => Ok(RetryInterval::Millis(ms)),
            Some(RawInterval::Text(text)) => Ok(RetryInterval::Text(text)),
        }
    }
}

impl Serialize for RetryInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RetryInterval::Disabled => serializer.serialize_bool(false),
            RetryInterval::Millis(ms) => serializer.serialize_u64(*ms),
            RetryInterval::Text(text) => serializer.serialize_str(text),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Options for a bus's retry queue.
///
/// ```
/// use busline::RetryQueueOptions;
///
/// let options: RetryQueueOptions =
///     serde_json::from_str(r#"{ "maxSize": 100, "retryInterval": "500ms" }"#).unwrap();
///
/// assert!(options.enabled);
/// assert!(options.remove_duplicates);
/// assert_eq!(options.max_size, Some(100));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryQueueOptions {
    /// When false, failed publishes are dropped instead of queued.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reject entries whose payload hash is already queued.
    #[serde(default = "default_true")]
    pub remove_duplicates: bool,
    /// Capacity; the oldest entry is evicted to make room. `None` or `0`
    /// means unbounded.
    #[serde(default)]
    pub max_size: Option<usize>,
    #[serde(default)]
    pub retry_interval: RetryInterval,
}

impl Default for RetryQueueOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            remove_duplicates: true,
            max_size: None,
            retry_interval: RetryInterval::Disabled,
        }
    }
}

impl RetryQueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_remove_duplicates(mut self, remove_duplicates: bool) -> Self {
        self.remove_duplicates = remove_duplicates;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_retry_interval(mut self, interval: impl Into<RetryInterval>) -> Self {
        self.retry_interval = interval.into();
        self
    }

    /// Capacity with `0` folded into "unbounded".
    pub(crate) fn capacity(&self) -> Option<usize> {
        self.max_size.filter(|max| *max > 0)
    }
}
