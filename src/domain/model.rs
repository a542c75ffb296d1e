use crate::utils::error::PollError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_ELEMENT_ID: &str = "timer";
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// The text read out of the timer element, e.g. `00:01:23`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerText(String);

impl TimerText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimerText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TimerText {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for TimerText {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// Which response wins when cycles complete out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum UpdateOrdering {
    /// Every successful response is rendered; the slowest one to arrive wins.
    #[default]
    LastCompleted,
    /// Responses from ticks older than the last rendered one are dropped.
    LastRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    #[default]
    Terminal,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub element_id: String,
    pub interval: Duration,
    pub ordering: UpdateOrdering,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            element_id: DEFAULT_ELEMENT_ID.to_string(),
            interval: DEFAULT_INTERVAL,
            ordering: UpdateOrdering::default(),
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Applied { seq: u64, text: TimerText },
    Stale { seq: u64, newer: u64 },
    Failed { seq: u64, error: PollError },
}

impl TickOutcome {
    pub fn seq(&self) -> u64 {
        match self {
            TickOutcome::Applied { seq, .. }
            | TickOutcome::Stale { seq, .. }
            | TickOutcome::Failed { seq, .. } => *seq,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TickOutcome::Applied { .. })
    }
}
