//! Task model for the alert scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One calendar item to monitor.
///
/// Note: we keep this small + serializable. Fetching (Notion, anything else
/// that can answer "today's actionable tasks") is a later layer.
///
/// A task only enters the tracked set if its start carries a time component;
/// date-only records are dropped at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable external identifier, unique among tracked tasks.
    pub id: String,
    pub title: String,

    /// Start instant (UTC). Always time-bearing.
    pub start: DateTime<Utc>,

    /// Optional end instant (UTC). Absent means no soft-stop/end alerts.
    pub end: Option<DateTime<Utc>>,

    /// Minutes before `start` to fire the prepare alert. Absent disables it.
    pub prepare_minutes: Option<i64>,

    /// Minutes before `end` to fire the soft-stop alert. Absent disables it.
    pub soft_stop_minutes: Option<i64>,

    pub description: String,

    /// Permalink back to the source record.
    pub url: String,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end: None,
            prepare_minutes: None,
            soft_stop_minutes: None,
            description: String::new(),
            url: String::new(),
        }
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_prepare_minutes(mut self, minutes: i64) -> Self {
        self.prepare_minutes = Some(minutes);
        self
    }

    pub fn with_soft_stop_minutes(mut self, minutes: i64) -> Self {
        self.soft_stop_minutes = Some(minutes);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}
