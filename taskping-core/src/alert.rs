//! Alert kinds, due-time formulas, and the notification event type.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::Task;

/// The four thresholds a task can cross, in firing order.
///
/// Declaration order is the tie-break rank used when several alerts come due
/// on the same tick, so keep Prepare < Start < SoftStop < End.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Heads-up `prepare_minutes` before start.
    Prepare,
    /// Fires at the start instant.
    Start,
    /// Wind-down `soft_stop_minutes` before end.
    SoftStop,
    /// Fires at the end instant.
    End,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::Prepare,
        AlertKind::Start,
        AlertKind::SoftStop,
        AlertKind::End,
    ];

    /// Short label the delivery layer renders in notification titles.
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Prepare => "Prepare",
            AlertKind::Start => "Start Now",
            AlertKind::SoftStop => "Soft Stop",
            AlertKind::End => "Time's Up",
        }
    }

    /// Accent color (RGB) for sinks that support it.
    pub fn color(self) -> u32 {
        match self {
            AlertKind::Prepare => 0xFFA500,
            AlertKind::Start => 0x00FF00,
            AlertKind::SoftStop => 0xFFFF00,
            AlertKind::End => 0xFF0000,
        }
    }
}

/// When `kind` comes due for `task`, or None when the kind does not apply
/// (missing end time or missing offset). Inapplicable kinds never fire.
pub fn due_time(task: &Task, kind: AlertKind) -> Option<DateTime<Utc>> {
    match kind {
        AlertKind::Prepare => {
            let minutes = task.prepare_minutes?;
            Some(task.start - Duration::minutes(minutes))
        }
        AlertKind::Start => Some(task.start),
        AlertKind::SoftStop => {
            let end = task.end?;
            let minutes = task.soft_stop_minutes?;
            Some(end - Duration::minutes(minutes))
        }
        AlertKind::End => task.end,
    }
}

/// One emitted alert. Handed to the delivery sink exactly once; never
/// retried or persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub task: Task,
    pub kind: AlertKind,
    pub fired_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn start_is_always_applicable() {
        let t = Task::new("t1", "standup", at(14, 0));
        assert_eq!(due_time(&t, AlertKind::Start), Some(at(14, 0)));
    }

    #[test]
    fn prepare_needs_offset() {
        let t = Task::new("t1", "standup", at(14, 0));
        assert_eq!(due_time(&t, AlertKind::Prepare), None);

        let t = t.with_prepare_minutes(10);
        assert_eq!(due_time(&t, AlertKind::Prepare), Some(at(13, 50)));
    }

    #[test]
    fn soft_stop_needs_end_and_offset() {
        let t = Task::new("t1", "standup", at(14, 0)).with_soft_stop_minutes(5);
        assert_eq!(due_time(&t, AlertKind::SoftStop), None);
        assert_eq!(due_time(&t, AlertKind::End), None);

        let t = t.with_end(at(15, 0));
        assert_eq!(due_time(&t, AlertKind::SoftStop), Some(at(14, 55)));
        assert_eq!(due_time(&t, AlertKind::End), Some(at(15, 0)));
    }

    #[test]
    fn notification_round_trips_through_json() {
        let task = Task::new("t1", "standup", at(14, 0))
            .with_end(at(15, 0))
            .with_prepare_minutes(10)
            .with_soft_stop_minutes(5)
            .with_description("daily sync")
            .with_url("https://notion.so/abc123");
        let n = Notification {
            task,
            kind: AlertKind::SoftStop,
            fired_at: at(14, 55),
        };

        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"soft_stop\""));
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn kind_rank_matches_firing_order() {
        let mut kinds = vec![
            AlertKind::End,
            AlertKind::Prepare,
            AlertKind::SoftStop,
            AlertKind::Start,
        ];
        kinds.sort();
        assert_eq!(kinds, AlertKind::ALL.to_vec());
    }
}
