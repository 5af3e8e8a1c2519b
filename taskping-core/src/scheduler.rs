//! Alert scheduler: the tracked task set plus per-(task, kind) fired flags.
//!
//! Two independently timed activities share this state: the refresh loop
//! (fetch + `merge`) and the check loop (`check_due` + dispatch). Both
//! mutate it, so callers wrap it in a mutex; nothing here blocks.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::alert::{AlertKind, Notification, due_time};
use crate::task::Task;

/// In-memory alert state for one process lifetime.
///
/// Fired flags are deliberately not persisted: a restart inside a due window
/// re-fires that alert, which we accept over dragging in storage.
#[derive(Debug, Clone)]
pub struct AlertScheduler {
    tasks: HashMap<String, Task>,
    fired: HashSet<(String, AlertKind)>,
    enabled: Vec<AlertKind>,
}

impl AlertScheduler {
    /// `enabled` narrows which kinds this instance ever evaluates
    /// (the desktop-only deployment runs just SoftStop + End).
    /// Duplicates are dropped so a sloppy config cannot double-fire a kind.
    pub fn new(enabled: Vec<AlertKind>) -> Self {
        let mut deduped = Vec::with_capacity(enabled.len());
        for kind in enabled {
            if !deduped.contains(&kind) {
                deduped.push(kind);
            }
        }
        Self {
            tasks: HashMap::new(),
            fired: HashSet::new(),
            enabled: deduped,
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Replace the tracked set with a fresh fetch.
    ///
    /// Not a naive overwrite:
    /// - new ids come in with no fired flags
    /// - ids missing from `fresh` are dropped together with their flags
    /// - ids present in both keep their flags across mutable-field edits,
    ///   but a moved start/end clears the flags whose due time depends on
    ///   the moved field, since the due instant itself has moved
    pub fn merge(&mut self, fresh: Vec<Task>) {
        let mut next: HashMap<String, Task> = HashMap::with_capacity(fresh.len());

        for task in fresh {
            if let Some(prev) = self.tasks.get(&task.id) {
                if prev.start != task.start {
                    self.fired.remove(&(task.id.clone(), AlertKind::Prepare));
                    self.fired.remove(&(task.id.clone(), AlertKind::Start));
                }
                if prev.end != task.end {
                    self.fired.remove(&(task.id.clone(), AlertKind::SoftStop));
                    self.fired.remove(&(task.id.clone(), AlertKind::End));
                }
            }
            next.insert(task.id.clone(), task);
        }

        self.tasks = next;
        self.fired.retain(|(id, _)| self.tasks.contains_key(id));
    }

    /// Evaluate every tracked (task, kind) pair against `now` and return the
    /// alerts that newly came due, marking each fired.
    ///
    /// The comparison is `due <= now`, so a late tick (paused process,
    /// drifted interval) still fires the alert exactly once. Results come
    /// out in a deterministic order: ascending due time, ties broken by
    /// task id then kind rank.
    pub fn check_due(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        let mut due: Vec<(DateTime<Utc>, &Task, AlertKind)> = Vec::new();

        for task in self.tasks.values() {
            for &kind in &self.enabled {
                if self.fired.contains(&(task.id.clone(), kind)) {
                    continue;
                }
                match due_time(task, kind) {
                    Some(at) if at <= now => due.push((at, task, kind)),
                    _ => {}
                }
            }
        }

        due.sort_by(|a, b| (a.0, &a.1.id, a.2).cmp(&(b.0, &b.1.id, b.2)));

        let out: Vec<Notification> = due
            .into_iter()
            .map(|(_, task, kind)| Notification {
                task: task.clone(),
                kind,
                fired_at: now,
            })
            .collect();

        for n in &out {
            self.fired.insert((n.task.id.clone(), n.kind));
        }

        out
    }
}

impl Default for AlertScheduler {
    fn default() -> Self {
        Self::new(AlertKind::ALL.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn full_task() -> Task {
        Task::new("t1", "deep work", at(14, 0))
            .with_end(at(15, 0))
            .with_prepare_minutes(10)
            .with_soft_stop_minutes(5)
    }

    fn kinds(notifications: &[Notification]) -> Vec<AlertKind> {
        notifications.iter().map(|n| n.kind).collect()
    }

    #[test]
    fn tick_table_fires_each_alert_once_in_order() {
        let mut s = AlertScheduler::default();
        s.merge(vec![full_task()]);

        let expect: [(u32, u32, Vec<AlertKind>); 6] = [
            (13, 49, vec![]),
            (13, 50, vec![AlertKind::Prepare]),
            (14, 0, vec![AlertKind::Start]),
            (14, 54, vec![]),
            (14, 55, vec![AlertKind::SoftStop]),
            (15, 0, vec![AlertKind::End]),
        ];

        for (h, m, want) in expect {
            let got = s.check_due(at(h, m));
            assert_eq!(kinds(&got), want, "tick at {h:02}:{m:02}");
        }
    }

    #[test]
    fn start_only_task_fires_start_exactly_once() {
        let mut s = AlertScheduler::default();
        s.merge(vec![Task::new("t1", "call", at(14, 0))]);

        assert!(s.check_due(at(13, 59)).is_empty());
        assert_eq!(kinds(&s.check_due(at(14, 0))), vec![AlertKind::Start]);
        assert!(s.check_due(at(14, 0)).is_empty());
        assert!(s.check_due(at(18, 0)).is_empty());
    }

    #[test]
    fn late_tick_still_fires_once() {
        let mut s = AlertScheduler::default();
        s.merge(vec![full_task()]);

        // Process paused through the whole window: everything comes due on
        // one tick, ordered by due time.
        let got = s.check_due(at(16, 0));
        assert_eq!(
            kinds(&got),
            vec![
                AlertKind::Prepare,
                AlertKind::Start,
                AlertKind::SoftStop,
                AlertKind::End
            ]
        );
        assert!(s.check_due(at(16, 0)).is_empty());
    }

    #[test]
    fn same_due_time_orders_by_task_id_then_kind() {
        let mut s = AlertScheduler::default();
        // Zero-length task: start == end == soft-stop time, plus a second
        // task starting at the same instant.
        s.merge(vec![
            Task::new("b", "second", at(14, 0)),
            Task::new("a", "first", at(14, 0))
                .with_end(at(14, 0))
                .with_soft_stop_minutes(0),
        ]);

        let got = s.check_due(at(14, 0));
        let pairs: Vec<(String, AlertKind)> =
            got.iter().map(|n| (n.task.id.clone(), n.kind)).collect();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), AlertKind::Start),
                ("a".to_string(), AlertKind::SoftStop),
                ("a".to_string(), AlertKind::End),
                ("b".to_string(), AlertKind::Start),
            ]
        );
    }

    #[test]
    fn no_end_means_no_soft_stop_or_end() {
        let mut s = AlertScheduler::default();
        s.merge(vec![
            Task::new("t1", "open ended", at(14, 0)).with_soft_stop_minutes(5),
        ]);

        let got = s.check_due(at(23, 59));
        assert_eq!(kinds(&got), vec![AlertKind::Start]);
    }

    #[test]
    fn merge_preserves_fired_flags_for_unchanged_task() {
        let mut s = AlertScheduler::default();
        s.merge(vec![full_task()]);
        assert_eq!(kinds(&s.check_due(at(14, 0))), vec![AlertKind::Prepare, AlertKind::Start]);

        // Refresh re-supplies the same record with an edited title.
        let mut edited = full_task();
        edited.title = "deep work (renamed)".to_string();
        s.merge(vec![edited]);

        assert!(s.check_due(at(14, 0)).is_empty());
    }

    #[test]
    fn merge_drop_then_reintroduce_starts_clean() {
        let mut s = AlertScheduler::default();
        s.merge(vec![full_task()]);
        s.check_due(at(14, 0));

        s.merge(vec![]);
        assert_eq!(s.task_count(), 0);

        // Same id, same timestamps: a true drop resets everything.
        s.merge(vec![full_task()]);
        assert_eq!(kinds(&s.check_due(at(14, 0))), vec![AlertKind::Prepare, AlertKind::Start]);
    }

    #[test]
    fn moved_start_rearms_prepare_and_start_only() {
        let mut s = AlertScheduler::default();
        s.merge(vec![full_task()]);
        let got = s.check_due(at(15, 0));
        assert_eq!(got.len(), 4);

        // Task pushed back an hour; end untouched flags stay, start-side
        // flags clear because the due instants moved.
        let mut moved = full_task();
        moved.start = at(16, 0);
        s.merge(vec![moved]);

        let got = s.check_due(at(16, 30));
        assert_eq!(kinds(&got), vec![AlertKind::Prepare, AlertKind::Start]);
    }

    #[test]
    fn moved_end_rearms_soft_stop_and_end_only() {
        let mut s = AlertScheduler::default();
        s.merge(vec![full_task()]);
        s.check_due(at(15, 0));

        let moved = full_task().with_end(at(17, 0));
        s.merge(vec![moved]);

        let got = s.check_due(at(17, 30));
        assert_eq!(kinds(&got), vec![AlertKind::SoftStop, AlertKind::End]);
    }

    #[test]
    fn disabled_kinds_never_fire() {
        let mut s = AlertScheduler::new(vec![AlertKind::SoftStop, AlertKind::End]);
        s.merge(vec![full_task()]);

        let got = s.check_due(at(23, 0));
        assert_eq!(kinds(&got), vec![AlertKind::SoftStop, AlertKind::End]);
    }

    #[test]
    fn repeated_kind_in_config_still_fires_once() {
        let mut s = AlertScheduler::new(vec![AlertKind::End, AlertKind::End]);
        s.merge(vec![full_task()]);

        let got = s.check_due(at(15, 0));
        assert_eq!(kinds(&got), vec![AlertKind::End]);
        assert!(s.check_due(at(15, 0)).is_empty());
    }

    #[test]
    fn notifications_carry_the_tick_time() {
        let mut s = AlertScheduler::default();
        s.merge(vec![Task::new("t1", "call", at(14, 0))]);

        let got = s.check_due(at(14, 3));
        assert_eq!(got[0].fired_at, at(14, 3));
    }
}
