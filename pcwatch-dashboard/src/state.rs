use crate::models::{Alert, Report, Snapshot, Statistics};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Collections cached from the last applied poll.
///
/// Only `apply_snapshot` and `record_failure` write here; the lock is never
/// held across an await.
#[derive(Debug, Default)]
pub struct DashboardState {
    pub statistics: Statistics,
    pub reports: Vec<Report>,
    pub alerts: Vec<Alert>,
    pub last_refresh: Option<DateTime<Utc>>,
    /// Set by a failed cycle, cleared by the next applied one
    pub poll_error: Option<String>,
    applied_ticket: u64,
    failed_ticket: u64,
}

impl DashboardState {
    /// Replaces all three collections wholesale.
    ///
    /// Returns false (and changes nothing) when a cycle that started later
    /// has already been applied.
    pub fn apply_snapshot(&mut self, ticket: u64, snapshot: Snapshot, at: DateTime<Utc>) -> bool {
        if ticket <= self.applied_ticket {
            return false;
        }
        self.applied_ticket = ticket;
        self.statistics = snapshot.statistics;
        self.reports = snapshot.reports;
        self.alerts = snapshot.alerts;
        self.last_refresh = Some(at);
        // un cycle parti avant le dernier échec ne l'efface pas
        if ticket > self.failed_ticket {
            self.poll_error = None;
        }
        true
    }

    /// A failed cycle keeps the previous collections on screen.
    ///
    /// The notice stays until a cycle started after this one is applied.
    pub fn record_failure(&mut self, ticket: u64, message: String) {
        if ticket > self.applied_ticket && ticket > self.failed_ticket {
            self.failed_ticket = ticket;
            self.poll_error = Some(message);
        }
    }

    pub fn find_report(&self, computer_name: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.computer_name == computer_name)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            statistics: self.statistics.clone(),
            reports: self.reports.clone(),
            alerts: self.alerts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcwatch_devkit::fixtures::ReportBuilder;

    fn snapshot_with(names: &[&str]) -> Snapshot {
        Snapshot {
            reports: names
                .iter()
                .map(|n| serde_json::from_value(ReportBuilder::new(*n).build()).unwrap())
                .collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_apply_replaces_wholesale() {
        let mut state = DashboardState::default();
        assert!(state.apply_snapshot(1, snapshot_with(&["A", "B"]), Utc::now()));
        assert!(state.apply_snapshot(2, snapshot_with(&["C"]), Utc::now()));

        assert_eq!(state.reports.len(), 1);
        assert!(state.find_report("A").is_none());
        assert!(state.find_report("C").is_some());
    }

    #[test]
    fn test_older_cycle_never_rolls_back() {
        let mut state = DashboardState::default();
        assert!(state.apply_snapshot(3, snapshot_with(&["new"]), Utc::now()));
        assert!(!state.apply_snapshot(2, snapshot_with(&["old"]), Utc::now()));
        assert_eq!(state.reports[0].computer_name, "new");
    }

    #[test]
    fn test_failure_keeps_previous_view() {
        let mut state = DashboardState::default();
        state.apply_snapshot(1, snapshot_with(&["A"]), Utc::now());
        state.record_failure(2, "connection refused".into());

        assert_eq!(state.reports.len(), 1);
        assert_eq!(state.poll_error.as_deref(), Some("connection refused"));

        state.apply_snapshot(3, snapshot_with(&["A"]), Utc::now());
        assert!(state.poll_error.is_none());
    }

    #[test]
    fn test_older_success_keeps_newer_failure() {
        let mut state = DashboardState::default();
        state.apply_snapshot(3, snapshot_with(&["A"]), Utc::now());

        // ticket 4 lent, ticket 5 (refresh manuel) échoue, puis 4 aboutit
        state.record_failure(5, "connection refused".into());
        assert!(state.apply_snapshot(4, snapshot_with(&["B"]), Utc::now()));
        assert_eq!(state.reports[0].computer_name, "B");
        assert_eq!(state.poll_error.as_deref(), Some("connection refused"));

        // seul un cycle parti après l'échec l'efface
        state.apply_snapshot(6, snapshot_with(&["C"]), Utc::now());
        assert!(state.poll_error.is_none());
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let mut state = DashboardState::default();
        state.apply_snapshot(5, snapshot_with(&["A"]), Utc::now());
        state.record_failure(4, "timeout".into());
        assert!(state.poll_error.is_none());
    }
}
