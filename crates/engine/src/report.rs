use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use task::{Action, BatchEntry};

/// Outcome of a single executed task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskReport {
    /// What was executed.
    pub action: Action,
    /// Source path, empty for deletions.
    pub source: String,
    /// Destination path; batches carry a descriptive label.
    pub destination: String,
    /// Bytes written to the destination.
    pub bytes: u64,
    /// Lowercase hex SHA-256 digest; empty for deletions.
    pub digest: String,
    /// When the worker picked the task up.
    pub started_at: SystemTime,
    /// Wall-clock time the task took.
    pub duration: Duration,
    /// Per-file routing for batch tasks, empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub batch_entries: Vec<BatchEntry>,
}

impl TaskReport {
    /// Instant the task finished.
    #[must_use]
    pub fn completed_at(&self) -> SystemTime {
        self.started_at + self.duration
    }

    /// Number of destination files this task produced or removed.
    #[must_use]
    pub fn file_count(&self) -> usize {
        match self.action {
            Action::CopyBatch => self.batch_entries.len(),
            Action::Copy | Action::Delete => 1,
        }
    }
}

/// Aggregated outcome of a whole run.
///
/// Owned by the pool's collector until the run completes; [`Report::finalize`]
/// stamps the completion time and sorts both task lists by destination so
/// rendering downstream is deterministic.
#[derive(Debug)]
pub struct Report {
    started_at: SystemTime,
    completed_at: Option<SystemTime>,
    total_bytes: u64,
    copies: Vec<TaskReport>,
    deletes: Vec<TaskReport>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    /// Creates an empty report whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: SystemTime::now(),
            completed_at: None,
            total_bytes: 0,
            copies: Vec::new(),
            deletes: Vec::new(),
        }
    }

    /// Merges one task outcome into the aggregate.
    ///
    /// Copy-family tasks contribute their byte counts to the running
    /// total; deletions are tracked separately.
    pub fn record(&mut self, report: TaskReport) {
        match report.action {
            Action::Copy | Action::CopyBatch => {
                self.total_bytes += report.bytes;
                self.copies.push(report);
            }
            Action::Delete => self.deletes.push(report),
        }
    }

    /// Stamps the completion time (once) and sorts both lists by
    /// destination.
    pub fn finalize(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(SystemTime::now());
        }
        self.copies
            .sort_by(|a, b| a.destination.cmp(&b.destination));
        self.deletes
            .sort_by(|a, b| a.destination.cmp(&b.destination));
    }

    /// When the run started.
    #[must_use]
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// When the run completed, if it has been finalized.
    #[must_use]
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    /// Total wall-clock duration, zero until finalized.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.completed_at
            .and_then(|done| done.duration_since(self.started_at).ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Average throughput over the run in bytes per second.
    #[must_use]
    pub fn average_speed_bytes(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / secs
    }

    /// Sum of bytes written by copy-family tasks.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Number of copy-family tasks recorded.
    #[must_use]
    pub fn copy_count(&self) -> usize {
        self.copies.len()
    }

    /// Number of deletions recorded.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.deletes.len()
    }

    /// Number of destination files produced, counting batch members
    /// individually.
    #[must_use]
    pub fn copied_file_count(&self) -> usize {
        self.copies.iter().map(TaskReport::file_count).sum()
    }

    /// Recorded copy-family task reports.
    #[must_use]
    pub fn copies(&self) -> &[TaskReport] {
        &self.copies
    }

    /// Recorded deletion task reports.
    #[must_use]
    pub fn deletes(&self) -> &[TaskReport] {
        &self.deletes
    }

    /// Detached, serializable view of the report.
    #[must_use]
    pub fn snapshot(&self) -> ReportSnapshot {
        ReportSnapshot {
            started_at: self.started_at,
            completed_at: self.completed_at,
            total_bytes: self.total_bytes,
            copies: self.copies.clone(),
            deletes: self.deletes.clone(),
        }
    }

    /// Reconstructs a report from a stored snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: ReportSnapshot) -> Self {
        Self {
            started_at: snapshot.started_at,
            completed_at: snapshot.completed_at,
            total_bytes: snapshot.total_bytes,
            copies: snapshot.copies,
            deletes: snapshot.deletes,
        }
    }
}

/// Serializable form of a [`Report`], used to persist run outcomes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportSnapshot {
    /// When the run started.
    pub started_at: SystemTime,
    /// When the run completed, if it was finalized before snapshotting.
    pub completed_at: Option<SystemTime>,
    /// Sum of bytes written by copy-family tasks.
    pub total_bytes: u64,
    /// Copy-family task reports.
    pub copies: Vec<TaskReport>,
    /// Deletion task reports.
    pub deletes: Vec<TaskReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy_report(destination: &str, bytes: u64) -> TaskReport {
        TaskReport {
            action: Action::Copy,
            source: format!("/src/{destination}"),
            destination: destination.to_owned(),
            bytes,
            digest: "00".repeat(32),
            started_at: SystemTime::now(),
            duration: Duration::from_millis(5),
            batch_entries: Vec::new(),
        }
    }

    fn delete_report(destination: &str) -> TaskReport {
        TaskReport {
            action: Action::Delete,
            source: String::new(),
            destination: destination.to_owned(),
            bytes: 0,
            digest: String::new(),
            started_at: SystemTime::now(),
            duration: Duration::from_millis(1),
            batch_entries: Vec::new(),
        }
    }

    #[test]
    fn only_copy_family_bytes_count_toward_the_total() {
        let mut report = Report::new();
        report.record(copy_report("b.txt", 100));
        report.record(delete_report("gone.txt"));
        report.record(copy_report("a.txt", 20));

        assert_eq!(report.total_bytes(), 120);
        assert_eq!(report.copy_count(), 2);
        assert_eq!(report.delete_count(), 1);
    }

    #[test]
    fn finalize_sorts_by_destination_and_stamps_completion() {
        let mut report = Report::new();
        report.record(copy_report("c.txt", 1));
        report.record(copy_report("a.txt", 1));
        report.record(copy_report("b.txt", 1));
        assert!(report.completed_at().is_none());

        report.finalize();

        let order: Vec<&str> = report
            .copies()
            .iter()
            .map(|r| r.destination.as_str())
            .collect();
        assert_eq!(order, vec!["a.txt", "b.txt", "c.txt"]);
        let completed = report.completed_at().unwrap();
        assert!(completed >= report.started_at());
    }

    #[test]
    fn finalize_does_not_move_an_existing_completion_stamp() {
        let mut report = Report::new();
        report.finalize();
        let first = report.completed_at().unwrap();
        report.finalize();
        assert_eq!(report.completed_at().unwrap(), first);
    }

    #[test]
    fn batch_entries_count_as_individual_files() {
        let mut report = Report::new();
        let mut batch = copy_report("batched", 10);
        batch.action = Action::CopyBatch;
        batch.batch_entries = vec![
            BatchEntry {
                source: "/s/a".into(),
                destination: "/d/a".into(),
                size: 5,
            },
            BatchEntry {
                source: "/s/b".into(),
                destination: "/d/b".into(),
                size: 5,
            },
        ];
        report.record(batch);
        report.record(copy_report("single", 3));

        assert_eq!(report.copied_file_count(), 3);
        assert_eq!(report.copy_count(), 2);
    }

    #[test]
    fn speed_is_zero_without_a_duration() {
        let report = Report::new();
        assert_eq!(report.average_speed_bytes(), 0.0);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut report = Report::new();
        report.record(copy_report("a.txt", 1024));
        report.record(delete_report("b.txt"));
        report.finalize();

        let json = serde_json::to_string(&report.snapshot()).unwrap();
        let restored = Report::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.started_at(), report.started_at());
        assert_eq!(restored.completed_at(), report.completed_at());
        assert_eq!(restored.total_bytes(), report.total_bytes());
        assert_eq!(restored.copy_count(), report.copy_count());
        assert_eq!(restored.delete_count(), report.delete_count());
    }

    #[test]
    fn snapshot_is_detached_from_the_live_report() {
        let mut report = Report::new();
        report.record(copy_report("a.txt", 1));
        let snapshot = report.snapshot();
        let mut restored = Report::from_snapshot(snapshot);

        restored.record(copy_report("b.txt", 1));
        assert_eq!(report.copy_count(), 1);
        assert_eq!(restored.copy_count(), 2);
    }
}
