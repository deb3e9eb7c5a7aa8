//! Worker - a participant identified by the labor marketplace

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A worker and their visit/session counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    id: String,
    session_count: u32,
    visit_count: u32,
    last_visit_time: Option<DateTime<Utc>>,
}

impl Worker {
    /// Create a worker that has never visited.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_count: 0,
            visit_count: 0,
            last_visit_time: None,
        }
    }

    /// Get the worker ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of sessions started.
    #[must_use]
    pub const fn session_count(&self) -> u32 {
        self.session_count
    }

    /// Number of visits.
    #[must_use]
    pub const fn visit_count(&self) -> u32 {
        self.visit_count
    }

    /// Time of the last visit.
    #[must_use]
    pub const fn last_visit_time(&self) -> Option<DateTime<Utc>> {
        self.last_visit_time
    }

    /// Record a visit at `now`.
    ///
    /// The first visit opens session 1; later visits open a new session when
    /// at least `session_gap` has passed since the previous visit.
    pub fn record_visit(&mut self, now: DateTime<Utc>, session_gap: Duration) {
        match self.last_visit_time {
            Some(last) if now - last >= session_gap => self.session_count += 1,
            Some(_) => {}
            None => self.session_count = 1,
        }
        self.visit_count += 1;
        self.last_visit_time = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visit_opens_session() {
        let mut worker = Worker::new("W1");
        worker.record_visit(Utc::now(), Duration::minutes(60));
        assert_eq!(worker.session_count(), 1);
        assert_eq!(worker.visit_count(), 1);
    }

    #[test]
    fn test_session_gap() {
        let gap = Duration::minutes(60);
        let start = Utc::now();
        let mut worker = Worker::new("W1");

        worker.record_visit(start, gap);
        worker.record_visit(start + Duration::minutes(30), gap);
        assert_eq!(worker.session_count(), 1);

        worker.record_visit(start + Duration::minutes(90), gap);
        assert_eq!(worker.session_count(), 2);
        assert_eq!(worker.visit_count(), 3);
    }
}
