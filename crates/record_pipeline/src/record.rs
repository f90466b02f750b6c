//! Records flowing through the pipeline and the generators that create them.
//!
//! A `UserRecord` is immutable once created: its fields are private and only
//! exposed through shared references, so a record can be moved across
//! conduits and read by any worker without locking.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::thread;
use std::time::Duration;

use crate::pipeline::common::thread::worker_gen_range;

/// An action recorded in a user's activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    LoggedIn,
    LoggedOut,
    CreatedRecord,
    DeletedRecord,
    UpdatedAccount,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::LoggedIn,
        Action::LoggedOut,
        Action::CreatedRecord,
        Action::DeletedRecord,
        Action::UpdatedAccount,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::LoggedIn => "logged in",
            Action::LoggedOut => "logged out",
            Action::CreatedRecord => "created record",
            Action::DeletedRecord => "deleted record",
            Action::UpdatedAccount => "updated account",
        };
        f.write_str(label)
    }
}

/// One timestamped entry of an activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub action: Action,
    pub timestamp: DateTime<Utc>,
}

/// A generated user profile with its activity log.
///
/// `id` is assigned at generation time and lies in `1..=N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    id: usize,
    email: String,
    activity: Vec<ActivityEntry>,
}

impl UserRecord {
    pub fn new(id: usize, email: impl Into<String>, activity: Vec<ActivityEntry>) -> Self {
        Self {
            id,
            email: email.into(),
            activity,
        }
    }

    /// A record that carries nothing but its identity.
    pub fn identity(id: usize) -> Self {
        Self::new(id, email_for(id), Vec::new())
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn activity(&self) -> &[ActivityEntry] {
        &self.activity
    }

    /// Renders the record as the text block a storage backend would write.
    pub fn activity_info(&self) -> String {
        let mut output = format!(
            "UID: {}; Email: {};\nActivity Log:\n",
            self.id, self.email
        );
        for (index, entry) in self.activity.iter().enumerate() {
            // Writing into a String cannot fail.
            let _ = writeln!(
                output,
                "{}. [{}] at {}",
                index,
                entry.action,
                entry.timestamp.to_rfc3339()
            );
        }
        output
    }
}

fn email_for(id: usize) -> String {
    format!("user{}@company.com", id)
}

/// Synthesizes one record from a zero-based request index.
///
/// Implementations must be total and finish in finite time; the record they
/// return must carry id `index + 1`. They must be `Send + Sync` so that a
/// single instance can be shared by every generation worker.
pub trait RecordGenerator: Send + Sync {
    fn generate(&self, index: usize) -> UserRecord;
}

/// Generates a user with a random activity log after a simulated delay.
///
/// Randomness comes from the worker RNG, so seeded runs are reproducible per
/// worker.
#[derive(Debug, Clone)]
pub struct ActivityGenerator {
    delay: Duration,
    max_log_entries: usize,
}

impl ActivityGenerator {
    pub fn new(delay: Duration, max_log_entries: usize) -> Self {
        Self {
            delay,
            max_log_entries,
        }
    }
}

impl RecordGenerator for ActivityGenerator {
    fn generate(&self, index: usize) -> UserRecord {
        let id = index + 1;
        let count = worker_gen_range(0..self.max_log_entries);
        let activity = (0..count)
            .map(|_| ActivityEntry {
                action: Action::ALL[worker_gen_range(0..Action::ALL.len())],
                timestamp: Utc::now(),
            })
            .collect();

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        UserRecord::new(id, email_for(id), activity)
    }
}

/// Deterministic generator producing identity-only records with no latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityGenerator;

impl RecordGenerator for IdentityGenerator {
    fn generate(&self, index: usize) -> UserRecord {
        UserRecord::identity(index + 1)
    }
}

#[cfg(test)]
mod record_test {
    use super::*;
    use crate::pipeline::common::thread::init_worker_rng;

    #[test]
    fn test_generated_id_is_one_based() {
        let record = IdentityGenerator.generate(0);
        assert_eq!(record.id(), 1);
        assert_eq!(record.email(), "user1@company.com");
        assert!(record.activity().is_empty());
    }

    #[test]
    fn test_activity_log_respects_bound() {
        let generator = ActivityGenerator::new(Duration::ZERO, 5);
        for index in 0..50 {
            let record = generator.generate(index);
            assert_eq!(record.id(), index + 1);
            assert!(record.activity().len() < 5);
        }
    }

    #[test]
    fn test_seeded_generation_repeats_log_shape() {
        let generator = ActivityGenerator::new(Duration::ZERO, 100);

        init_worker_rng(0, 0, 7);
        let first: Vec<Vec<Action>> = (0..5)
            .map(|i| generator.generate(i).activity().iter().map(|e| e.action).collect())
            .collect();

        init_worker_rng(0, 0, 7);
        let second: Vec<Vec<Action>> = (0..5)
            .map(|i| generator.generate(i).activity().iter().map(|e| e.action).collect())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_activity_info_lists_every_entry() {
        let timestamp = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let record = UserRecord::new(
            3,
            "user3@company.com",
            vec![
                ActivityEntry {
                    action: Action::LoggedIn,
                    timestamp,
                },
                ActivityEntry {
                    action: Action::DeletedRecord,
                    timestamp,
                },
            ],
        );

        let info = record.activity_info();
        assert!(info.starts_with("UID: 3; Email: user3@company.com;\nActivity Log:\n"));
        assert!(info.contains("0. [logged in] at 1970-01-01T00:00:00+00:00"));
        assert!(info.contains("1. [deleted record] at 1970-01-01T00:00:00+00:00"));
    }
}
