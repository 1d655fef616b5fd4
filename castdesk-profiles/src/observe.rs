//! Operation outcome reporting
//!
//! The reconciler reports every public operation's outcome to an injected
//! [`Observer`]. Observers never influence control flow.

use castdesk_common::Error;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetProfile,
    CreateProfile,
    UpdateProfile,
    SaveQuestionnaireResponses,
    GetQuestionnaireResponses,
    EnsureProfile,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::GetProfile,
        Operation::CreateProfile,
        Operation::UpdateProfile,
        Operation::SaveQuestionnaireResponses,
        Operation::GetQuestionnaireResponses,
        Operation::EnsureProfile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GetProfile => "get_profile",
            Operation::CreateProfile => "create_profile",
            Operation::UpdateProfile => "update_profile",
            Operation::SaveQuestionnaireResponses => "save_questionnaire_responses",
            Operation::GetQuestionnaireResponses => "get_questionnaire_responses",
            Operation::EnsureProfile => "ensure_profile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Read found a record
    Found,
    /// Read found nothing; a valid answer for a fresh subject
    Missing,
    /// New row inserted
    Created,
    /// Create found an existing row and merged into it instead
    Redirected,
    /// Existing row merged and written
    Updated,
    /// Update target does not exist
    NotFound,
    /// Payload rejected before touching the datastore
    Rejected,
    /// Datastore failure propagated to the caller
    Failed,
}

impl Outcome {
    pub const ALL: [Outcome; 8] = [
        Outcome::Found,
        Outcome::Missing,
        Outcome::Created,
        Outcome::Redirected,
        Outcome::Updated,
        Outcome::NotFound,
        Outcome::Rejected,
        Outcome::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Found => "found",
            Outcome::Missing => "missing",
            Outcome::Created => "created",
            Outcome::Redirected => "redirected",
            Outcome::Updated => "updated",
            Outcome::NotFound => "not_found",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        }
    }

    /// Outcome for an operation that failed with `err`
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::NotFound(_) => Outcome::NotFound,
            Error::MalformedPayload(_) | Error::Config(_) => Outcome::Rejected,
            _ => Outcome::Failed,
        }
    }
}

pub trait Observer: Send + Sync {
    fn record(&self, operation: Operation, outcome: Outcome, subject_id: &str);
}

/// Emits one structured tracing event per operation
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn record(&self, operation: Operation, outcome: Outcome, subject_id: &str) {
        let op = operation.as_str();
        let result = outcome.as_str();
        match outcome {
            Outcome::Failed => error!(operation = op, outcome = result, subject_id, "Profile operation failed"),
            Outcome::Rejected | Outcome::NotFound => {
                warn!(operation = op, outcome = result, subject_id, "Profile operation refused")
            }
            Outcome::Found | Outcome::Missing => {
                debug!(operation = op, outcome = result, subject_id, "Profile read")
            }
            Outcome::Created | Outcome::Redirected | Outcome::Updated => {
                info!(operation = op, outcome = result, subject_id, "Profile written")
            }
        }
    }
}

/// One row of [`CountingObserver::snapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationCount {
    pub operation: Operation,
    pub outcome: Outcome,
    pub count: u64,
}

/// Counts outcomes per operation and forwards each event to tracing
///
/// One lock-free counter per (operation, outcome) pair.
#[derive(Debug, Default)]
pub struct CountingObserver {
    counts: [[AtomicU64; Outcome::ALL.len()]; Operation::ALL.len()],
    tracing: TracingObserver,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, operation: Operation, outcome: Outcome) -> &AtomicU64 {
        &self.counts[operation as usize][outcome as usize]
    }

    pub fn count(&self, operation: Operation, outcome: Outcome) -> u64 {
        self.counter(operation, outcome).load(Ordering::Relaxed)
    }

    /// All non-zero counters, ordered by operation then outcome
    pub fn snapshot(&self) -> Vec<OperationCount> {
        Operation::ALL
            .iter()
            .flat_map(|&operation| {
                Outcome::ALL.iter().map(move |&outcome| (operation, outcome))
            })
            .filter_map(|(operation, outcome)| {
                let count = self.count(operation, outcome);
                (count > 0).then_some(OperationCount {
                    operation,
                    outcome,
                    count,
                })
            })
            .collect()
    }
}

impl Observer for CountingObserver {
    fn record(&self, operation: Operation, outcome: Outcome, subject_id: &str) {
        self.counter(operation, outcome).fetch_add(1, Ordering::Relaxed);
        self.tracing.record(operation, outcome, subject_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_error() {
        assert_eq!(Outcome::from_error(&Error::NotFound("x".into())), Outcome::NotFound);
        assert_eq!(
            Outcome::from_error(&Error::MalformedPayload("x".into())),
            Outcome::Rejected
        );
        assert_eq!(
            Outcome::from_error(&Error::AlreadyExists("x".into())),
            Outcome::Failed
        );
    }

    #[test]
    fn test_counting_observer_accumulates() {
        let observer = CountingObserver::new();
        observer.record(Operation::CreateProfile, Outcome::Created, "u1");
        observer.record(Operation::CreateProfile, Outcome::Redirected, "u1");
        observer.record(Operation::CreateProfile, Outcome::Redirected, "u1");
        observer.record(Operation::GetProfile, Outcome::Missing, "u2");

        assert_eq!(observer.count(Operation::CreateProfile, Outcome::Redirected), 2);
        assert_eq!(observer.count(Operation::UpdateProfile, Outcome::Updated), 0);

        let snapshot = observer.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].operation, Operation::GetProfile);
        assert_eq!(snapshot[1].outcome, Outcome::Created);
    }

    #[test]
    fn test_counter_slots_are_distinct() {
        // Each pair must land in its own slot
        let observer = CountingObserver::new();
        for operation in Operation::ALL {
            for outcome in Outcome::ALL {
                observer.record(operation, outcome, "u1");
            }
        }
        observer.record(Operation::EnsureProfile, Outcome::Failed, "u1");

        let snapshot = observer.snapshot();
        assert_eq!(snapshot.len(), Operation::ALL.len() * Outcome::ALL.len());
        assert!(snapshot[..snapshot.len() - 1].iter().all(|row| row.count == 1));
        assert_eq!(observer.count(Operation::EnsureProfile, Outcome::Failed), 2);
    }

    #[test]
    fn test_concurrent_records_are_all_counted() {
        let observer = std::sync::Arc::new(CountingObserver::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let observer = observer.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        observer.record(Operation::UpdateProfile, Outcome::Updated, "u1");
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(observer.count(Operation::UpdateProfile, Outcome::Updated), 2000);
    }
}
