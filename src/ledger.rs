//! Append-only submission ledger.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::{
    core::store::{DocumentStore, StoreError},
    grading::traits::GradeSource,
    record::Submission,
    types::{ProblemId, SubmissionId},
};

/// Reads and appends over the `submissions` collection.
///
/// `pid` and `username` are stored as given; checking that they refer to
/// existing records is up to the caller.
pub struct SubmissionLedger<'a> {
    store: &'a mut DocumentStore,
}

impl<'a> SubmissionLedger<'a> {
    /// View over `store`.
    pub fn new(store: &'a mut DocumentStore) -> Self {
        Self { store }
    }

    /// Every submission in insertion order.
    pub fn list(&self) -> &[Submission] {
        self.store.list::<Submission>()
    }

    /// The submission with `id`.
    pub fn get(&self, id: SubmissionId) -> Result<&Submission, StoreError> {
        self.store.find::<Submission>(|s| s.id == id)
    }

    /// Grades and records a submission stamped with the current time.
    pub fn create(
        &mut self,
        grader: &mut dyn GradeSource,
        pid: ProblemId,
        code: &str,
        username: &str,
    ) -> Result<SubmissionId, StoreError> {
        self.create_at(grader, pid, code, username, Utc::now())
    }

    /// [`SubmissionLedger::create`] with a fixed timestamp.
    pub fn create_at(
        &mut self,
        grader: &mut dyn GradeSource,
        pid: ProblemId,
        code: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<SubmissionId, StoreError> {
        let grade = grader.grade();
        let id = self.store.insert(Submission {
            id: 0,
            pid,
            code: code.to_string(),
            username: username.to_string(),
            result: grade.result,
            runtime: grade.runtime,
            memory: grade.memory,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        })?;
        info!(id, pid, username, result = grade.result.as_str(), "submission recorded");
        Ok(id)
    }
}
