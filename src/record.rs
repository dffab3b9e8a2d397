//! Stored records for users, problems and submissions, plus drafts and patches.

use serde::{Deserialize, Serialize};

use crate::types::{ProblemId, Role, SubmissionId, Verdict};

/// Seeded user account as stored in the database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique, immutable login name.
    pub username: String,
    /// Display name.
    pub nickname: String,
    /// Capability class.
    pub role: Role,
    /// Per-user salt, fixed at provisioning.
    pub salt: String,
    /// Hex digest of the current password.
    pub hash: String,
}

impl User {
    /// Public view of this account, without credential material.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            role: self.role,
        }
    }
}

/// Credential-free user view returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Login name.
    pub username: String,
    /// Display name.
    pub nickname: String,
    /// Capability class.
    pub role: Role,
}

/// Problem statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Stable problem identifier.
    pub id: ProblemId,
    /// Short title.
    pub title: String,
    /// Statement body.
    pub content: String,
}

/// Sparse patch where each `Some` field overwrites the problem value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProblemPatch {
    /// Optional replacement title.
    pub title: Option<String>,
    /// Optional replacement statement body.
    pub content: Option<String>,
}

impl ProblemPatch {
    /// Returns true when no fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    /// Applies this patch in place to `problem`.
    pub fn apply_to(&self, problem: &mut Problem) {
        if let Some(v) = &self.title {
            problem.title = v.clone();
        }
        if let Some(v) = &self.content {
            problem.content = v.clone();
        }
    }
}

/// Synthesized grading metadata attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    /// Verdict drawn from the fixed vocabulary.
    pub result: Verdict,
    /// Reported runtime in milliseconds.
    pub runtime: u32,
    /// Reported memory in kilobytes.
    pub memory: u32,
}

/// Graded code submission. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Stable submission identifier.
    pub id: SubmissionId,
    /// Referenced problem; existence is the caller's concern.
    pub pid: ProblemId,
    /// Submitted source text.
    pub code: String,
    /// Submitting user.
    pub username: String,
    /// Synthetic verdict.
    pub result: Verdict,
    /// Runtime in milliseconds.
    pub runtime: u32,
    /// Memory in kilobytes.
    pub memory: u32,
    /// Creation instant, ISO-8601 with millisecond precision.
    pub timestamp: String,
}
