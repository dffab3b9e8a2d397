//! Shared primitive IDs and judge-related enums.

use serde::{Deserialize, Serialize};

/// Monotonic problem identifier.
pub type ProblemId = u64;
/// Monotonic submission identifier.
pub type SubmissionId = u64;
/// Opaque session token handed to the caller at login.
pub type SessionToken = String;

/// Capability class of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can read problems and submit code.
    Student,
    /// Can additionally author, edit and delete problems.
    Teacher,
}

impl Role {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

/// Synthetic grading outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Program produced the expected output.
    #[serde(rename = "Accepted")]
    Accepted,
    /// Program produced wrong output.
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    /// Program ran over its time limit.
    #[serde(rename = "Time Limit Exceed")]
    TimeLimitExceeded,
    /// Program ran over its memory limit.
    #[serde(rename = "Memory Limit Exceed")]
    MemoryLimitExceeded,
    /// Program failed to compile.
    #[serde(rename = "Compile Error")]
    CompileError,
    /// Program crashed.
    #[serde(rename = "Runtime Error")]
    RuntimeError,
}

impl Verdict {
    /// Every verdict, in vocabulary order.
    pub const ALL: [Verdict; 6] = [
        Verdict::Accepted,
        Verdict::WrongAnswer,
        Verdict::TimeLimitExceeded,
        Verdict::MemoryLimitExceeded,
        Verdict::CompileError,
        Verdict::RuntimeError,
    ];

    /// Literal string stored in the database file.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::TimeLimitExceeded => "Time Limit Exceed",
            Verdict::MemoryLimitExceeded => "Memory Limit Exceed",
            Verdict::CompileError => "Compile Error",
            Verdict::RuntimeError => "Runtime Error",
        }
    }
}
