//! Runtime event stream payloads.

use crate::types::{ProblemId, SubmissionId};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeEvent {
    /// A session was opened.
    LoggedIn {
        /// Account that logged in.
        username: String,
    },
    /// A session was closed by its owner.
    LoggedOut,
    /// A password hash was replaced.
    PasswordChanged,
    /// A nickname was replaced.
    NicknameChanged {
        /// Affected account.
        username: String,
    },
    /// A problem was created.
    ProblemCreated {
        /// New problem id.
        id: ProblemId,
    },
    /// A problem was edited.
    ProblemUpdated {
        /// Edited problem id.
        id: ProblemId,
    },
    /// A problem was deleted.
    ProblemDeleted {
        /// Deleted problem id.
        id: ProblemId,
    },
    /// A submission was graded and recorded.
    SubmissionCreated {
        /// New submission id.
        id: SubmissionId,
        /// Problem it was submitted against.
        pid: ProblemId,
    },
    /// The store has durably written this many snapshots.
    DurableUpTo {
        /// Durable write count since open.
        generation: u64,
    },
}
