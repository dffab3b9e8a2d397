use tracing::debug;

use crate::{record::Submission, types::Role};

use super::{AuthError, session::Session};

/// Single decision point for every authorization check.
///
/// Collections know nothing about roles; callers pass the resolved session
/// (or `None` for an anonymous caller) through one of these checks first.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Passes any live session; `None` is `Unauthenticated`.
    pub fn require_authenticated(session: Option<&Session>) -> Result<&Session, AuthError> {
        session.ok_or(AuthError::Unauthenticated)
    }

    /// Passes a live session holding `role`; any other role is `Forbidden`.
    pub fn require_role(session: Option<&Session>, role: Role) -> Result<&Session, AuthError> {
        let session = Self::require_authenticated(session)?;
        if session.role != role {
            debug!(username = %session.username, required = role.as_str(), "role check denied");
            return Err(AuthError::Forbidden(format!(
                "requires role {}",
                role.as_str()
            )));
        }
        Ok(session)
    }

    /// Submissions are visible to their author and to teachers.
    pub fn require_submitter_or_teacher(
        session: &Session,
        submission: &Submission,
    ) -> Result<(), AuthError> {
        if submission.username == session.username || session.role == Role::Teacher {
            return Ok(());
        }
        debug!(username = %session.username, submission = submission.id, "ownership check denied");
        Err(AuthError::Forbidden(
            "only submitter and teacher can see this submission".to_string(),
        ))
    }
}
