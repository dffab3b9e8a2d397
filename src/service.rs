//! The judge operations, one guard-clause method per endpoint.
//!
//! Each method resolves the caller's session, runs it through the
//! [`AuthorizationGate`], validates its inputs and only then touches a
//! collection. Any failure returns immediately; nothing runs past an error.
//!
//! | Operation | Requirement |
//! |---|---|
//! | `login` | none |
//! | `logout`, `change_password`, `change_nickname` | authenticated |
//! | `list_problems`, `get_problem` | authenticated |
//! | `create_problem`, `update_problem`, `delete_problem` | teacher |
//! | `list_submissions`, `create_submission`, `get_user` | authenticated |
//! | `get_submission` | authenticated, submitter or teacher |

use chrono::Utc;
use tracing::debug;

use crate::{
    auth::{
        credential,
        gate::AuthorizationGate,
        session::{Session, SessionRegistry},
    },
    catalog::ProblemCatalog,
    core::store::{DocumentStore, StoreError},
    directory::UserDirectory,
    error::{CredentialCheck, JudgeError},
    grading::{random::RandomGrader, traits::GradeSource},
    ledger::SubmissionLedger,
    record::{Problem, ProblemPatch, Submission, UserProfile},
    types::{ProblemId, Role, SubmissionId},
};

/// Owns the store, the live sessions and the grade source.
pub struct JudgeService {
    store: DocumentStore,
    sessions: SessionRegistry,
    grader: Box<dyn GradeSource>,
}

impl JudgeService {
    /// Service with an entropy-seeded grader.
    pub fn new(store: DocumentStore, sessions: SessionRegistry) -> Self {
        Self::with_grader(store, sessions, Box::new(RandomGrader::from_entropy()))
    }

    /// Service drawing grades from `grader`.
    pub fn with_grader(
        store: DocumentStore,
        sessions: SessionRegistry,
        grader: Box<dyn GradeSource>,
    ) -> Self {
        Self {
            store,
            sessions,
            grader,
        }
    }

    /// Read access to the document store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Read access to the live sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Opens a session. Unknown users are 404, wrong passwords 401.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Session, JudgeError> {
        require_non_empty("username", username)?;
        require_non_empty("password", password)?;
        let directory = UserDirectory::new(&mut self.store);
        Ok(self.sessions.login(&directory, username, password)?)
    }

    /// Ends the caller's session.
    pub fn logout(&mut self, token: &str) -> Result<(), JudgeError> {
        self.authenticated(token)?;
        self.sessions.logout(token);
        Ok(())
    }

    /// Replaces the caller's password after checking the old one (403 on mismatch).
    pub fn change_password(
        &mut self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), JudgeError> {
        let session = self.authenticated(token)?;
        require_non_empty("oldPassword", old_password)?;
        require_non_empty("newPassword", new_password)?;

        let directory = UserDirectory::new(&mut self.store);
        let user = directory
            .find_user(&session.username)
            .map_err(|e| not_found(e, "no such user"))?;
        if !credential::verify(user, old_password) {
            return Err(JudgeError::InvalidCredential(CredentialCheck::PasswordChange));
        }
        credential::change_password(&mut self.store, &session.username, new_password)?;
        Ok(())
    }

    /// Every problem.
    pub fn list_problems(&mut self, token: &str) -> Result<Vec<Problem>, JudgeError> {
        self.authenticated(token)?;
        Ok(ProblemCatalog::new(&mut self.store).list().to_vec())
    }

    /// One problem by id.
    pub fn get_problem(&mut self, token: &str, id: ProblemId) -> Result<Problem, JudgeError> {
        self.authenticated(token)?;
        ProblemCatalog::new(&mut self.store)
            .get(id)
            .cloned()
            .map_err(|e| not_found(e, "no such problem"))
    }

    /// Teacher only. Both fields must be non-empty.
    pub fn create_problem(
        &mut self,
        token: &str,
        title: &str,
        content: &str,
    ) -> Result<ProblemId, JudgeError> {
        self.with_role(token, Role::Teacher)?;
        require_non_empty("title", title)?;
        require_non_empty("content", content)?;
        Ok(ProblemCatalog::new(&mut self.store).create(title, content)?)
    }

    /// Teacher only. At least one field must be given.
    pub fn update_problem(
        &mut self,
        token: &str,
        id: ProblemId,
        patch: &ProblemPatch,
    ) -> Result<Problem, JudgeError> {
        self.with_role(token, Role::Teacher)?;
        if patch.is_empty() {
            return Err(JudgeError::Validation(
                "make sure at least one is provided (title or content)".to_string(),
            ));
        }
        if let Some(title) = &patch.title {
            require_non_empty("title", title)?;
        }
        if let Some(content) = &patch.content {
            require_non_empty("content", content)?;
        }
        ProblemCatalog::new(&mut self.store)
            .update(id, patch)
            .map_err(|e| not_found(e, "no such problem"))
    }

    /// Teacher only. The id is retired.
    pub fn delete_problem(&mut self, token: &str, id: ProblemId) -> Result<(), JudgeError> {
        self.with_role(token, Role::Teacher)?;
        if !ProblemCatalog::new(&mut self.store).delete(id)? {
            return Err(JudgeError::NotFound("no such problem".to_string()));
        }
        Ok(())
    }

    /// Every submission.
    pub fn list_submissions(&mut self, token: &str) -> Result<Vec<Submission>, JudgeError> {
        self.authenticated(token)?;
        Ok(SubmissionLedger::new(&mut self.store).list().to_vec())
    }

    /// One submission, visible to its author and to teachers.
    pub fn get_submission(&mut self, token: &str, id: SubmissionId) -> Result<Submission, JudgeError> {
        let session = self.authenticated(token)?;
        let ledger = SubmissionLedger::new(&mut self.store);
        let submission = ledger.get(id).map_err(|e| not_found(e, "no such submission"))?;
        AuthorizationGate::require_submitter_or_teacher(&session, submission)?;
        Ok(submission.clone())
    }

    /// Records a graded submission against an existing problem.
    pub fn create_submission(
        &mut self,
        token: &str,
        pid: ProblemId,
        code: &str,
    ) -> Result<SubmissionId, JudgeError> {
        let session = self.authenticated(token)?;
        require_non_empty("code", code)?;
        ProblemCatalog::new(&mut self.store)
            .get(pid)
            .map_err(|e| not_found(e, "no such problem"))?;
        Ok(SubmissionLedger::new(&mut self.store).create(
            self.grader.as_mut(),
            pid,
            code,
            &session.username,
        )?)
    }

    /// Public profile of `username`.
    pub fn get_user(&mut self, token: &str, username: &str) -> Result<UserProfile, JudgeError> {
        self.authenticated(token)?;
        require_non_empty("username", username)?;
        UserDirectory::new(&mut self.store)
            .profile(username)
            .map_err(|e| not_found(e, "no such user"))
    }

    /// Updates the stored nickname and the caller's own session. Other live
    /// sessions of the same user keep their old snapshot until re-login.
    ///
    /// A failed flush still leaves the new nickname in memory, so the
    /// caller's session is patched before the storage error is returned.
    pub fn change_nickname(&mut self, token: &str, nickname: &str) -> Result<UserProfile, JudgeError> {
        let session = self.authenticated(token)?;
        require_non_empty("newNickname", nickname)?;
        let mut directory = UserDirectory::new(&mut self.store);
        let changed = directory.change_nickname(&session.username, nickname);
        if !matches!(changed, Err(StoreError::NotFound { .. })) {
            self.sessions.set_nickname(token, nickname);
        }
        changed.map_err(|e| not_found(e, "no such user"))?;
        Ok(directory.profile(&session.username)?)
    }

    /// Drops expired sessions now instead of waiting for their next lookup.
    pub fn purge_expired_sessions(&mut self) -> usize {
        self.sessions.purge_expired(Utc::now())
    }

    /// Forces a full durable write of the current state.
    pub fn flush(&mut self) -> Result<(), JudgeError> {
        Ok(self.store.flush()?)
    }

    fn authenticated(&mut self, token: &str) -> Result<Session, JudgeError> {
        let session = AuthorizationGate::require_authenticated(self.sessions.resolve(token))?;
        Ok(session.clone())
    }

    fn with_role(&mut self, token: &str, role: Role) -> Result<Session, JudgeError> {
        let session = AuthorizationGate::require_role(self.sessions.resolve(token), role)?;
        Ok(session.clone())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), JudgeError> {
    if value.is_empty() {
        debug!(field, "validation failed");
        return Err(JudgeError::Validation(format!("{field} must be a non-empty string")));
    }
    Ok(())
}

fn not_found(e: StoreError, message: &str) -> JudgeError {
    match e {
        StoreError::NotFound { .. } => JudgeError::NotFound(message.to_string()),
        other => other.into(),
    }
}
