use chrono::{DateTime, Duration, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    directory::UserDirectory,
    types::{Role, SessionToken},
};

use super::{AuthError, credential};

/// Fixed maximum session age.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 86_400;

/// Identity snapshot taken at login.
///
/// The nickname is copied, not referenced: later changes made through a
/// different session are not reflected here until re-login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token.
    pub token: SessionToken,
    /// Account the session belongs to.
    pub username: String,
    /// Nickname as of login, or as last changed through this session.
    pub nickname: String,
    /// Role as of login.
    pub role: Role,
    /// Login instant.
    pub issued_at: DateTime<Utc>,
    /// Instant the session stops resolving. Activity does not extend it.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// True once `now` has reached `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Live sessions keyed by token.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: HashMap<SessionToken, Session>,
    ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}

impl SessionRegistry {
    /// Empty registry issuing sessions that live for `ttl`. A non-positive
    /// `ttl` makes every session expire on creation; configs reject it.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Lifetime given to new sessions.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live and not yet purged sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is held.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Verifies the password and opens a new session.
    pub fn login(
        &mut self,
        directory: &UserDirectory<'_>,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.login_at(directory, username, password, Utc::now())
    }

    /// [`SessionRegistry::login`] at a fixed instant. The expiry saturates
    /// at the latest representable time.
    pub fn login_at(
        &mut self,
        directory: &UserDirectory<'_>,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let user = directory
            .find_user(username)
            .map_err(|_| AuthError::UserNotFound(username.to_string()))?;
        if !credential::verify(user, password) {
            debug!(username, "login rejected");
            return Err(AuthError::InvalidCredential);
        }

        let session = Session {
            token: Uuid::new_v4().to_string(),
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            role: user.role,
            issued_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        info!(username, role = session.role.as_str(), "session opened");
        Ok(session)
    }

    /// Destroys the session. Returns false if the token was not live.
    pub fn logout(&mut self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some(s) => {
                info!(username = %s.username, "session closed");
                true
            }
            None => false,
        }
    }

    /// Looks up a live session at the current time.
    pub fn resolve(&mut self, token: &str) -> Option<&Session> {
        self.resolve_at(token, Utc::now())
    }

    /// Looks up a live session, dropping it if it has expired by `now`.
    pub fn resolve_at(&mut self, token: &str, now: DateTime<Utc>) -> Option<&Session> {
        let expired = self.sessions.get(token)?.is_expired_at(now);
        if expired {
            self.sessions.remove(token);
            debug!("expired session dropped");
            return None;
        }
        self.sessions.get(token)
    }

    /// Overwrites the nickname carried by one session.
    pub fn set_nickname(&mut self, token: &str, nickname: &str) -> bool {
        match self.sessions.get_mut(token) {
            Some(s) => {
                s.nickname = nickname.to_string();
                true
            }
            None => false,
        }
    }

    /// Drops every session expired by `now`, returning how many went.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        before - self.sessions.len()
    }
}
