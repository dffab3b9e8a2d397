use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::{
    auth::session::Session,
    config::JudgeConfig,
    error::JudgeError,
    record::{Problem, ProblemPatch, Submission, UserProfile},
    service::JudgeService,
    types::{ProblemId, SubmissionId},
};

use super::events::JudgeEvent;

/// Failure of a call made through [`JudgeHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The operation itself failed.
    #[error(transparent)]
    Judge(#[from] JudgeError),
    /// The loop has stopped.
    #[error("judge runtime is not running")]
    ChannelClosed,
}

/// Cloneable front door to the single-writer loop.
///
/// Every operation is queued and executed one at a time against the one
/// [`JudgeService`], so no two store mutations ever interleave.
pub struct JudgeHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<JudgeEvent>,
}

impl Clone for JudgeHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, JudgeError>>;

enum Command {
    Login {
        username: String,
        password: String,
        resp: Reply<Session>,
    },
    Logout {
        token: String,
        resp: Reply<()>,
    },
    ChangePassword {
        token: String,
        old_password: String,
        new_password: String,
        resp: Reply<()>,
    },
    ListProblems {
        token: String,
        resp: Reply<Vec<Problem>>,
    },
    GetProblem {
        token: String,
        id: ProblemId,
        resp: Reply<Problem>,
    },
    CreateProblem {
        token: String,
        title: String,
        content: String,
        resp: Reply<ProblemId>,
    },
    UpdateProblem {
        token: String,
        id: ProblemId,
        patch: ProblemPatch,
        resp: Reply<Problem>,
    },
    DeleteProblem {
        token: String,
        id: ProblemId,
        resp: Reply<()>,
    },
    ListSubmissions {
        token: String,
        resp: Reply<Vec<Submission>>,
    },
    GetSubmission {
        token: String,
        id: SubmissionId,
        resp: Reply<Submission>,
    },
    CreateSubmission {
        token: String,
        pid: ProblemId,
        code: String,
        resp: Reply<SubmissionId>,
    },
    GetUser {
        token: String,
        username: String,
        resp: Reply<UserProfile>,
    },
    ChangeNickname {
        token: String,
        nickname: String,
        resp: Reply<UserProfile>,
    },
    PurgeSessions {
        resp: oneshot::Sender<usize>,
    },
    Flush {
        resp: Reply<u64>,
    },
    Shutdown {
        resp: Reply<()>,
    },
}

/// Moves `service` onto a blocking worker and returns a handle to it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_judge(service: JudgeService, config: &JudgeConfig) -> JudgeHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<JudgeEvent>(config.event_capacity.max(1));

    let events_tx_loop = events_tx.clone();

    tokio::task::spawn_blocking(move || {
        let mut service = service;
        info!("judge runtime started");
        while let Some(cmd) = cmd_rx.blocking_recv() {
            if handle_command(cmd, &mut service, &events_tx_loop) {
                break;
            }
        }
        info!("judge runtime stopped");
    });

    JudgeHandle { cmd_tx, events_tx }
}

impl JudgeHandle {
    /// New receiver for events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JudgeEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// See [`JudgeService::login`].
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Session, RuntimeError> {
        let (username, password) = (username.into(), password.into());
        Ok(self
            .request(|resp| Command::Login {
                username,
                password,
                resp,
            })
            .await??)
    }

    /// See [`JudgeService::logout`].
    pub async fn logout(&self, token: impl Into<String>) -> Result<(), RuntimeError> {
        let token = token.into();
        Ok(self.request(|resp| Command::Logout { token, resp }).await??)
    }

    /// See [`JudgeService::change_password`].
    pub async fn change_password(
        &self,
        token: impl Into<String>,
        old_password: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        let (token, old_password, new_password) = (token.into(), old_password.into(), new_password.into());
        Ok(self
            .request(|resp| Command::ChangePassword {
                token,
                old_password,
                new_password,
                resp,
            })
            .await??)
    }

    /// See [`JudgeService::list_problems`].
    pub async fn list_problems(&self, token: impl Into<String>) -> Result<Vec<Problem>, RuntimeError> {
        let token = token.into();
        Ok(self.request(|resp| Command::ListProblems { token, resp }).await??)
    }

    /// See [`JudgeService::get_problem`].
    pub async fn get_problem(&self, token: impl Into<String>, id: ProblemId) -> Result<Problem, RuntimeError> {
        let token = token.into();
        Ok(self.request(|resp| Command::GetProblem { token, id, resp }).await??)
    }

    /// See [`JudgeService::create_problem`].
    pub async fn create_problem(
        &self,
        token: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<ProblemId, RuntimeError> {
        let (token, title, content) = (token.into(), title.into(), content.into());
        Ok(self
            .request(|resp| Command::CreateProblem {
                token,
                title,
                content,
                resp,
            })
            .await??)
    }

    /// See [`JudgeService::update_problem`].
    pub async fn update_problem(
        &self,
        token: impl Into<String>,
        id: ProblemId,
        patch: ProblemPatch,
    ) -> Result<Problem, RuntimeError> {
        let token = token.into();
        Ok(self
            .request(|resp| Command::UpdateProblem {
                token,
                id,
                patch,
                resp,
            })
            .await??)
    }

    /// See [`JudgeService::delete_problem`].
    pub async fn delete_problem(&self, token: impl Into<String>, id: ProblemId) -> Result<(), RuntimeError> {
        let token = token.into();
        Ok(self.request(|resp| Command::DeleteProblem { token, id, resp }).await??)
    }

    /// See [`JudgeService::list_submissions`].
    pub async fn list_submissions(&self, token: impl Into<String>) -> Result<Vec<Submission>, RuntimeError> {
        let token = token.into();
        Ok(self.request(|resp| Command::ListSubmissions { token, resp }).await??)
    }

    /// See [`JudgeService::get_submission`].
    pub async fn get_submission(
        &self,
        token: impl Into<String>,
        id: SubmissionId,
    ) -> Result<Submission, RuntimeError> {
        let token = token.into();
        Ok(self.request(|resp| Command::GetSubmission { token, id, resp }).await??)
    }

    /// See [`JudgeService::create_submission`].
    pub async fn create_submission(
        &self,
        token: impl Into<String>,
        pid: ProblemId,
        code: impl Into<String>,
    ) -> Result<SubmissionId, RuntimeError> {
        let (token, code) = (token.into(), code.into());
        Ok(self
            .request(|resp| Command::CreateSubmission {
                token,
                pid,
                code,
                resp,
            })
            .await??)
    }

    /// See [`JudgeService::get_user`].
    pub async fn get_user(
        &self,
        token: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<UserProfile, RuntimeError> {
        let (token, username) = (token.into(), username.into());
        Ok(self
            .request(|resp| Command::GetUser {
                token,
                username,
                resp,
            })
            .await??)
    }

    /// See [`JudgeService::change_nickname`].
    pub async fn change_nickname(
        &self,
        token: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Result<UserProfile, RuntimeError> {
        let (token, nickname) = (token.into(), nickname.into());
        Ok(self
            .request(|resp| Command::ChangeNickname {
                token,
                nickname,
                resp,
            })
            .await??)
    }

    /// Drops expired sessions and returns how many went.
    pub async fn purge_expired_sessions(&self) -> Result<usize, RuntimeError> {
        self.request(|resp| Command::PurgeSessions { resp }).await
    }

    /// Forces a durable write and returns the store's durable generation.
    pub async fn flush(&self) -> Result<u64, RuntimeError> {
        Ok(self.request(|resp| Command::Flush { resp }).await??)
    }

    /// Flushes and stops the loop. Later calls fail with `ChannelClosed`.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        Ok(self.request(|resp| Command::Shutdown { resp }).await??)
    }
}

fn handle_command(
    cmd: Command,
    service: &mut JudgeService,
    events_tx: &broadcast::Sender<JudgeEvent>,
) -> bool {
    let generation_before = service.store().durable_generation();
    let mut done = false;

    match cmd {
        Command::Login {
            username,
            password,
            resp,
        } => {
            let res = service.login(&username, &password);
            if res.is_ok() {
                let _ = events_tx.send(JudgeEvent::LoggedIn { username });
            }
            let _ = resp.send(res);
        }
        Command::Logout { token, resp } => {
            let res = service.logout(&token);
            if res.is_ok() {
                let _ = events_tx.send(JudgeEvent::LoggedOut);
            }
            let _ = resp.send(res);
        }
        Command::ChangePassword {
            token,
            old_password,
            new_password,
            resp,
        } => {
            let res = service.change_password(&token, &old_password, &new_password);
            if res.is_ok() {
                let _ = events_tx.send(JudgeEvent::PasswordChanged);
            }
            let _ = resp.send(res);
        }
        Command::ListProblems { token, resp } => {
            let _ = resp.send(service.list_problems(&token));
        }
        Command::GetProblem { token, id, resp } => {
            let _ = resp.send(service.get_problem(&token, id));
        }
        Command::CreateProblem {
            token,
            title,
            content,
            resp,
        } => {
            let res = service.create_problem(&token, &title, &content);
            if let Ok(id) = res {
                let _ = events_tx.send(JudgeEvent::ProblemCreated { id });
            }
            let _ = resp.send(res);
        }
        Command::UpdateProblem {
            token,
            id,
            patch,
            resp,
        } => {
            let res = service.update_problem(&token, id, &patch);
            if res.is_ok() {
                let _ = events_tx.send(JudgeEvent::ProblemUpdated { id });
            }
            let _ = resp.send(res);
        }
        Command::DeleteProblem { token, id, resp } => {
            let res = service.delete_problem(&token, id);
            if res.is_ok() {
                let _ = events_tx.send(JudgeEvent::ProblemDeleted { id });
            }
            let _ = resp.send(res);
        }
        Command::ListSubmissions { token, resp } => {
            let _ = resp.send(service.list_submissions(&token));
        }
        Command::GetSubmission { token, id, resp } => {
            let _ = resp.send(service.get_submission(&token, id));
        }
        Command::CreateSubmission {
            token,
            pid,
            code,
            resp,
        } => {
            let res = service.create_submission(&token, pid, &code);
            if let Ok(id) = res {
                let _ = events_tx.send(JudgeEvent::SubmissionCreated { id, pid });
            }
            let _ = resp.send(res);
        }
        Command::GetUser {
            token,
            username,
            resp,
        } => {
            let _ = resp.send(service.get_user(&token, &username));
        }
        Command::ChangeNickname {
            token,
            nickname,
            resp,
        } => {
            let res = service.change_nickname(&token, &nickname);
            if let Ok(profile) = &res {
                let _ = events_tx.send(JudgeEvent::NicknameChanged {
                    username: profile.username.clone(),
                });
            }
            let _ = resp.send(res);
        }
        Command::PurgeSessions { resp } => {
            let purged = service.purge_expired_sessions();
            debug!(purged, "expired sessions purged");
            let _ = resp.send(purged);
        }
        Command::Flush { resp } => {
            let res = service
                .flush()
                .map(|_| service.store().durable_generation());
            let _ = resp.send(res);
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(service.flush());
            done = true;
        }
    }

    let generation = service.store().durable_generation();
    if generation > generation_before {
        let _ = events_tx.send(JudgeEvent::DurableUpTo { generation });
    }
    done
}
