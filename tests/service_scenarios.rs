use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use ojmock::{
    auth::{credential, session::SessionRegistry},
    core::store::{DatabaseSnapshot, DocumentStore},
    error::{CredentialCheck, JudgeError, error_code},
    grading::traits::{MEMORY_LIMIT_KB, RUNTIME_LIMIT_MS},
    persist::{PersistError, PersistResult, SnapshotSink},
    record::{Grade, ProblemPatch, User},
    service::JudgeService,
    types::{Role, Verdict},
};

fn seed() -> DatabaseSnapshot {
    DatabaseSnapshot {
        users: vec![
            credential::provision("alice", "Alice", Role::Teacher, "pw123"),
            credential::provision("bob", "Bob", Role::Student, "hunter2"),
            credential::provision("carol", "Carol", Role::Student, "s3cret"),
        ],
        ..DatabaseSnapshot::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn service() -> JudgeService {
    init_tracing();
    JudgeService::new(DocumentStore::in_memory(seed()), SessionRegistry::default())
}

fn fixed_grader() -> JudgeService {
    JudgeService::with_grader(
        DocumentStore::in_memory(seed()),
        SessionRegistry::default(),
        Box::new(|| Grade {
            result: Verdict::TimeLimitExceeded,
            runtime: 1_499,
            memory: 7,
        }),
    )
}

fn token(svc: &mut JudgeService, username: &str, password: &str) -> String {
    svc.login(username, password).expect("login").token
}

fn status(err: &JudgeError) -> (u16, &'static str) {
    (err.status_code(), err.error_code())
}

#[test]
fn teacher_login_and_problem_authoring() {
    let mut svc = service();
    let session = svc.login("alice", "pw123").expect("login");
    assert_eq!(session.username, "alice");
    assert_eq!(session.nickname, "Alice");
    assert_eq!(session.role, Role::Teacher);

    let id = svc.create_problem(&session.token, "Two Sum", "desc").expect("create");
    assert_eq!(id, 1);
    let problems = svc.list_problems(&session.token).expect("list");
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].title, "Two Sum");

    let updated = svc
        .update_problem(
            &session.token,
            id,
            &ProblemPatch {
                content: Some("new body".to_string()),
                ..ProblemPatch::default()
            },
        )
        .expect("update");
    assert_eq!(updated.title, "Two Sum");
    assert_eq!(updated.content, "new body");
    assert_eq!(svc.get_problem(&session.token, id).expect("get"), updated);

    svc.delete_problem(&session.token, id).expect("delete");
    let err = svc.get_problem(&session.token, id).unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));
}

#[test]
fn login_failures() {
    let mut svc = service();

    let err = svc.login("alice", "wrongpw").unwrap_err();
    assert!(matches!(err, JudgeError::InvalidCredential(CredentialCheck::Login)));
    assert_eq!(status(&err), (401, error_code::INVALID_CREDENTIAL));

    let err = svc.login("mallory", "pw").unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));
    assert_eq!(err.to_string(), "can not find user: mallory");

    let err = svc.login("", "pw").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));
    let err = svc.login("alice", "").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));

    assert!(svc.sessions().is_empty());
}

#[test]
fn anonymous_callers_are_rejected_everywhere() {
    let mut svc = service();
    let bogus = "not-a-token";

    let errors = [
        svc.list_problems(bogus).unwrap_err(),
        svc.get_problem(bogus, 1).unwrap_err(),
        svc.create_problem(bogus, "t", "c").unwrap_err(),
        svc.delete_problem(bogus, 1).unwrap_err(),
        svc.list_submissions(bogus).unwrap_err(),
        svc.get_submission(bogus, 1).unwrap_err(),
        svc.create_submission(bogus, 1, "code").unwrap_err(),
        svc.get_user(bogus, "alice").unwrap_err(),
        svc.change_nickname(bogus, "x").unwrap_err(),
        svc.change_password(bogus, "a", "b").unwrap_err(),
        svc.logout(bogus).unwrap_err(),
    ];
    for err in errors {
        assert_eq!(status(&err), (401, error_code::UNAUTHENTICATED));
    }
}

#[test]
fn students_cannot_author_problems() {
    let mut svc = service();
    let teacher = token(&mut svc, "alice", "pw123");
    let student = token(&mut svc, "bob", "hunter2");
    let id = svc.create_problem(&teacher, "A", "a").expect("create");

    let err = svc.create_problem(&student, "B", "b").unwrap_err();
    assert_eq!(status(&err), (403, error_code::PERMISSION_DENIED));
    let patch = ProblemPatch {
        title: Some("hijack".to_string()),
        ..ProblemPatch::default()
    };
    let err = svc.update_problem(&student, id, &patch).unwrap_err();
    assert_eq!(status(&err), (403, error_code::PERMISSION_DENIED));
    let err = svc.delete_problem(&student, id).unwrap_err();
    assert_eq!(status(&err), (403, error_code::PERMISSION_DENIED));

    // Students can still read.
    assert_eq!(svc.get_problem(&student, id).expect("get").title, "A");
    assert_eq!(svc.list_problems(&student).expect("list").len(), 1);
}

#[test]
fn problem_validation_and_lookup() {
    let mut svc = service();
    let teacher = token(&mut svc, "alice", "pw123");

    let err = svc.create_problem(&teacher, "", "c").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));
    let err = svc.create_problem(&teacher, "t", "").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));

    let id = svc.create_problem(&teacher, "t", "c").expect("create");
    let err = svc.update_problem(&teacher, id, &ProblemPatch::default()).unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));

    // Validation runs before lookup.
    let err = svc.update_problem(&teacher, 99, &ProblemPatch::default()).unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));

    let patch = ProblemPatch {
        title: Some("x".to_string()),
        ..ProblemPatch::default()
    };
    let err = svc.update_problem(&teacher, 99, &patch).unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));
    let err = svc.delete_problem(&teacher, 99).unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));
    let err = svc.get_problem(&teacher, 99).unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));
}

#[test]
fn submission_flow_and_visibility() {
    let mut svc = service();
    let teacher = token(&mut svc, "alice", "pw123");
    let bob = token(&mut svc, "bob", "hunter2");
    let carol = token(&mut svc, "carol", "s3cret");

    svc.create_problem(&teacher, "A", "a").expect("p1");
    let pid = svc.create_problem(&teacher, "B", "b").expect("p2");
    assert_eq!(pid, 2);

    let err = svc.create_submission(&bob, 42, "code").unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));
    let err = svc.create_submission(&bob, pid, "").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));
    assert!(svc.list_submissions(&bob).expect("list").is_empty());

    let sid = svc.create_submission(&bob, pid, "print(1)").expect("submit");
    assert_eq!(sid, 1);
    let sub = svc.get_submission(&bob, sid).expect("own submission");
    assert_eq!(sub.pid, pid);
    assert_eq!(sub.username, "bob");
    assert_eq!(sub.code, "print(1)");
    assert!(Verdict::ALL.contains(&sub.result));
    assert!(sub.runtime < RUNTIME_LIMIT_MS);
    assert!(sub.memory < MEMORY_LIMIT_KB);
    assert!(sub.timestamp.ends_with('Z'));

    let err = svc.get_submission(&carol, sid).unwrap_err();
    assert_eq!(status(&err), (403, error_code::PERMISSION_DENIED));
    assert_eq!(svc.get_submission(&teacher, sid).expect("teacher view"), sub);

    let err = svc.get_submission(&teacher, 77).unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));

    // Listing is open to every authenticated caller.
    assert_eq!(svc.list_submissions(&carol).expect("list").len(), 1);
}

#[test]
fn submissions_survive_problem_deletion() {
    let mut svc = fixed_grader();
    let teacher = token(&mut svc, "alice", "pw123");
    let bob = token(&mut svc, "bob", "hunter2");
    let pid = svc.create_problem(&teacher, "A", "a").expect("create");
    let sid = svc.create_submission(&bob, pid, "x").expect("submit");

    svc.delete_problem(&teacher, pid).expect("delete");
    let sub = svc.get_submission(&bob, sid).expect("still there");
    assert_eq!(sub.result, Verdict::TimeLimitExceeded);
    assert_eq!((sub.runtime, sub.memory), (1_499, 7));
}

#[test]
fn password_change() {
    let mut svc = service();
    let bob = token(&mut svc, "bob", "hunter2");
    let salt_before = svc.store().list::<User>()[1].salt.clone();

    let err = svc.change_password(&bob, "nope", "fresh").unwrap_err();
    assert!(matches!(
        err,
        JudgeError::InvalidCredential(CredentialCheck::PasswordChange)
    ));
    assert_eq!(status(&err), (403, error_code::INVALID_CREDENTIAL));

    let err = svc.change_password(&bob, "hunter2", "").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));

    svc.change_password(&bob, "hunter2", "fresh").expect("change");
    let user = &svc.store().list::<User>()[1];
    assert_eq!(user.salt, salt_before);
    assert_eq!(user.hash, credential::derive("fresh", &salt_before));

    // The session that changed the password stays valid.
    assert!(svc.list_problems(&bob).is_ok());
    assert!(svc.login("bob", "fresh").is_ok());
    let err = svc.login("bob", "hunter2").unwrap_err();
    assert_eq!(status(&err), (401, error_code::INVALID_CREDENTIAL));
}

#[test]
fn nickname_change_updates_profile_and_own_session_only() {
    let mut svc = service();
    let first = token(&mut svc, "bob", "hunter2");
    let second = token(&mut svc, "bob", "hunter2");
    let teacher = token(&mut svc, "alice", "pw123");

    let err = svc.change_nickname(&first, "").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));

    let profile = svc.change_nickname(&first, "Bobby").expect("change");
    assert_eq!(profile.username, "bob");
    assert_eq!(profile.nickname, "Bobby");
    assert_eq!(profile.role, Role::Student);
    assert_eq!(svc.get_user(&teacher, "bob").expect("profile").nickname, "Bobby");

    let mut sessions = svc.sessions().clone();
    assert_eq!(sessions.resolve(&first).expect("first").nickname, "Bobby");
    assert_eq!(sessions.resolve(&second).expect("second").nickname, "Bob");
}

/// Accepts writes until `broken` is set.
struct SwitchableSink {
    broken: Arc<AtomicBool>,
}

impl SnapshotSink for SwitchableSink {
    fn load_snapshot(&self) -> PersistResult<Option<DatabaseSnapshot>> {
        Ok(None)
    }

    fn write_snapshot(&mut self, _snapshot: &DatabaseSnapshot) -> PersistResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(PersistError::Message("disk full".to_string()));
        }
        Ok(())
    }
}

#[test]
fn nickname_change_keeps_own_session_in_step_when_flush_fails() {
    let broken = Arc::new(AtomicBool::new(false));
    let sink = SwitchableSink {
        broken: Arc::clone(&broken),
    };
    let store = DocumentStore::open(Box::new(sink), seed()).expect("open");
    let mut svc = JudgeService::new(store, SessionRegistry::default());
    let bob = token(&mut svc, "bob", "hunter2");

    broken.store(true, Ordering::SeqCst);
    let err = svc.change_nickname(&bob, "Bobby").unwrap_err();
    assert_eq!(status(&err), (500, error_code::STORAGE_ERROR));

    let stored = svc.store().list::<User>()[1].nickname.clone();
    let mut sessions = svc.sessions().clone();
    assert_eq!(stored, "Bobby");
    assert_eq!(sessions.resolve(&bob).expect("bob").nickname, stored);

    broken.store(false, Ordering::SeqCst);
    svc.flush().expect("retry");
    assert_eq!(svc.get_user(&bob, "bob").expect("profile").nickname, "Bobby");
}

#[test]
fn get_user_hides_credentials_and_reports_missing() {
    let mut svc = service();
    let bob = token(&mut svc, "bob", "hunter2");

    let profile = svc.get_user(&bob, "alice").expect("alice");
    assert_eq!(profile.nickname, "Alice");
    assert_eq!(profile.role, Role::Teacher);
    let json = serde_json::to_value(&profile).expect("json");
    assert!(json.get("hash").is_none());
    assert!(json.get("salt").is_none());

    let err = svc.get_user(&bob, "nobody").unwrap_err();
    assert_eq!(status(&err), (404, error_code::NOT_FOUND));
    let err = svc.get_user(&bob, "").unwrap_err();
    assert_eq!(status(&err), (400, error_code::VALIDATION_FAILED));
}

#[test]
fn logout_ends_the_session() {
    let mut svc = service();
    let bob = token(&mut svc, "bob", "hunter2");
    let other = token(&mut svc, "bob", "hunter2");

    svc.logout(&bob).expect("logout");
    let err = svc.list_problems(&bob).unwrap_err();
    assert_eq!(status(&err), (401, error_code::UNAUTHENTICATED));
    let err = svc.logout(&bob).unwrap_err();
    assert_eq!(status(&err), (401, error_code::UNAUTHENTICATED));

    assert!(svc.list_problems(&other).is_ok());
}
