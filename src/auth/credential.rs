use std::fmt::Write as _;

use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha512;
use tracing::debug;

use crate::{
    core::store::{DocumentStore, StoreError},
    record::User,
    types::Role,
};

/// PBKDF2 iteration count.
pub const ITERATIONS: u32 = 1000;
/// Derived key length in bytes; the hex digest is twice as long.
pub const KEY_LEN: usize = 64;
/// Random bytes in a freshly provisioned salt.
pub const SALT_LEN: usize = 16;

/// PBKDF2-HMAC-SHA512 over `password`, keyed by the UTF-8 bytes of `salt`,
/// as lowercase hex.
pub fn derive(password: &str, salt: &str) -> String {
    let mut out = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), ITERATIONS, &mut out);
    to_hex(&out)
}

/// True iff `candidate` reproduces the user's stored hash.
pub fn verify(user: &User, candidate: &str) -> bool {
    constant_time_eq(derive(candidate, &user.salt).as_bytes(), user.hash.as_bytes())
}

/// Re-derives the hash under the user's existing salt and persists it.
///
/// The salt is not rotated.
pub fn change_password(
    store: &mut DocumentStore,
    username: &str,
    new_password: &str,
) -> Result<(), StoreError> {
    store.mutate::<User, _>(
        |u| u.username == username,
        |u| u.hash = derive(new_password, &u.salt),
    )?;
    debug!(username, "password changed");
    Ok(())
}

/// Random hex salt for a new account.
pub fn new_salt() -> String {
    let mut buf = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut buf);
    to_hex(&buf)
}

/// Builds a seed account with a fresh salt. The store never creates users
/// itself; this is for seed files and tests.
pub fn provision(username: &str, nickname: &str, role: Role, password: &str) -> User {
    let salt = new_salt();
    let hash = derive(password, &salt);
    User {
        username: username.to_string(),
        nickname: nickname.to_string(),
        role,
        salt,
        hash,
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
