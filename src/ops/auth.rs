use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::model::PermissionSet;
use crate::store::UserRepo;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 210_000;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Result of a sign-in attempt. Failure always carries an empty permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub ok: bool,
    pub permissions: PermissionSet,
}

impl AuthOutcome {
    pub fn denied() -> Self {
        AuthOutcome {
            ok: false,
            permissions: PermissionSet::new(),
        }
    }
}

/// Hash a password with a fresh random salt.
///
/// Format: `pbkdf2-sha256$<iterations>$<salt b64>$<key b64>`
pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = derive_key(password, &salt, iterations);
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        B64.encode(salt),
        B64.encode(key)
    )
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(key), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (B64.decode(salt), B64.decode(key)) else {
        return false;
    };
    if iterations == 0 || expected.len() != KEY_LEN {
        return false;
    }
    let actual = derive_key(password, &salt, iterations);
    constant_time_eq(&actual, &expected)
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verify credentials against the users table.
///
/// Lookup and parse errors are logged and reported as a failed sign-in; they
/// never reach the caller.
pub fn authenticate(users: &dyn UserRepo, username: &str, password: &str) -> AuthOutcome {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return AuthOutcome::denied();
    }
    let creds = match users.find_credentials(username) {
        Ok(Some(creds)) => creds,
        Ok(None) => {
            tracing::info!(user = username, "sign-in rejected: unknown user");
            return AuthOutcome::denied();
        }
        Err(e) => {
            tracing::warn!(user = username, error = %e, "sign-in lookup failed");
            return AuthOutcome::denied();
        }
    };
    if !verify_password(password, &creds.password_hash) {
        tracing::info!(user = username, "sign-in rejected: bad password");
        return AuthOutcome::denied();
    }
    tracing::info!(user = username, "signed in");
    AuthOutcome {
        ok: true,
        permissions: creds.permissions,
    }
}
