//! Password hashing for Console API login.
//!
//! New passwords are hashed with Argon2id (self-describing PHC string).
//! A legacy salted-SHA-256 scheme, tagged `sha256:<salt_hex>:<digest_hex>`,
//! is still verified so existing accounts keep working; a successful
//! legacy verification triggers a transparent rehash to Argon2id so the
//! legacy scheme drains out of the user table over time.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;
use objectio_common::{Error, Result};
use sha2::{Digest, Sha256};

const LEGACY_PREFIX: &str = "sha256:";

/// Hash `password` with the current (Argon2id) scheme.
pub fn hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::internal(format!("hashing password: {e}")))
}

/// Outcome of [`verify`]: whether the password matched, and whether the
/// stored hash should be rewritten because it used the legacy scheme.
pub struct VerifyOutcome {
    pub matches: bool,
    pub needs_rehash: bool,
}

/// Verify `password` against `stored_hash`, trying the modern scheme
/// first and falling back to the legacy tagged scheme.
pub fn verify(password: &str, stored_hash: &str) -> Result<VerifyOutcome> {
    if let Some(rest) = stored_hash.strip_prefix(LEGACY_PREFIX) {
        let mut parts = rest.splitn(2, ':');
        let salt_hex = parts.next().unwrap_or_default();
        let digest_hex = parts.next().unwrap_or_default();
        let matches = verify_legacy(password, salt_hex, digest_hex);
        return Ok(VerifyOutcome {
            matches,
            needs_rehash: matches,
        });
    }

    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| Error::internal(format!("parsing stored password hash: {e}")))?;
    let matches = Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok();
    Ok(VerifyOutcome {
        matches,
        needs_rehash: false,
    })
}

fn verify_legacy(password: &str, salt_hex: &str, digest_hex: &str) -> bool {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    let computed = hex::encode(hasher.finalize());
    constant_time_eq(&computed, digest_hex)
}

/// Build a legacy-tagged hash, only used by tests and migration seeding
/// to exercise the fallback path without a real legacy account on hand.
#[must_use]
pub fn legacy_hash_for_test(password: &str, salt_hex: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    format!("{LEGACY_PREFIX}{salt_hex}:{}", hex::encode(hasher.finalize()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_roundtrip() {
        let hashed = hash("hunter2").unwrap();
        let outcome = verify("hunter2", &hashed).unwrap();
        assert!(outcome.matches);
        assert!(!outcome.needs_rehash);
    }

    #[test]
    fn test_modern_rejects_wrong_password() {
        let hashed = hash("hunter2").unwrap();
        let outcome = verify("wrong", &hashed).unwrap();
        assert!(!outcome.matches);
    }

    #[test]
    fn test_legacy_verifies_and_flags_rehash() {
        let legacy = legacy_hash_for_test("hunter2", "abc123");
        let outcome = verify("hunter2", &legacy).unwrap();
        assert!(outcome.matches);
        assert!(outcome.needs_rehash);
    }

    #[test]
    fn test_legacy_rejects_wrong_password() {
        let legacy = legacy_hash_for_test("hunter2", "abc123");
        let outcome = verify("wrong", &legacy).unwrap();
        assert!(!outcome.matches);
    }
}
