//! Rate Limiter (component H): per-IP login attempt throttling and
//! per-account lockout after repeated failures.
//!
//! The per-IP limiter is a token bucket, grounded on the same algorithm
//! used for volume I/O throttling elsewhere in this codebase, keyed by
//! source IP with one bucket allocated lazily per address. Account
//! lockout is separate: it lives on the [`objectio_meta_store::types::StoredUser`]
//! record itself (`failed_login_attempts`, `locked_until_epoch_secs`) so
//! it survives process restarts, unlike the in-memory per-IP buckets.

use objectio_common::config::{LockoutConfig, RateLimitConfig};
use objectio_common::{Error, Result};
use objectio_meta_store::MetaStore;
use objectio_meta_store::types::StoredUser;
use objectio_meta_store::user;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Token bucket keyed by source IP, refilled continuously at
/// `per_minute / 60` tokens per second up to a `per_minute`-token burst.
struct TokenBucket {
    tokens: AtomicU64,
    max_tokens: u64,
    refill_per_sec_milli: u64,
    last_refill: Mutex<Instant>,
}

impl TokenBucket {
    fn new(per_minute: u32) -> Self {
        let max_tokens = u64::from(per_minute) * 1000;
        Self {
            tokens: AtomicU64::new(max_tokens),
            max_tokens,
            refill_per_sec_milli: max_tokens / 60,
            last_refill: Mutex::new(Instant::now()),
        }
    }

    fn try_acquire(&self) -> bool {
        self.refill();
        loop {
            let current = self.tokens.load(Ordering::Relaxed);
            if current < 1000 {
                return false;
            }
            if self
                .tokens
                .compare_exchange_weak(current, current - 1000, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn refill(&self) {
        let mut last = self.last_refill.lock();
        let elapsed_ms = last.elapsed().as_millis() as u64;
        if elapsed_ms == 0 {
            return;
        }
        let added = (elapsed_ms * self.refill_per_sec_milli) / 1000;
        if added > 0 {
            let current = self.tokens.load(Ordering::Relaxed);
            self.tokens
                .store((current + added).min(self.max_tokens), Ordering::Relaxed);
            *last = Instant::now();
        }
    }
}

/// Per-IP login rate limiter.
pub struct IpRateLimiter {
    per_minute: u32,
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
}

impl IpRateLimiter {
    #[must_use]
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.login.per_ip_per_minute)
    }

    /// Returns `Err(Error::RateLimited)` if `ip` has exhausted its budget.
    pub fn check(&self, ip: IpAddr) -> Result<()> {
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.per_minute));
        if bucket.try_acquire() {
            Ok(())
        } else {
            Err(Error::RateLimited)
        }
    }
}

/// Account lockout policy: after `threshold` consecutive failed logins,
/// the account is locked for `duration_secs`.
pub struct LockoutPolicy {
    pub threshold: u32,
    pub duration_secs: i64,
}

impl LockoutPolicy {
    #[must_use]
    pub fn from_config(config: &LockoutConfig) -> Self {
        Self {
            threshold: config.threshold,
            duration_secs: config.duration.as_secs() as i64,
        }
    }

    /// Check whether `user` is currently locked out, given the current
    /// time.
    #[must_use]
    pub fn is_locked(user: &StoredUser, now_epoch_secs: i64) -> bool {
        user.locked_until_epoch_secs > now_epoch_secs
    }

    /// Return `Err(Error::AccountLocked)` if `user` is currently locked
    /// out; otherwise `Ok(())`. Call before attempting password
    /// verification so a locked account never gets a fresh verify pass.
    pub fn guard(user: &StoredUser, now_epoch_secs: i64) -> Result<()> {
        if Self::is_locked(user, now_epoch_secs) {
            Err(Error::AccountLocked {
                locked_until_epoch_secs: user.locked_until_epoch_secs,
            })
        } else {
            Ok(())
        }
    }

    /// Record a failed login attempt for `user`, locking the account if
    /// `threshold` consecutive failures have now been reached.
    pub fn record_failure(
        &self,
        meta: &MetaStore,
        user: &StoredUser,
        now_epoch_secs: i64,
    ) -> Result<()> {
        let mut updated = user.clone();
        updated.failed_login_attempts += 1;
        updated.last_failed_login_epoch_secs = now_epoch_secs;
        if updated.failed_login_attempts >= self.threshold {
            updated.locked_until_epoch_secs = now_epoch_secs + self.duration_secs;
        }
        meta.transact(|txn| user::put(txn, &updated))
    }

    /// Reset the failure counter on a successful login.
    pub fn record_success(&self, meta: &MetaStore, user: &StoredUser) -> Result<()> {
        let mut updated = user.clone();
        updated.failed_login_attempts = 0;
        updated.locked_until_epoch_secs = 0;
        meta.transact(|txn| user::put(txn, &updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_rate_limiter_exhausts_then_blocks() {
        let limiter = IpRateLimiter::new(2);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_ok());
        assert!(limiter.check(ip).is_err());
    }

    #[test]
    fn test_ip_rate_limiter_is_per_address() {
        let limiter = IpRateLimiter::new(1);
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.2".parse().unwrap();
        assert!(limiter.check(a).is_ok());
        assert!(limiter.check(b).is_ok());
    }

    fn sample_user() -> StoredUser {
        StoredUser {
            user_id: "u1".into(),
            tenant_id: "t1".into(),
            login: "alice".into(),
            password_hash: "hash".into(),
            roles: vec![],
            failed_login_attempts: 0,
            locked_until_epoch_secs: 0,
            last_failed_login_epoch_secs: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_lockout_triggers_after_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let meta = MetaStore::open(dir.path().join("m.redb")).unwrap();
        let policy = LockoutPolicy {
            threshold: 3,
            duration_secs: 900,
        };
        let mut user = sample_user();
        meta.transact(|txn| user::put(txn, &user)).unwrap();

        for _ in 0..3 {
            policy.record_failure(&meta, &user, 1000).unwrap();
            user = meta
                .view(|txn| user::get_by_id(txn, &user.user_id))
                .unwrap()
                .unwrap();
        }
        assert!(LockoutPolicy::is_locked(&user, 1000));
        assert!(!LockoutPolicy::is_locked(&user, 1000 + 901));
    }

    #[test]
    fn test_success_clears_failures() {
        let dir = tempfile::tempdir().unwrap();
        let meta = MetaStore::open(dir.path().join("m.redb")).unwrap();
        let policy = LockoutPolicy {
            threshold: 3,
            duration_secs: 900,
        };
        let mut user = sample_user();
        meta.transact(|txn| user::put(txn, &user)).unwrap();
        policy.record_failure(&meta, &user, 1000).unwrap();
        user = meta
            .view(|txn| user::get_by_id(txn, &user.user_id))
            .unwrap()
            .unwrap();
        policy.record_success(&meta, &user).unwrap();
        user = meta
            .view(|txn| user::get_by_id(txn, &user.user_id))
            .unwrap()
            .unwrap();
        assert_eq!(user.failed_login_attempts, 0);
    }
}
