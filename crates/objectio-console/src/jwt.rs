//! Session tokens: HS256 JWTs carrying the identity established at login.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

const SESSION_TTL_SECS: i64 = 8 * 3600;

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub tenant_id: String,
    pub roles: Vec<String>,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }

    /// A global admin has the `admin` role and no tenant (an empty tenant
    /// id), per the unlock authorization rule.
    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.is_admin() && self.tenant_id.is_empty()
    }
}

/// Issue a session token for `user_id`/`tenant_id`/`roles`, valid for
/// [`SESSION_TTL_SECS`] from `now_epoch_secs`.
pub fn issue(secret: &str, user_id: &str, tenant_id: &str, roles: Vec<String>, now_epoch_secs: i64) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        tenant_id: tenant_id.to_string(),
        roles,
        exp: now_epoch_secs + SESSION_TTL_SECS,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("HS256 encoding of a well-formed claims struct cannot fail")
}

/// Verify and decode a session token. Rejects expired or malformed tokens.
pub fn verify(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .ok()
        .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    #[test]
    fn issue_then_verify_roundtrip() {
        let token = issue("secret", "u1", "t1", vec!["admin".to_string()], now());
        let claims = verify("secret", &token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.tenant_id, "t1");
        assert!(claims.is_admin());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = issue("secret", "u1", "t1", vec![], now());
        assert!(verify("other-secret", &token).is_none());
    }

    #[test]
    fn global_admin_requires_empty_tenant() {
        let global = Claims { sub: "u1".into(), tenant_id: String::new(), roles: vec!["admin".into()], exp: 0 };
        let tenant_admin = Claims { sub: "u2".into(), tenant_id: "t1".into(), roles: vec!["admin".into()], exp: 0 };
        assert!(global.is_global_admin());
        assert!(!tenant_admin.is_global_admin());
    }
}
