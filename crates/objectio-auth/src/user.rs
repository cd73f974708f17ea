//! Access key generation and the authenticated-identity type handed back
//! by [`crate::sigv4::SigV4Verifier::verify`].

use rand::Rng;

/// Generate an access key ID (20 uppercase alphanumeric characters
/// starting with `AKIA`, matching AWS's own convention closely enough
/// that existing S3 client libraries don't balk at the shape).
#[must_use]
pub fn generate_access_key_id() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let random_part: String = (0..16)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("AKIA{random_part}")
}

/// Generate a 40-character secret access key.
#[must_use]
pub fn generate_secret_access_key() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut rng = rand::thread_rng();
    (0..40)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// The identity established by a successfully verified S3 request.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub user_id: String,
    pub tenant_id: String,
    pub access_key_id: String,
    pub roles: Vec<String>,
}

impl AuthResult {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_access_key_id() {
        let id = generate_access_key_id();
        assert_eq!(id.len(), 20);
        assert!(id.starts_with("AKIA"));
    }

    #[test]
    fn test_generate_secret_access_key() {
        let secret = generate_secret_access_key();
        assert_eq!(secret.len(), 40);
    }
}
