//! Server configuration.
//!
//! Loaded from an optional YAML file (the `config` crate) layered under
//! CLI flags; flags always win, the file always wins over these defaults.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub s3: S3ListenConfig,
    #[serde(default)]
    pub console: ConsoleListenConfig,
    #[serde(default)]
    pub public: PublicUrlConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub ratelimit: RateLimitConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            s3: S3ListenConfig::default(),
            console: ConsoleListenConfig::default(),
            public: PublicUrlConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            tls: TlsConfig::default(),
            ratelimit: RateLimitConfig::default(),
            lockout: LockoutConfig::default(),
        }
    }
}

impl Config {
    /// Validate cross-field constraints not expressible via `serde` alone.
    /// Returns a human-readable message on failure (the CLI exits 1 on this).
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.jwt_secret.is_empty() {
            return Err("auth.jwt_secret is required when the console endpoint is enabled".into());
        }
        if self.tls.enabled && self.tls.mode == TlsMode::Manual && self.tls.cert_file.is_none() {
            return Err("tls.cert_file is required when tls.mode is \"manual\"".into());
        }
        Ok(())
    }

    #[must_use]
    pub fn meta_dir(&self) -> PathBuf {
        self.data_dir.join("meta")
    }

    #[must_use]
    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    #[must_use]
    pub fn tmp_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }
}

/// `s3.listen`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct S3ListenConfig {
    #[serde(default = "default_s3_listen")]
    pub listen: SocketAddr,
}

fn default_s3_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

impl Default for S3ListenConfig {
    fn default() -> Self {
        Self {
            listen: default_s3_listen(),
        }
    }
}

/// `console.listen`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConsoleListenConfig {
    #[serde(default = "default_console_listen")]
    pub listen: SocketAddr,
}

fn default_console_listen() -> SocketAddr {
    "0.0.0.0:8081".parse().unwrap()
}

impl Default for ConsoleListenConfig {
    fn default() -> Self {
        Self {
            listen: default_console_listen(),
        }
    }
}

/// `public.s3_url` / `public.console_url` — used only to render presigned URLs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PublicUrlConfig {
    pub s3_url: Option<String>,
    pub console_url: Option<String>,
}

/// `auth.jwt_secret`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
}

/// `cors.s3.*`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub s3: S3CorsConfig,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            s3: S3CorsConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct S3CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u32,
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET", "PUT", "POST", "DELETE", "HEAD"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_max_age() -> u32 {
    3600
}

impl Default for S3CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            max_age: default_cors_max_age(),
        }
    }
}

/// `tls.*`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: TlsMode,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    #[serde(default)]
    pub acme: AcmeConfig,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: TlsMode::Manual,
            cert_file: None,
            key_file: None,
            acme: AcmeConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Manual,
    Acme,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AcmeConfig {
    pub domain: Option<String>,
    pub email: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

/// `ratelimit.login.per_ip_per_minute`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub login: LoginRateLimitConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: LoginRateLimitConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LoginRateLimitConfig {
    #[serde(default = "default_per_ip_per_minute")]
    pub per_ip_per_minute: u32,
}

fn default_per_ip_per_minute() -> u32 {
    5
}

impl Default for LoginRateLimitConfig {
    fn default() -> Self {
        Self {
            per_ip_per_minute: default_per_ip_per_minute(),
        }
    }
}

/// `lockout.threshold` / `lockout.duration`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_lockout_threshold")]
    pub threshold: u32,
    #[serde(default = "default_lockout_duration", with = "duration_secs")]
    pub duration: Duration,
}

fn default_lockout_threshold() -> u32 {
    5
}

fn default_lockout_duration() -> Duration {
    Duration::from_secs(15 * 60)
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            threshold: default_lockout_threshold(),
            duration: default_lockout_duration(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.s3.listen.port(), 8080);
        assert_eq!(cfg.console.listen.port(), 8081);
        assert_eq!(cfg.ratelimit.login.per_ip_per_minute, 5);
        assert_eq!(cfg.lockout.threshold, 5);
        assert_eq!(cfg.lockout.duration, Duration::from_secs(900));
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let cfg = Config::default();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_ok_with_secret() {
        let mut cfg = Config::default();
        cfg.auth.jwt_secret = "s".into();
        assert!(cfg.validate().is_ok());
    }
}
