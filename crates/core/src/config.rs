//! Runtime configuration
//!
//! Values resolve as built-in defaults, then an optional TOML file, then
//! command-line flags (applied by the binary).

use crate::error::MirrorError;
use crate::hash::HashAlgorithm;
use crate::manifest::Endpoints;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PRIMARY_URL: &str =
    "https://github.com/LNSSPsd/PhoenixBuilder/releases/latest/download/";
pub const DEFAULT_MIRROR_URL: &str =
    "https://hub.fgit.ml/LNSSPsd/PhoenixBuilder/releases/latest/download/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Base URL tried first on every pass
    pub primary_url: String,
    /// Base URL used when the primary's manifest is unreachable
    pub mirror_url: String,
    /// Directory the bundle is mirrored into and served from
    pub local_root: PathBuf,
    /// Address the file server binds to
    pub listen_addr: String,
    /// URL prefix the local root is served under
    pub route_prefix: String,
    /// Seconds between scheduled passes
    pub interval_secs: u64,
    /// Digest used by the manifest
    pub hash_algorithm: HashAlgorithm,
    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            mirror_url: DEFAULT_MIRROR_URL.to_string(),
            local_root: PathBuf::from("./files"),
            listen_addr: "0.0.0.0:12333".to_string(),
            route_prefix: "/res/".to_string(),
            interval_secs: 24 * 60 * 60,
            hash_algorithm: HashAlgorithm::Md5,
            timeout_secs: 300,
            retry: RetrySettings::default(),
        }
    }
}

impl MirrorConfig {
    /// Load a TOML file; keys it leaves out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, MirrorError> {
        let content = fs::read_to_string(path).map_err(|e| MirrorError::local_io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, MirrorError> {
        let config: MirrorConfig =
            toml::from_str(content).map_err(|e| MirrorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MirrorError> {
        for (label, url) in [("primary_url", &self.primary_url), ("mirror_url", &self.mirror_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(MirrorError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    label, url
                )));
            }
        }
        if self.interval_secs == 0 {
            return Err(MirrorConfig::invalid("interval_secs must be positive"));
        }
        if self.timeout_secs == 0 {
            return Err(MirrorConfig::invalid("timeout_secs must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(MirrorConfig::invalid("retry.max_attempts must be at least 1"));
        }
        if !self.route_prefix.starts_with('/') {
            return Err(MirrorConfig::invalid("route_prefix must start with '/'"));
        }
        Ok(())
    }

    fn invalid(msg: &str) -> MirrorError {
        MirrorError::Config(msg.to_string())
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(self.primary_url.clone(), self.mirror_url.clone())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }
}

/// TOML shape of [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_secs: 30,
            max_backoff_secs: 600,
            multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_secs(self.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            multiplier: self.multiplier,
        }
    }
}

/// How often a pass with failed downloads is re-run before giving up
/// until the next scheduled tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per pass, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().policy()
    }
}

impl RetryPolicy {
    /// Retry immediately, `max_attempts` times in total.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay before attempt `attempt + 1`, given that `attempt` (1-based)
    /// just failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let delay = self.initial_backoff.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_backoff.as_secs_f64() {
            return self.max_backoff.max(self.initial_backoff);
        }
        Duration::from_secs_f64(delay)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upstream_deployment() {
        let config = MirrorConfig::default();
        assert_eq!(config.local_root, PathBuf::from("./files"));
        assert_eq!(config.listen_addr, "0.0.0.0:12333");
        assert_eq!(config.route_prefix, "/res/");
        assert_eq!(config.interval(), Duration::from_secs(86_400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MirrorConfig::from_toml(
            r#"
            primary_url = "http://127.0.0.1:9000/dl"
            hash_algorithm = "sha256"

            [retry]
            max_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.primary_url, "http://127.0.0.1:9000/dl");
        assert_eq!(config.mirror_url, DEFAULT_MIRROR_URL);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_backoff_secs, 30);
        assert_eq!(
            config.endpoints().primary.url_for("hashes.json"),
            "http://127.0.0.1:9000/dl/hashes.json"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(MirrorConfig::from_toml("primary_url = \"ftp://nope\"").is_err());
        assert!(MirrorConfig::from_toml("interval_secs = 0").is_err());
        assert!(matches!(
            MirrorConfig::from_toml("timeout_secs = 0"),
            Err(MirrorError::Config(msg)) if msg.contains("timeout_secs")
        ));
        assert!(MirrorConfig::from_toml("[retry]\nmax_attempts = 0").is_err());
        assert!(MirrorConfig::from_toml("listen_addr = [1, 2]").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hashmirror.toml");
        fs::write(&path, "interval_secs = 60\nroute_prefix = \"/files/\"\n").unwrap();

        let config = MirrorConfig::load(&path).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.route_prefix, "/files/");

        let missing = MirrorConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(MirrorError::LocalIo { .. })));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(100),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(30));
        assert_eq!(policy.backoff(2), Duration::from_secs(60));
        assert_eq!(policy.backoff(3), Duration::from_secs(100));
        assert_eq!(policy.backoff(40), Duration::from_secs(100));

        assert!(policy.should_retry(5));
        assert!(!policy.should_retry(6));
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::ZERO);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
