use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hashmirror_core::config::MirrorConfig;
use hashmirror_core::hash::HashAlgorithm;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Keep the local copy in sync and serve it over HTTP (default)
    Serve,
    /// Run a single sync pass and exit
    Sync,
}

/// Overrides on top of the config file. Anything left unset keeps the
/// file's value, or the built-in default.
#[derive(Args, Debug, Default)]
pub struct Settings {
    /// TOML config file
    #[arg(long, global = true, env = "HASHMIRROR_CONFIG")]
    pub config: Option<PathBuf>,
    /// Base URL tried first
    #[arg(long, global = true, env = "HASHMIRROR_PRIMARY")]
    pub primary: Option<String>,
    /// Base URL used when the primary is unreachable
    #[arg(long, global = true, env = "HASHMIRROR_MIRROR")]
    pub mirror: Option<String>,
    /// Local directory to mirror into and serve
    #[arg(long, global = true, env = "HASHMIRROR_ROOT")]
    pub root: Option<PathBuf>,
    /// File server address
    #[arg(long, global = true, env = "HASHMIRROR_ADDR")]
    pub addr: Option<String>,
    /// URL prefix for served files
    #[arg(long, global = true)]
    pub prefix: Option<String>,
    /// Seconds between sync passes
    #[arg(long, global = true)]
    pub interval_secs: Option<u64>,
    /// Manifest digest (md5 or sha256)
    #[arg(long, global = true)]
    pub hash: Option<HashAlgorithm>,
    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
    /// Sync attempts per pass before giving up until the next tick
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,
}

impl Settings {
    pub fn resolve(&self) -> Result<MirrorConfig> {
        let mut config = match &self.config {
            Some(path) => MirrorConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => MirrorConfig::default(),
        };

        if let Some(url) = &self.primary {
            config.primary_url = url.clone();
        }
        if let Some(url) = &self.mirror {
            config.mirror_url = url.clone();
        }
        if let Some(root) = &self.root {
            config.local_root = root.clone();
        }
        if let Some(addr) = &self.addr {
            config.listen_addr = addr.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.route_prefix = prefix.clone();
        }
        if let Some(secs) = self.interval_secs {
            config.interval_secs = secs;
        }
        if let Some(hash) = self.hash {
            config.hash_algorithm = hash;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(n) = self.max_attempts {
            config.retry.max_attempts = n;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["hashmirror"]).unwrap();
        assert_eq!(cli.command, None);

        let config = Settings::default().resolve().unwrap();
        assert_eq!(config, MirrorConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mirror.toml");
        fs::write(
            &path,
            "listen_addr = \"127.0.0.1:9000\"\ninterval_secs = 600\nroute_prefix = \"/files/\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "hashmirror",
            "sync",
            "--config",
            path.to_str().unwrap(),
            "--interval-secs",
            "60",
            "--hash",
            "sha256",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Sync));

        let config = cli.settings.resolve().unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.route_prefix, "/files/");
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let settings = Settings {
            primary: Some("ftp://example.com/".to_string()),
            ..Settings::default()
        };
        assert!(settings.resolve().is_err());

        assert!(Cli::try_parse_from(["hashmirror", "--hash", "crc32"]).is_err());
    }
}
