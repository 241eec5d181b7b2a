use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::media::MIB;

/// Longest identity session accepted, in hours (30 days).
pub const MAX_SESSION_HOURS: u64 = 30 * 24;

#[derive(Parser, Debug)]
#[command(name = "plaza", about = "Terminal client for the social backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to data directory (identity session lives here)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Identity session length in hours
    #[arg(long)]
    pub session_hours: Option<u64>,

    /// Populate the in-memory backend with demo users
    #[arg(long)]
    pub seed_demo: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub identity: IdentityConfig,
    pub media: MediaConfig,
    pub log: LogConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct IdentityConfig {
    pub provider_url: String,
    pub session_hours: u64,
    pub path: Option<PathBuf>,
}

/// Upload limits in bytes, enforced before any bytes are read.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct MediaConfig {
    pub photo_max_bytes: u64,
    pub post_media_max_bytes: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider_url: "https://identity.ic0.app".to_string(),
            session_hours: 8,
            path: None,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            photo_max_bytes: 2 * MIB,
            post_media_max_bytes: 5 * MIB,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(hours) = cli.session_hours {
            config.identity.session_hours = hours;
        }

        // Resolve paths relative to data dir
        if config.identity.path.is_none() {
            config.identity.path = Some(data_dir.join("identity.json"));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".plaza"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn identity_path(&self) -> PathBuf {
        self.identity
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("identity.json"))
    }

    fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.identity.provider_url).map_err(|e| {
            anyhow::anyhow!(
                "Invalid identity provider URL '{}': {}",
                self.identity.provider_url,
                e
            )
        })?;
        if !(1..=MAX_SESSION_HOURS).contains(&self.identity.session_hours) {
            anyhow::bail!(
                "identity.session_hours must be between 1 and {}",
                MAX_SESSION_HOURS
            );
        }
        if self.media.photo_max_bytes == 0 || self.media.post_media_max_bytes == 0 {
            anyhow::bail!("media limits must be positive");
        }
        Ok(())
    }
}
