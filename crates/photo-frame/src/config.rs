//! Command-line and environment configuration

use crate::error::{PhotoFrameError, Result};
use clap::Parser;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_CACHE_MB: u64 = 250;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SERVER_PORT: u16 = 5000;
pub const DEFAULT_ALBUM: &str = "kitchen-dash";
/// Listings smaller than this are treated as a glitch and not synced
pub const DEFAULT_MIN_ITEMS: usize = 5;

/// Command-line flags. Each one falls back to a `PHOTOS_*` environment
/// variable and then to a built-in default.
#[derive(Debug, Default, Parser)]
#[command(
    name = "photo-frame",
    about = "Serve a Synology Photos album from an in-memory cache"
)]
pub struct Cli {
    /// Synology account name [env: PHOTOS_USERNAME]
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Synology account password [env: PHOTOS_PASSWORD]
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// NAS host name or URL [env: PHOTOS_URL]
    #[arg(short = 'U', long)]
    pub url: Option<String>,

    /// NAS HTTPS port [env: PHOTOS_PORT]
    #[arg(short = 'P', long)]
    pub port: Option<String>,

    /// Cache budget in MiB [env: PHOTOS_MAX_CACHE]
    #[arg(short = 'm', long = "max-cache")]
    pub max_cache_mb: Option<u64>,

    /// Seconds between album syncs [env: PHOTOS_INTERVAL]
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Port to serve HTTP on [env: PHOTOS_SERVER_PORT]
    #[arg(short = 's', long = "server-port")]
    pub server_port: Option<u16>,

    /// Album (search keyword) to mirror [env: PHOTOS_ALBUM]
    #[arg(short = 'a', long)]
    pub album: Option<String>,

    /// Skip syncs whose listing has fewer items [env: PHOTOS_MIN_ITEMS]
    #[arg(long = "min-items")]
    pub min_items: Option<usize>,

    /// Accept self-signed NAS certificates [env: PHOTOS_INSECURE]
    #[arg(long)]
    pub insecure: bool,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub base_url: String,
    pub album: String,
    pub max_cache_bytes: u64,
    pub sync_interval: Duration,
    pub server_port: u16,
    pub min_items: usize,
    pub verify_tls: bool,
}

impl Config {
    /// Resolve flags against the process environment
    pub fn from_cli(cli: Cli) -> Result<Self> {
        Self::resolve(cli, |name| std::env::var(name).ok())
    }

    /// Resolve flags against an arbitrary environment lookup.
    ///
    /// Flags win over environment variables. Empty variables (as written by
    /// systemd `EnvironmentFile` lines such as `PHOTOS_MAX_CACHE=`) count as
    /// unset.
    pub fn resolve(cli: Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let username = cli
            .username
            .or_else(|| lookup("PHOTOS_USERNAME"))
            .unwrap_or_default();
        let password = cli
            .password
            .or_else(|| lookup("PHOTOS_PASSWORD"))
            .unwrap_or_default();
        let url = cli.url.or_else(|| lookup("PHOTOS_URL")).unwrap_or_default();
        let port = cli.port.or_else(|| lookup("PHOTOS_PORT")).unwrap_or_default();
        let album = cli
            .album
            .or_else(|| lookup("PHOTOS_ALBUM"))
            .unwrap_or_else(|| DEFAULT_ALBUM.to_string());

        if url.trim().is_empty() {
            return Err(PhotoFrameError::Config(
                "NAS URL is required (--url or PHOTOS_URL)".to_string(),
            ));
        }

        let max_cache_mb = numeric(
            cli.max_cache_mb,
            lookup("PHOTOS_MAX_CACHE"),
            "PHOTOS_MAX_CACHE",
            DEFAULT_MAX_CACHE_MB,
        )?;
        let interval_secs = numeric(
            cli.interval,
            lookup("PHOTOS_INTERVAL"),
            "PHOTOS_INTERVAL",
            DEFAULT_SYNC_INTERVAL_SECS,
        )?;
        let server_port = numeric(
            cli.server_port,
            lookup("PHOTOS_SERVER_PORT"),
            "PHOTOS_SERVER_PORT",
            DEFAULT_SERVER_PORT,
        )?;
        let min_items = numeric(
            cli.min_items,
            lookup("PHOTOS_MIN_ITEMS"),
            "PHOTOS_MIN_ITEMS",
            DEFAULT_MIN_ITEMS,
        )?;

        if interval_secs == 0 {
            return Err(PhotoFrameError::Config(
                "PHOTOS_INTERVAL must be at least 1 second".to_string(),
            ));
        }
        let max_cache_bytes = max_cache_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            PhotoFrameError::Config(format!(
                "PHOTOS_MAX_CACHE of {} MiB does not fit in a byte count",
                max_cache_mb
            ))
        })?;

        let insecure = cli.insecure
            || lookup("PHOTOS_INSECURE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false);

        Ok(Self {
            username,
            password,
            base_url: base_url(&url, &port),
            album,
            max_cache_bytes,
            sync_interval: Duration::from_secs(interval_secs),
            server_port,
            min_items,
            verify_tls: !insecure,
        })
    }
}

fn numeric<T: FromStr>(flag: Option<T>, env: Option<String>, name: &str, default: T) -> Result<T> {
    if let Some(value) = flag {
        return Ok(value);
    }
    match env {
        Some(raw) => raw.trim().parse().map_err(|_| {
            PhotoFrameError::Config(format!("{} must be a number, got {:?}", name, raw))
        }),
        None => Ok(default),
    }
}

/// `https://<host>[:<port>]`, unless `url` already names a scheme
fn base_url(url: &str, port: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    let with_scheme = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };

    let port = port.trim();
    if port.is_empty() {
        with_scheme
    } else {
        format!("{}:{}", with_scheme, port)
    }
}
