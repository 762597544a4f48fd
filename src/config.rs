use std::path::PathBuf;
use std::time::Duration;
use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::get_project_dirs;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub geocoder_url: String,
    pub image_bucket: String,
    pub http_timeout: Duration,
}

pub enum GatewayConfig {
    /// Hosted backend reached over HTTP.
    Remote { url: String, anon_key: String },
    /// Local SQLite file with the same collections.
    Local { db_path: PathBuf },
}

impl Config {
    pub fn load() -> Result<Self> {
        let gateway = match var("PLACESHARE_GATEWAY_URL") {
            Some(url) => GatewayConfig::Remote {
                url,
                anon_key: read_secret("PLACESHARE_GATEWAY_KEY")?,
            },
            None => GatewayConfig::Local {
                db_path: db_path()?,
            },
        };

        Ok(Self {
            host: try_load("PLACESHARE_HOST", "127.0.0.1")?,
            port: try_load("PLACESHARE_PORT", "8000")?,
            gateway,
            geocoder_url: try_load("PLACESHARE_GEOCODER_URL", "https://nominatim.openstreetmap.org")?,
            image_bucket: try_load("PLACESHARE_IMAGE_BUCKET", "place-images")?,
            http_timeout: Duration::from_secs(try_load("PLACESHARE_HTTP_TIMEOUT_SECS", "10")?),
        })
    }
}

/// Database location for the local gateway and the `db` subcommands.
pub fn db_path() -> Result<PathBuf> {
    match var("PLACESHARE_DB") {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(get_project_dirs()?.data_dir().join("placeshare.db")),
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
}

/// Reads `key` from the environment, falling back to `/run/secrets/<key>`.
fn read_secret(key: &str) -> Result<String> {
    if let Some(value) = var(key) {
        return Ok(value);
    }

    let path = format!("/run/secrets/{key}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {key} from file: {e}");
            e
        })
        .with_context(|| format!("{key} is neither set nor readable from {path}"))
}
