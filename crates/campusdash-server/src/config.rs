use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::Duration;
use tracing::info;

use campusdash_api::state::ApiOptions;
use campusdash_api::tokens::TokenConfig;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub tokens: TokenConfig,
    pub options: ApiOptions,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Fails fast on weak or missing
    /// token secrets.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tokens = TokenConfig {
            access_secret: lookup("CAMPUSDASH_JWT_SECRET").unwrap_or_default(),
            refresh_secret: lookup("CAMPUSDASH_REFRESH_SECRET").unwrap_or_default(),
            access_ttl: Duration::seconds(try_load(
                &lookup,
                "CAMPUSDASH_ACCESS_TOKEN_TTL_SECS",
                TokenConfig::DEFAULT_ACCESS_TTL_SECS,
            )?),
            refresh_ttl: Duration::seconds(try_load(
                &lookup,
                "CAMPUSDASH_REFRESH_TOKEN_TTL_SECS",
                TokenConfig::DEFAULT_REFRESH_TTL_SECS,
            )?),
        };
        tokens
            .validate()
            .context("CAMPUSDASH_JWT_SECRET / CAMPUSDASH_REFRESH_SECRET misconfigured")?;
        if tokens.access_ttl <= Duration::zero() || tokens.refresh_ttl <= Duration::zero() {
            bail!("token TTLs must be positive");
        }

        Ok(Self {
            host: lookup("CAMPUSDASH_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: try_load(&lookup, "CAMPUSDASH_PORT", 4000)?,
            db_path: lookup("CAMPUSDASH_DB_PATH")
                .unwrap_or_else(|| "campusdash.db".into())
                .into(),
            tokens,
            options: ApiOptions {
                service_mode: flag(&lookup, "CAMPUSDASH_SERVICE_MODE")?,
                otp_preview: flag(&lookup, "CAMPUSDASH_OTP_PREVIEW")?,
            },
            seed_demo: flag(&lookup, "CAMPUSDASH_SEED_DEMO")?,
        })
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => bail!("invalid {key} value '{v}', expected true or false"),
    }
}
