use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use founderhub_social::EngineConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("FOUNDERHUB_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FOUNDERHUB_JWT_SECRET is unset or still a placeholder");
        }

        let mut engine = EngineConfig::default();
        engine.max_page_size = parse_or(&lookup, "FOUNDERHUB_MAX_PAGE_SIZE", engine.max_page_size)?;
        engine.default_page_size = engine.default_page_size.min(engine.max_page_size);
        engine.trending_window_days =
            parse_or(&lookup, "FOUNDERHUB_TRENDING_WINDOW_DAYS", engine.trending_window_days)?;
        engine.trending_limit = parse_or(
            &lookup,
            "FOUNDERHUB_TRENDING_LIMIT",
            engine.trending_limit,
        )?;
        engine.reconcile_interval = Duration::from_secs(parse_or(
            &lookup,
            "FOUNDERHUB_RECONCILE_INTERVAL_SECS",
            engine.reconcile_interval.as_secs(),
        )?);
        engine.retry.max_attempts =
            parse_or(&lookup, "FOUNDERHUB_COUNTER_RETRY_ATTEMPTS", engine.retry.max_attempts)?;

        if engine.max_page_size == 0 || engine.trending_window_days == 0 {
            bail!("page size and trending window must be positive");
        }
        if engine.reconcile_interval.is_zero() {
            bail!("FOUNDERHUB_RECONCILE_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            db_path: lookup("FOUNDERHUB_DB_PATH")
                .unwrap_or_else(|| "founderhub.db".into())
                .into(),
            host: lookup("FOUNDERHUB_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "FOUNDERHUB_PORT", 3000)?,
            jwt_secret,
            engine,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {}: '{}'", key, raw)),
        None => Ok(default),
    }
}
