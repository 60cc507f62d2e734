use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tavola_remote::{DEFAULT_COURSEWORK_URL, DEFAULT_STUDENT_ID, DEFAULT_TIMEOUT, RemoteConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub remote: RemoteConfig,
    /// Insert demo accounts and the sample menu on startup.
    pub seed: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("tavola.db"),
            remote: RemoteConfig::default(),
            seed: true,
        }
    }
}

impl AppConfig {
    /// Read `TAVOLA_*` variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = match var("TAVOLA_HTTP_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("TAVOLA_HTTP_TIMEOUT_SECS is not a number: {secs}"))?,
            ),
            None => DEFAULT_TIMEOUT,
        };
        let seed = match var("TAVOLA_SEED").as_deref() {
            None | Some("1" | "true" | "yes") => true,
            Some("0" | "false" | "no") => false,
            Some(other) => anyhow::bail!("TAVOLA_SEED must be true or false, got {other}"),
        };

        Ok(Self {
            db_path: PathBuf::from(var("TAVOLA_DB_PATH").unwrap_or_else(|| "tavola.db".into())),
            remote: RemoteConfig {
                coursework_url: var("TAVOLA_COURSEWORK_URL").unwrap_or_else(|| DEFAULT_COURSEWORK_URL.into()),
                rest_url: var("TAVOLA_REST_URL"),
                student_id: var("TAVOLA_STUDENT_ID").unwrap_or_else(|| DEFAULT_STUDENT_ID.into()),
                timeout,
            },
            seed,
        })
    }
}
