// Configuration module: everything the client needs to reach the
// submission portal, loaded once at startup and handed to `ApiClient`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://submit.ncbi.nlm.nih.gov";

/// File in the user's home directory holding the API key when
/// `GTR_API_KEY` is not set.
pub const KEY_FILE_NAME: &str = ".gtr_api_key";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    /// `None` means requests may block indefinitely.
    pub timeout: Option<Duration>,
    pub log_level: String,
}

impl Config {
    /// Build the configuration from the process environment, falling back
    /// to `~/.gtr_api_key` for the API key. `timeout_secs` comes from the
    /// command line and wins over `GTR_TIMEOUT_SECS`.
    pub fn from_env(timeout_secs: Option<u64>) -> Result<Self> {
        Self::load(|key| std::env::var(key).ok(), dirs::home_dir(), timeout_secs)
    }

    /// Same as `from_env` but with an injectable variable lookup and home
    /// directory.
    pub fn load<F>(var: F, home: Option<PathBuf>, timeout_secs: Option<u64>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = match var("GTR_API_KEY").filter(|k| !k.trim().is_empty()) {
            Some(key) => key.trim().to_string(),
            None => match home.as_deref().map(|h| h.join(KEY_FILE_NAME)) {
                Some(path) if path.exists() => read_key_file(&path)?,
                _ => bail!(
                    "Missing API key: set GTR_API_KEY or write the key to ~/{}",
                    KEY_FILE_NAME
                ),
            },
        };

        let base_url = var("GTR_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        // GTR_TIMEOUT_SECS is only parsed when no flag was given.
        let timeout = match (timeout_secs, var("GTR_TIMEOUT_SECS")) {
            (Some(secs), _) => (secs > 0).then(|| Duration::from_secs(secs)),
            (None, Some(raw)) => parse_timeout(&raw).context("Invalid GTR_TIMEOUT_SECS")?,
            (None, None) => None,
        };

        let log_level = var("GTR_LOG_LEVEL").unwrap_or_else(|| "warn".to_string());

        Ok(Config {
            api_key,
            base_url,
            timeout,
            log_level,
        })
    }
}

/// Seconds as a non-negative integer; `0` disables the timeout.
pub fn parse_timeout(raw: &str) -> Result<Option<Duration>> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number of seconds", raw))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

fn read_key_file(path: &Path) -> Result<String> {
    let key = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read API key file {}", path.display()))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("API key file {} is empty", path.display());
    }
    Ok(key.to_string())
}
