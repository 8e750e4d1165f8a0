use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use config::{Config, File};
use serde::Deserialize;

use crate::{interceptor::DEFAULT_CAMPAIGN_ID_POINTER, store::InvalidationMode};

const DEFAULT_CONFIG_PATH: &str = "settings.yml";
const DEBOUNCE_MS_ENV: &str = "CACHE_DEBOUNCE_MS";
const DEV_MODE_ENV: &str = "CACHE_DEV_MODE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// quiet period before pending invalidations are flushed
    pub debounce_ms: u64,
    /// louder diagnostics, and configuration defects fail loudly
    pub dev_mode: bool,
    /// JSON pointer to a campaign id in mutation responses
    pub campaign_id_pointer: String,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_capacity: u64,
    pub mode: InvalidationMode,
    pub focus_revalidate_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            dev_mode: false,
            campaign_id_pointer: DEFAULT_CAMPAIGN_ID_POINTER.to_string(),
            cache: CacheSettings::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_capacity: 10_000,
            mode: InvalidationMode::Purge,
            focus_revalidate_secs: 5,
        }
    }
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn load_config_file(path: &str) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::with_name(path).required(false))
        .build()
        .map_err(|e| anyhow!("Failed to read config file {path}: {e}"))?;

    settings
        .try_deserialize::<Settings>()
        .map_err(|e| anyhow!("Failed to deserialize config file {path}: {e}"))
}

/// Try to parse env variable. If it's not set, return None. If it's invalid, treat it as an error.
fn try_from_env<T, F>(env_var: &str, f: F) -> Result<Option<T>>
where
    F: FnOnce(String) -> Result<T>,
{
    match std::env::var(env_var) {
        Ok(raw) => {
            let val = f(raw).map_err(|_| anyhow!("Failed to parse {}", env_var))?;
            Ok(Some(val))
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(_) => bail!("Could not read {env_var} from env"),
    }
}

/// Load settings from the default config file (optional), with env overrides
pub fn load() -> Result<Settings> {
    load_from(DEFAULT_CONFIG_PATH)
}

pub fn load_from(path: &str) -> Result<Settings> {
    let mut settings = load_config_file(path)?;

    if let Some(debounce_ms) = try_from_env(DEBOUNCE_MS_ENV, |s| s.parse::<u64>().map_err(|e| e.into()))? {
        tracing::debug!("{DEBOUNCE_MS_ENV} overrides debounce_ms");
        settings.debounce_ms = debounce_ms;
    }

    if let Some(dev_mode) = try_from_env(DEV_MODE_ENV, |s| parse_flag(&s))? {
        settings.dev_mode = dev_mode;
    }

    Ok(settings)
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("not a boolean: {other}"),
    }
}
