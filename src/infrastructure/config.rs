use crate::domain::models::{Algorithm, OtpConfig};
use crate::infrastructure::env::{current_user, get_env_var, parse_env_var};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVICE: &str = "totpgen";
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: String,
    pub user: String,
    pub refresh_interval_ms: u64,
    pub otp: OtpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            user: current_user().unwrap_or_else(|| "default".to_string()),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            otp: OtpConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config = if Self::is_development_mode() {
            dotenvy::dotenv().ok();
            Self::from_env()?
        } else {
            Self::from_file(&Self::get_config_path()?)?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file at: {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config.toml")
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(service) = get_env_var("TOTPGEN_SERVICE") {
            config.service = service;
        }
        if let Some(user) = get_env_var("TOTPGEN_USER") {
            config.user = user;
        }
        if let Some(interval) = parse_env_var("TOTPGEN_REFRESH_INTERVAL_MS")? {
            config.refresh_interval_ms = interval;
        }
        if let Some(algorithm) = parse_env_var::<Algorithm>("TOTPGEN_ALGORITHM")? {
            config.otp.algorithm = algorithm;
        }
        if let Some(digits) = parse_env_var("TOTPGEN_DIGITS")? {
            config.otp.digits = digits;
        }
        if let Some(period) = parse_env_var("TOTPGEN_PERIOD")? {
            config.otp.period = period;
        }
        if let Some(skew) = parse_env_var("TOTPGEN_SKEW")? {
            config.otp.skew = skew;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            anyhow::bail!("service cannot be empty");
        }
        if self.user.trim().is_empty() {
            anyhow::bail!("user cannot be empty");
        }
        if self.refresh_interval_ms == 0 {
            anyhow::bail!("refresh_interval_ms must be greater than zero");
        }
        self.otp.validate()?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    fn is_development_mode() -> bool {
        if let Ok(dev_mode) = std::env::var("TOTPGEN_DEV") {
            return dev_mode.to_lowercase() == "true";
        }

        let mut current_dir = std::env::current_dir().unwrap_or_default();

        loop {
            if current_dir.join("Cargo.toml").exists() {
                return true;
            }

            if !current_dir.pop() {
                break;
            }
        }

        false
    }

    fn get_config_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join(DEFAULT_SERVICE).join("config.toml"))
    }
}
