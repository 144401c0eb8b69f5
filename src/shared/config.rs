//! TOML configuration with environment overrides for secrets

use serde::Deserialize;
use std::{fs, path::Path};

use crate::shared::errors::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct TradingCfg {
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_data_source")]
    pub data_source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BandsCfg {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_proximity")]
    pub proximity_percent: f64,
    #[serde(default = "default_margin")]
    pub history_margin: usize,
}

impl Default for BandsCfg {
    fn default() -> Self {
        Self {
            period: default_period(),
            multiplier: default_multiplier(),
            proximity_percent: default_proximity(),
            history_margin: default_margin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

impl Default for AlertsCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            methods: default_methods(),
            cooldown_secs: default_cooldown(),
            history_file: default_history_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramCfg {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailCfg {
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub sender_password: String,
    #[serde(default)]
    pub receiver_email: String,
}

impl Default for EmailCfg {
    fn default() -> Self {
        Self {
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            sender_email: String::new(),
            sender_password: String::new(),
            receiver_email: String::new(),
        }
    }
}

/// Credentials for one market data vendor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorCfg {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpCfg {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self { timeout_secs: default_timeout() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub trading: TradingCfg,
    #[serde(default)]
    pub bollinger_bands: BandsCfg,
    #[serde(default)]
    pub alerts: AlertsCfg,
    #[serde(default)]
    pub telegram: TelegramCfg,
    #[serde(default)]
    pub email: EmailCfg,
    #[serde(default)]
    pub binance: VendorCfg,
    #[serde(default)]
    pub twelvedata: VendorCfg,
    #[serde(default)]
    pub http: HttpCfg,
}

pub const DATA_SOURCES: [&str; 2] = ["binance", "twelvedata"];
pub const NOTIFICATION_METHODS: [&str; 3] = ["console", "telegram", "email"];

impl Config {
    /// Read, apply env overrides and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Secrets from the environment win over the file
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }
        if let Some(password) = lookup("EMAIL_PASSWORD") {
            self.email.sender_password = password;
        }
        if let Some(key) = lookup("BINANCE_API_KEY") {
            self.binance.api_key = Some(key);
        }
        if let Some(key) = lookup("TWELVEDATA_API_KEY") {
            self.twelvedata.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bands = &self.bollinger_bands;
        if self.trading.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("trading.symbol is empty".into()));
        }
        if self.trading.check_interval_secs == 0 {
            return Err(ConfigError::Invalid("trading.check_interval_secs must be > 0".into()));
        }
        if !DATA_SOURCES.contains(&self.trading.data_source.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown data source {:?}, expected one of {:?}",
                self.trading.data_source, DATA_SOURCES
            )));
        }
        if bands.period < 2 {
            return Err(ConfigError::Invalid(format!(
                "bollinger_bands.period must be >= 2, got {}",
                bands.period
            )));
        }
        if !(bands.multiplier.is_finite() && bands.multiplier > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bollinger_bands.multiplier must be positive, got {}",
                bands.multiplier
            )));
        }
        if !(bands.proximity_percent.is_finite() && bands.proximity_percent >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bollinger_bands.proximity_percent must be >= 0, got {}",
                bands.proximity_percent
            )));
        }
        for method in &self.alerts.methods {
            if !NOTIFICATION_METHODS.contains(&method.to_lowercase().as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "unknown notification method {:?}, expected one of {:?}",
                    method, NOTIFICATION_METHODS
                )));
            }
        }
        Ok(())
    }
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_check_interval() -> u64 {
    60
}

fn default_data_source() -> String {
    "binance".to_string()
}

fn default_period() -> usize {
    20
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_proximity() -> f64 {
    0.1
}

fn default_margin() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_methods() -> Vec<String> {
    vec!["console".to_string()]
}

fn default_cooldown() -> u64 {
    300
}

fn default_history_file() -> String {
    "alert_history.json".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_timeout() -> u64 {
    10
}
