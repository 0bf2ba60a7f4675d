use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Hard wall-clock budget for the synchronous charge response.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PropagationConfig {
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// Grace period between "driver found" and "awaiting pickup" display.
    #[serde(default = "default_grace_ms")]
    pub driver_found_grace_ms: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_port() -> u16 {
    8080
}
fn default_budget_ms() -> u64 {
    55_000
}
fn default_currency() -> String {
    "usd".to_string()
}
fn default_attempt_timeout_ms() -> u64 {
    5_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_grace_ms() -> u64 {
    2_000
}
fn default_channel_capacity() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            budget_ms: default_budget_ms(),
            currency: default_currency(),
        }
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            driver_found_grace_ms: default_grace_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default").required(false))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of PARCEL)
            // Eg.. `PARCEL__SERVER__PORT=9000` would set the server port
            .add_source(config::Environment::with_prefix("PARCEL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_values() {
        let config = Config::default();

        assert_eq!(config.payment.budget_ms, 55_000);
        assert_eq!(config.propagation.attempt_timeout_ms, 5_000);
        assert_eq!(config.propagation.max_attempts, 3);
        assert_eq!(config.propagation.base_delay_ms, 1_000);
        assert_eq!(config.propagation.max_delay_ms, 10_000);
        assert_eq!(config.tracking.driver_found_grace_ms, 2_000);
    }
}
