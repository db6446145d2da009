use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::error::{SignalError, SignalResult};
use crate::execution::TrackerSettings;
use crate::indicators::TrendConfig;
use crate::models::{Position, PriceField};
use crate::strategy::{SellConfig, DEFAULT_RADIUS};

/// Prefix for environment overrides, e.g. `SELLBOT__SELL__STOP_LOSS_RATE=0.05`
const ENV_PREFIX: &str = "SELLBOT";

/// Trend weights as written in config files
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendSection {
    pub period_minutes: u64,
    /// Defaults to the sell refresh rate
    pub interval_secs: Option<u64>,
    pub multiplier: Vec<f64>,
    pub factor: Vec<f64>,
    pub field: PriceField,
}

impl Default for TrendSection {
    fn default() -> Self {
        let defaults = TrendConfig::default();
        Self {
            period_minutes: defaults.period_minutes,
            interval_secs: None,
            multiplier: defaults.multiplier.to_vec(),
            factor: defaults.factor.to_vec(),
            field: defaults.field,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub ladder_radius: usize,
    pub slope_periods: Vec<u64>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            ladder_radius: DEFAULT_RADIUS,
            slope_periods: vec![5, 10],
        }
    }
}

/// Full bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub position: Position,
    #[serde(default)]
    pub sell: SellConfig,
    #[serde(default)]
    pub trend: TrendSection,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl BotConfig {
    /// Load from an optional TOML file, then `SELLBOT__*` environment variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Parse TOML text without consulting the environment
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn trend_config(&self) -> SignalResult<TrendConfig> {
        let interval_secs = self.trend.interval_secs.unwrap_or(self.sell.refresh_rate_secs);
        if interval_secs != self.sell.refresh_rate_secs {
            tracing::warn!(
                "Trend interval {}s differs from refresh rate {}s",
                interval_secs,
                self.sell.refresh_rate_secs
            );
        }

        let config = TrendConfig {
            period_minutes: self.trend.period_minutes,
            interval_secs,
            multiplier: weight_pair("multiplier", &self.trend.multiplier)?,
            factor: weight_pair("factor", &self.trend.factor)?,
            field: self.trend.field,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SignalResult<()> {
        self.position.validate()?;
        self.sell.validate()?;
        self.trend_config()?;
        if self.display.slope_periods.iter().any(|p| *p == 0) {
            return Err(SignalError::config("display slope periods must be positive"));
        }
        Ok(())
    }

    /// Validate everything and split into what a tracker is built from
    pub fn tracker_parts(&self) -> SignalResult<(Position, TrackerSettings)> {
        self.validate()?;

        let settings = TrackerSettings {
            sell: self.sell.clone(),
            trend: self.trend_config()?,
            slope_periods: self.display.slope_periods.clone(),
            ladder_radius: self.display.ladder_radius,
        };

        Ok((self.position.clone(), settings))
    }
}

fn weight_pair(name: &str, values: &[f64]) -> SignalResult<[f64; 2]> {
    match values {
        [a, b] => Ok([*a, *b]),
        _ => Err(SignalError::config(format!(
            "trend {} needs exactly 2 weights, got {}",
            name,
            values.len()
        ))),
    }
}
