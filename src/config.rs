use crate::engine::DEFAULT_HORIZON_HOURS;
use crate::model::{ObservedCounts, SimulationParameters};
use crate::presenter::Projection;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub init: InitConfig,
    pub output: OutputConfig,
}

/// Epidemiological parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Mean time from exposure to infectiousness (days).
    pub incubation_period_days: f64,
    /// Mean time spent infectious before quarantine (days).
    pub infection_period_days: f64,
    /// Mean time spent in quarantine (days, 0 empties it every hour).
    pub quarantine_period_days: f64,
    /// Basic reproduction number.
    pub r0: f64,
}

/// Observed counts used to seed the initial state.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    pub infected_today: f64,
    pub infected_yesterday: f64,
    pub recovered_today: f64,
    pub recovered_yesterday: f64,
    pub population_size: f64,

    /// Reject populations smaller than the seeded compartments.
    #[serde(default)]
    pub strict: bool,
}

/// Horizon and series output settings.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Simulated duration (days).
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u64,
    /// Calendar date of the initial state.
    pub start_date: NaiveDate,
    /// Hours between two exported points.
    #[serde(default = "default_sample_hours")]
    pub sample_hours: u64,
    /// Quantities exported as series.
    #[serde(default = "default_projections")]
    pub projections: Vec<Projection>,
}

fn default_horizon_days() -> u64 {
    DEFAULT_HORIZON_HOURS / 24
}

fn default_sample_hours() -> u64 {
    24
}

fn default_projections() -> Vec<Projection> {
    vec![Projection::Active, Projection::Cumulative]
}

/// Values that replace the ones read from file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub r0: Option<f64>,
    pub incubation_period_days: Option<f64>,
    pub horizon_days: Option<u64>,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Apply `overrides` and validate the result.
    pub fn with_overrides(&self, overrides: &Overrides) -> Result<Self> {
        let mut config = self.clone();
        if let Some(r0) = overrides.r0 {
            config.model.r0 = r0;
        }
        if let Some(days) = overrides.incubation_period_days {
            config.model.incubation_period_days = days;
        }
        if let Some(days) = overrides.horizon_days {
            config.output.horizon_days = days;
        }
        config
            .validate()
            .context("failed to validate overridden config")?;
        Ok(config)
    }

    pub fn params(&self) -> Result<SimulationParameters> {
        let params = SimulationParameters::new(
            self.model.incubation_period_days,
            self.model.infection_period_days,
            self.model.quarantine_period_days,
            self.model.r0,
        )?;
        Ok(params)
    }

    pub fn counts(&self) -> ObservedCounts {
        ObservedCounts {
            infected_today: self.init.infected_today,
            infected_yesterday: self.init.infected_yesterday,
            recovered_today: self.init.recovered_today,
            recovered_yesterday: self.init.recovered_yesterday,
            population_size: self.init.population_size,
        }
    }

    pub fn horizon_hours(&self) -> u64 {
        self.output.horizon_days * 24
    }

    fn validate(&self) -> Result<()> {
        self.params().context("invalid model parameters")?;
        self.counts().validate().context("invalid observed counts")?;

        check_num(self.output.horizon_days, 0..=100 * 365).context("invalid horizon")?;
        check_num(self.output.sample_hours, 1..=24 * 365).context("invalid sampling interval")?;
        if self.output.projections.is_empty() {
            bail!("at least one projection must be given");
        }

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
