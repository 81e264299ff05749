//! Model data types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hours in one day. Periods are given in days, rates are per hour.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Errors raised before any stepping takes place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("population size {population} is smaller than the seeded compartments {seeded}")]
    InconsistentInitialCondition { population: f64, seeded: f64 },
}

/// Epidemiological parameters of a single run.
///
/// Construct with [`SimulationParameters::new`] so that every period is
/// checked before rates are derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    incubation_period_days: f64,
    infection_period_days: f64,
    quarantine_period_days: f64,
    r0: f64,
}

/// Hourly rate constants derived from [`SimulationParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    /// Rate `a` at which exposed individuals become infectious.
    pub incubation: f64,
    /// Rate `γ` at which infectious individuals are quarantined.
    pub infection: f64,
    /// Rate `δ` at which quarantined individuals are removed.
    pub quarantine: f64,
    /// Rate `β = R0·γ`.
    pub transmission: f64,
}

impl SimulationParameters {
    /// Create a validated parameter set.
    ///
    /// A quarantine period of exactly zero is accepted and means that the
    /// quarantined compartment empties into the removed one every hour.
    /// `r0` may be zero, which disables transmission.
    pub fn new(
        incubation_period_days: f64,
        infection_period_days: f64,
        quarantine_period_days: f64,
        r0: f64,
    ) -> Result<Self, ModelError> {
        check_positive("incubation_period_days", incubation_period_days)?;
        check_positive("infection_period_days", infection_period_days)?;
        check_non_negative("quarantine_period_days", quarantine_period_days)?;
        check_non_negative("r0", r0)?;
        Ok(Self {
            incubation_period_days,
            infection_period_days,
            quarantine_period_days,
            r0,
        })
    }

    pub fn r0(&self) -> f64 {
        self.r0
    }

    pub fn rates(&self) -> Rates {
        let incubation = 1.0 / (self.incubation_period_days * HOURS_PER_DAY);
        let infection = 1.0 / (self.infection_period_days * HOURS_PER_DAY);
        let quarantine = if self.quarantine_period_days > 0.0 {
            1.0 / (self.quarantine_period_days * HOURS_PER_DAY)
        } else {
            1.0
        };
        Rates {
            incubation,
            infection,
            quarantine,
            transmission: self.r0 * infection,
        }
    }
}

/// Counts observed on two consecutive days, used to seed the initial state.
///
/// `recovered_*` counts include deaths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedCounts {
    pub infected_today: f64,
    pub infected_yesterday: f64,
    pub recovered_today: f64,
    pub recovered_yesterday: f64,
    pub population_size: f64,
}

impl ObservedCounts {
    pub fn validate(&self) -> Result<(), ModelError> {
        check_non_negative("infected_today", self.infected_today)?;
        check_non_negative("infected_yesterday", self.infected_yesterday)?;
        check_non_negative("recovered_today", self.recovered_today)?;
        check_non_negative("recovered_yesterday", self.recovered_yesterday)?;
        check_positive("population_size", self.population_size)?;
        Ok(())
    }

    /// Net change in infected plus recovered over the last day.
    pub fn daily_net_change(&self) -> f64 {
        (self.infected_today - self.infected_yesterday)
            + (self.recovered_today - self.recovered_yesterday)
    }
}

/// Compartment sizes at a given hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpidemicState {
    /// Hours elapsed since the initial state.
    pub time_hours: u64,

    /// Susceptible.
    pub s: f64,
    /// Exposed.
    pub e: f64,
    /// Infectious.
    pub i: f64,
    /// Quarantined.
    pub q: f64,
    /// Recovered or removed.
    pub r: f64,
}

impl EpidemicState {
    /// Sum of all compartments.
    pub fn total(&self) -> f64 {
        self.s + self.e + self.i + self.q + self.r
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ModelError::InvalidParameter {
            name,
            value,
            reason: "must be finite and greater than zero",
        });
    }
    Ok(())
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::InvalidParameter {
            name,
            value,
            reason: "must be finite and non-negative",
        });
    }
    Ok(())
}
