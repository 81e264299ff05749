use crate::model::{EpidemicState, SimulationParameters};
use crate::presenter::Projection;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};

pub trait Obs {
    fn name(&self) -> String;
    fn update(&mut self, state: &EpidemicState);
    fn report(&self) -> Result<toml::Value>;
}

/// Maximum of a projection over the run.
pub struct Peak {
    projection: Projection,
    peak: Option<PeakReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakReport {
    pub value: f64,
    pub time_hours: u64,
}

impl Peak {
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            peak: None,
        }
    }

    pub fn peak(&self) -> Option<&PeakReport> {
        self.peak.as_ref()
    }
}

impl Obs for Peak {
    fn name(&self) -> String {
        format!("peak_{}", self.projection)
    }

    fn update(&mut self, state: &EpidemicState) {
        let value = self.projection.apply(state);
        if self.peak.as_ref().is_none_or(|peak| value > peak.value) {
            self.peak = Some(PeakReport {
                value,
                time_hours: state.time_hours,
            });
        }
    }

    fn report(&self) -> Result<toml::Value> {
        match &self.peak {
            Some(peak) => toml::Value::try_from(peak).context("failed to serialize peak"),
            None => Ok(toml::Value::Table(toml::Table::new())),
        }
    }
}

/// Final compartment sizes and attack rate.
pub struct FinalSize {
    population: f64,
    init_removed: Option<f64>,
    last: Option<EpidemicState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalSizeReport {
    pub susceptible: f64,
    pub removed: f64,
    pub attack_rate: f64,
}

impl FinalSize {
    pub fn new(population: f64) -> Self {
        Self {
            population,
            init_removed: None,
            last: None,
        }
    }

    pub fn final_size(&self) -> Option<FinalSizeReport> {
        let init_removed = self.init_removed?;
        let last = self.last?;
        Some(FinalSizeReport {
            susceptible: last.s,
            removed: last.r,
            attack_rate: (last.r - init_removed) / self.population,
        })
    }
}

impl Obs for FinalSize {
    fn name(&self) -> String {
        "final_size".to_string()
    }

    fn update(&mut self, state: &EpidemicState) {
        self.init_removed.get_or_insert(state.r);
        self.last = Some(*state);
    }

    fn report(&self) -> Result<toml::Value> {
        match self.final_size() {
            Some(report) => toml::Value::try_from(report).context("failed to serialize final size"),
            None => Ok(toml::Value::Table(toml::Table::new())),
        }
    }
}

/// Largest relative deviation of the compartment sum from the population.
pub struct MassDrift {
    population: f64,
    max_rel_err: f64,
}

impl MassDrift {
    pub fn new(population: f64) -> Self {
        Self {
            population,
            max_rel_err: 0.0,
        }
    }

    pub fn max_rel_err(&self) -> f64 {
        self.max_rel_err
    }
}

impl Obs for MassDrift {
    fn name(&self) -> String {
        "mass_drift".to_string()
    }

    fn update(&mut self, state: &EpidemicState) {
        let rel_err = (state.total() - self.population).abs() / self.population;
        self.max_rel_err = self.max_rel_err.max(rel_err);
    }

    fn report(&self) -> Result<toml::Value> {
        let mut table = toml::Table::new();
        table.insert(
            "max_rel_err".to_string(),
            toml::Value::Float(self.max_rel_err()),
        );
        Ok(toml::Value::Table(table))
    }
}

#[derive(Debug, Serialize)]
struct RunReport {
    r0: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    herd_immunity_threshold: Option<f64>,
    n_states: usize,
}

/// Feeds every state of a run to a fixed set of observables.
pub struct Analyzer {
    params: SimulationParameters,
    n_states: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(params: SimulationParameters, population: f64, projections: &[Projection]) -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        for &projection in projections {
            obs_ptr_vec.push(Box::new(Peak::new(projection)));
        }
        obs_ptr_vec.push(Box::new(FinalSize::new(population)));
        obs_ptr_vec.push(Box::new(MassDrift::new(population)));
        Self {
            params,
            n_states: 0,
            obs_ptr_vec,
        }
    }

    pub fn add_states(&mut self, states: &[EpidemicState]) {
        for state in states {
            for obs in &mut self.obs_ptr_vec {
                obs.update(state);
            }
        }
        self.n_states += states.len();
    }

    pub fn summary(&self) -> Result<toml::Table> {
        let r0 = self.params.r0();
        let run = RunReport {
            r0,
            herd_immunity_threshold: (r0 > 1.0).then(|| 1.0 - 1.0 / r0),
            n_states: self.n_states,
        };

        let mut table = toml::Table::new();
        table.insert(
            "run".to_string(),
            toml::Value::try_from(&run).context("failed to serialize run report")?,
        );
        for obs in &self.obs_ptr_vec {
            let name = obs.name();
            let report = obs
                .report()
                .with_context(|| format!("failed to report {name}"))?;
            table.insert(name, report);
        }
        Ok(table)
    }

    pub fn save_summary<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let summary = self.summary().context("failed to build summary")?;
        let contents = toml::to_string_pretty(&summary).context("failed to serialize summary")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}
