use crate::analysis::{Analyzer, Obs, Peak};
use crate::config::{Config, Overrides};
use crate::engine::{simulate, simulate_strict};
use crate::model::EpidemicState;
use crate::presenter::{Projection, project, write_csv};
use anyhow::{Context, Result};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn run_simulation(&self, overrides: &Overrides) -> Result<()> {
        let cfg = self
            .cfg
            .with_overrides(overrides)
            .context("failed to apply overrides")?;

        let states = run_config(&cfg).context("failed to run simulation")?;

        for &projection in &cfg.output.projections {
            let file = self.series_file(projection);
            self.export_series(&cfg, &states, projection, &file)?;
        }

        let mut analyzer = Analyzer::new(
            cfg.params()?,
            cfg.init.population_size,
            &cfg.output.projections,
        );
        analyzer.add_states(&states);

        let summary_file = self.summary_file();
        analyzer
            .save_summary(&summary_file)
            .context("failed to save summary")?;
        log::info!("wrote {summary_file:?}");

        Ok(())
    }

    pub fn run_sweep(&self, r0_values: &[f64]) -> Result<()> {
        for (i_val, &r0) in r0_values.iter().enumerate() {
            let overrides = Overrides {
                r0: Some(r0),
                ..Overrides::default()
            };
            let cfg = self
                .cfg
                .with_overrides(&overrides)
                .with_context(|| format!("failed to apply r0 = {r0}"))?;

            let states = run_config(&cfg).with_context(|| format!("failed to run r0 = {r0}"))?;

            for &projection in &cfg.output.projections {
                let file = self.sweep_file(r0, projection);
                self.export_series(&cfg, &states, projection, &file)?;

                let mut peak = Peak::new(projection);
                states.iter().for_each(|state| peak.update(state));
                if let Some(peak) = peak.peak() {
                    log::info!(
                        "r0 = {r0}: {projection} peaks at {:.1} on day {:.1}",
                        peak.value,
                        peak.time_hours as f64 / 24.0
                    );
                }
            }

            let progress = 100.0 * (i_val + 1) as f64 / r0_values.len() as f64;
            log::info!("completed {progress:06.2}%");
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for pattern in ["series-*.csv", "sweep-*.csv", "summary.toml"] {
            let pattern = self.sim_dir.join(pattern);
            let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
            for file in glob(pattern)
                .context("failed to glob output files")?
                .filter_map(Result::ok)
            {
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }

        Ok(())
    }

    fn export_series(
        &self,
        cfg: &Config,
        states: &[EpidemicState],
        projection: Projection,
        file: &Path,
    ) -> Result<()> {
        let points = project(
            states,
            cfg.output.start_date,
            cfg.output.sample_hours,
            |state| projection.apply(state),
        );
        write_csv(file, &points).with_context(|| format!("failed to export {projection}"))?;
        log::info!("wrote {file:?}");
        Ok(())
    }

    fn series_file(&self, projection: Projection) -> PathBuf {
        self.sim_dir.join(format!("series-{projection}.csv"))
    }

    fn sweep_file(&self, r0: f64, projection: Projection) -> PathBuf {
        self.sim_dir.join(format!("sweep-r0-{r0}-{projection}.csv"))
    }

    fn summary_file(&self) -> PathBuf {
        self.sim_dir.join("summary.toml")
    }
}

fn run_config(cfg: &Config) -> Result<Vec<EpidemicState>> {
    let params = cfg.params()?;
    let counts = cfg.counts();
    let rates = params.rates();
    log::info!("{rates:?}");

    let states = if cfg.init.strict {
        simulate_strict(&params, &counts, cfg.horizon_hours())?
    } else {
        simulate(&params, &counts, cfg.horizon_hours())?
    };
    log::info!("initial state {:?}", states[0]);
    log::info!("simulated {} hours", cfg.horizon_hours());

    Ok(states)
}
