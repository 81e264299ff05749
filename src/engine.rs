use crate::model::{
    EpidemicState, HOURS_PER_DAY, ModelError, ObservedCounts, Rates, SimulationParameters,
};

/// Default simulation horizon: one year.
pub const DEFAULT_HORIZON_HOURS: u64 = 365 * 24;

/// Compute the initial state from two days of observed counts.
///
/// The exposed compartment is seeded so that the hourly flux `a·E(0)`,
/// summed over a day, matches the observed daily net change in infected
/// plus recovered. `Q(0)` is zero and `S(0)` takes the remainder, which is
/// negative when the population is smaller than the seeded compartments.
/// See [`check_initial_condition`] for a strict variant.
///
/// # Errors
/// Returns [`ModelError::InvalidParameter`] if a count is negative or the
/// population size is not positive.
pub fn initialize(
    params: &SimulationParameters,
    counts: &ObservedCounts,
) -> Result<EpidemicState, ModelError> {
    counts.validate()?;

    let rates = params.rates();
    let e = counts.daily_net_change() / (HOURS_PER_DAY * rates.incubation);
    let i = counts.infected_today;
    let q = 0.0;
    let r = counts.recovered_today;
    let s = counts.population_size - e - i - q - r;

    if s < 0.0 {
        log::warn!("initial susceptible population is negative ({s})");
    }

    Ok(EpidemicState {
        time_hours: 0,
        s,
        e,
        i,
        q,
        r,
    })
}

/// Reject initial states whose seeded compartments exceed the population.
pub fn check_initial_condition(
    state: &EpidemicState,
    population_size: f64,
) -> Result<(), ModelError> {
    if state.s < 0.0 {
        return Err(ModelError::InconsistentInitialCondition {
            population: population_size,
            seeded: state.e + state.i + state.q + state.r,
        });
    }
    Ok(())
}

/// Advance the state by one hour of explicit Euler integration.
pub fn step(
    state: &EpidemicState,
    params: &SimulationParameters,
    population_size: f64,
) -> EpidemicState {
    let Rates {
        incubation,
        infection,
        quarantine,
        transmission,
    } = params.rates();

    // Every flux is evaluated on the pre-step state.
    let flux_s_to_e = transmission * state.s * state.i / population_size;
    let flux_e_to_i = incubation * state.e;
    let flux_i_to_q = infection * state.i;
    let flux_q_to_r = quarantine * state.q;

    EpidemicState {
        time_hours: state.time_hours + 1,
        s: state.s - flux_s_to_e,
        e: state.e + flux_s_to_e - flux_e_to_i,
        i: state.i + flux_e_to_i - flux_i_to_q,
        q: state.q + flux_i_to_q - flux_q_to_r,
        r: state.r + flux_q_to_r,
    }
}

/// Simulate `horizon_hours` steps starting from the initialized state.
///
/// The result holds `horizon_hours + 1` states, the first being the
/// initial one.
///
/// # Errors
/// Fails before producing any state if [`initialize`] fails.
pub fn simulate(
    params: &SimulationParameters,
    counts: &ObservedCounts,
    horizon_hours: u64,
) -> Result<Vec<EpidemicState>, ModelError> {
    let init = initialize(params, counts)?;
    Ok(integrate(init, params, counts.population_size, horizon_hours))
}

/// Strict variant of [`simulate`] that also rejects a negative `S(0)`.
pub fn simulate_strict(
    params: &SimulationParameters,
    counts: &ObservedCounts,
    horizon_hours: u64,
) -> Result<Vec<EpidemicState>, ModelError> {
    let init = initialize(params, counts)?;
    check_initial_condition(&init, counts.population_size)?;
    Ok(integrate(init, params, counts.population_size, horizon_hours))
}

fn integrate(
    init: EpidemicState,
    params: &SimulationParameters,
    population_size: f64,
    horizon_hours: u64,
) -> Vec<EpidemicState> {
    let mut states = Vec::with_capacity(capacity_hint(horizon_hours));
    let mut state = init;
    states.push(state);
    for _ in 0..horizon_hours {
        state = step(&state, params, population_size);
        states.push(state);
    }
    states
}

fn capacity_hint(horizon_hours: u64) -> usize {
    usize::try_from(horizon_hours)
        .ok()
        .and_then(|n| n.checked_add(1))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POPULATION: f64 = 67_000_000.0;

    fn params() -> SimulationParameters {
        SimulationParameters::new(5.4, 2.0, 10.0, 3.0).unwrap()
    }

    fn counts() -> ObservedCounts {
        ObservedCounts {
            infected_today: 212.0,
            infected_yesterday: 191.0,
            recovered_today: 16.0,
            recovered_yesterday: 15.0,
            population_size: POPULATION,
        }
    }

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual} (tolerance: {tol})"
        );
    }

    #[test]
    fn initial_state_from_observed_counts() {
        let state = initialize(&params(), &counts()).unwrap();
        assert_eq!(state.time_hours, 0);
        assert_close(state.e, 22.0 * 5.4, 1e-9);
        assert_eq!(state.i, 212.0);
        assert_eq!(state.q, 0.0);
        assert_eq!(state.r, 16.0);
        assert_close(state.s, POPULATION - 118.8 - 212.0 - 16.0, 1e-6);
        assert_close(state.total(), POPULATION, 1e-6);
    }

    #[test]
    fn single_step_matches_fluxes() {
        let p = params();
        let init = initialize(&p, &counts()).unwrap();
        let next = step(&init, &p, POPULATION);

        let beta = 0.0625;
        let a = 1.0 / (5.4 * 24.0);
        let gamma = 1.0 / 48.0;
        let delta = 1.0 / 240.0;
        let flux_s_to_e = beta * init.s * init.i / POPULATION;
        let flux_e_to_i = a * init.e;
        let flux_i_to_q = gamma * init.i;
        let flux_q_to_r = delta * init.q;

        assert_eq!(next.time_hours, 1);
        assert_close(next.s, init.s - flux_s_to_e, 1e-6);
        assert_close(next.e, init.e + flux_s_to_e - flux_e_to_i, 1e-9);
        assert_close(next.i, init.i + flux_e_to_i - flux_i_to_q, 1e-9);
        assert_close(next.q, init.q + flux_i_to_q - flux_q_to_r, 1e-9);
        assert_close(next.r, init.r + flux_q_to_r, 1e-9);
    }

    #[test]
    fn zero_horizon_yields_initial_state_only() {
        let states = simulate(&params(), &counts(), 0).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0], initialize(&params(), &counts()).unwrap());
    }

    #[test]
    fn one_year_run_conserves_mass_and_time() {
        let states = simulate(&params(), &counts(), DEFAULT_HORIZON_HOURS).unwrap();
        assert_eq!(states.len(), 8761);

        for (idx, state) in states.iter().enumerate() {
            assert_eq!(state.time_hours, idx as u64);
            let rel_err = (state.total() - POPULATION).abs() / POPULATION;
            assert!(rel_err < 1e-9, "relative mass error {rel_err} at hour {idx}");
            for val in [state.s, state.e, state.i, state.q, state.r] {
                assert!(val >= 0.0, "negative compartment at hour {idx}: {state:?}");
            }
        }
    }

    #[test]
    fn runs_are_deterministic() {
        let first = simulate(&params(), &counts(), 2000).unwrap();
        let second = simulate(&params(), &counts(), 2000).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_r0_keeps_susceptible_constant() {
        let p = SimulationParameters::new(5.4, 2.0, 10.0, 0.0).unwrap();
        let states = simulate(&p, &counts(), DEFAULT_HORIZON_HOURS).unwrap();
        let s0 = states[0].s;
        for state in &states {
            assert_eq!(state.s, s0);
        }

        let first = &states[0];
        let last = states.last().unwrap();
        assert!(last.e + last.i + last.q < first.e + first.i + first.q);
        assert!(last.r > first.r);
    }

    #[test]
    fn invalid_counts_fail_before_stepping() {
        let counts = ObservedCounts {
            population_size: -1.0,
            ..counts()
        };
        assert!(simulate(&params(), &counts, 10).is_err());
    }

    #[test]
    fn overfull_seed_is_permissive_unless_strict() {
        let counts = ObservedCounts {
            population_size: 100.0,
            ..counts()
        };
        let states = simulate(&params(), &counts, 5).unwrap();
        assert!(states[0].s < 0.0);

        let err = simulate_strict(&params(), &counts, 5).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InconsistentInitialCondition { .. }
        ));
    }

    #[test]
    fn negative_daily_change_seeds_negative_exposed() {
        let counts = ObservedCounts {
            infected_today: 180.0,
            ..counts()
        };
        assert_eq!(counts.daily_net_change(), -10.0);

        let p = params();
        let states = simulate(&p, &counts, 48).unwrap();
        let init = &states[0];
        let a = p.rates().incubation;
        assert!(init.e < 0.0);
        assert_close(init.e, -10.0 / (24.0 * a), 1e-9);
        assert_close(init.e, -54.0, 1e-9);

        for state in &states {
            assert_close(state.total(), POPULATION, 1e-6);
        }
    }

    #[test]
    fn zero_quarantine_period_empties_quarantine_each_step() {
        let p = SimulationParameters::new(5.4, 2.0, 0.0, 3.0).unwrap();
        let state = EpidemicState {
            time_hours: 7,
            s: 1000.0,
            e: 20.0,
            i: 48.0,
            q: 30.0,
            r: 5.0,
        };
        let next = step(&state, &p, 1103.0);

        let gamma = 1.0 / 48.0;
        assert_eq!(next.time_hours, 8);
        assert_close(next.q, gamma * state.i, 1e-12);
        assert_close(next.r, state.r + state.q, 1e-12);
        assert_close(next.total(), state.total(), 1e-9);
    }

    #[test]
    fn huge_horizon_does_not_overflow_capacity() {
        assert_eq!(capacity_hint(0), 1);
        assert_eq!(capacity_hint(DEFAULT_HORIZON_HOURS), 8761);
        assert_eq!(capacity_hint(u64::MAX), 0);
    }
}
