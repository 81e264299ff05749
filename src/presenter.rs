//! Plot-ready series built from simulated states.

use crate::model::EpidemicState;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

/// Scalar quantity extracted from each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    Susceptible,
    Exposed,
    Infectious,
    Quarantined,
    Removed,
    /// Currently infected: `I + Q`.
    Active,
    /// Ever detected: `I + Q + R`.
    Cumulative,
}

impl Projection {
    pub fn apply(self, state: &EpidemicState) -> f64 {
        match self {
            Projection::Susceptible => state.s,
            Projection::Exposed => state.e,
            Projection::Infectious => state.i,
            Projection::Quarantined => state.q,
            Projection::Removed => state.r,
            Projection::Active => state.i + state.q,
            Projection::Cumulative => state.i + state.q + state.r,
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Projection::Susceptible => "susceptible",
            Projection::Exposed => "exposed",
            Projection::Infectious => "infectious",
            Projection::Quarantined => "quarantined",
            Projection::Removed => "removed",
            Projection::Active => "active",
            Projection::Cumulative => "cumulative",
        };
        f.write_str(name)
    }
}

/// A single `(date, value)` pair of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub date: NaiveDateTime,
    pub time_hours: u64,
    pub value: f64,
}

/// Map every `sample_hours`-th state through `proj` onto a date axis.
///
/// The last state is always kept so that a series ends at the horizon.
pub fn project<F>(
    states: &[EpidemicState],
    start_date: NaiveDate,
    sample_hours: u64,
    proj: F,
) -> Vec<Point>
where
    F: Fn(&EpidemicState) -> f64,
{
    let origin = start_date.and_time(NaiveTime::MIN);
    let sample_hours = sample_hours.max(1);
    let last_idx = states.len().saturating_sub(1);

    states
        .iter()
        .enumerate()
        .filter(|(idx, state)| state.time_hours % sample_hours == 0 || *idx == last_idx)
        .map(|(_, state)| Point {
            date: origin + TimeDelta::hours(state.time_hours as i64),
            time_hours: state.time_hours,
            value: proj(state),
        })
        .collect()
}

/// Write a series as CSV with a `date,time_hours,value` header.
pub fn write_csv<P: AsRef<Path>>(file: P, points: &[Point]) -> Result<()> {
    let file = file.as_ref();
    let mut writer =
        csv::Writer::from_path(file).with_context(|| format!("failed to create {file:?}"))?;
    for point in points {
        writer.serialize(point).context("failed to serialize point")?;
    }
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(n: u64) -> Vec<EpidemicState> {
        (0..n)
            .map(|t| EpidemicState {
                time_hours: t,
                s: 100.0 - t as f64,
                e: 1.0,
                i: 2.0,
                q: 3.0,
                r: t as f64,
            })
            .collect()
    }

    #[test]
    fn projections_sum_compartments() {
        let state = states(5)[4];
        assert_eq!(Projection::Active.apply(&state), 5.0);
        assert_eq!(Projection::Cumulative.apply(&state), 9.0);
        assert_eq!(Projection::Susceptible.apply(&state), 96.0);
        assert_eq!(Projection::Active.to_string(), "active");
    }

    #[test]
    fn project_samples_daily_and_keeps_last() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 27).unwrap();
        let points = project(&states(50), start, 24, |s| Projection::Removed.apply(s));

        let hours: Vec<_> = points.iter().map(|p| p.time_hours).collect();
        assert_eq!(hours, vec![0, 24, 48, 49]);
        assert_eq!(points[0].date, start.and_time(NaiveTime::MIN));
        assert_eq!(
            points[1].date.date(),
            NaiveDate::from_ymd_opt(2020, 3, 28).unwrap()
        );
        assert_eq!(points[3].value, 49.0);
    }

    #[test]
    fn project_accepts_closures() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let points = project(&states(3), start, 1, |s| s.e * 10.0);
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.value == 10.0));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir_name = format!("seiqr_presenter_csv_{}", std::process::id());
        let dir = std::env::temp_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("series.csv");

        let start = NaiveDate::from_ymd_opt(2020, 3, 27).unwrap();
        let points = project(&states(25), start, 24, |s| Projection::Active.apply(s));
        write_csv(&file, &points).unwrap();

        let contents = std::fs::read_to_string(&file).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "date,time_hours,value");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2020-03-27T00:00:00,0,"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
