use chrono::NaiveDate;

use crate::common::{Metric, PeriodObservation, Role, ISO_DATE_FORMAT};
use crate::error::{Result, SalesError};

/// The current and previous observations for one entity in one week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodPair {
    current: Option<PeriodObservation>,
    previous: Option<PeriodObservation>,
}

impl PeriodPair {
    pub fn new() -> PeriodPair {
        PeriodPair::default()
    }

    /// Stores `observation` under `role`, returning whatever it replaced.
    pub fn record(&mut self, role: Role, observation: PeriodObservation) -> Option<PeriodObservation> {
        match role {
            Role::Current => { self.current.replace(observation) },
            Role::Previous => { self.previous.replace(observation) },
        }
    }

    /// Text-role variant of `record`. The role is parsed before anything is
    /// stored, so an invalid role leaves the pair as it was.
    pub fn record_named(&mut self, role: &str, observation: PeriodObservation) -> Result<Option<PeriodObservation>> {
        let role = role.parse::<Role>()?;
        Ok(self.record(role, observation))
    }

    pub fn get(&self, role: Role) -> Option<&PeriodObservation> {
        match role {
            Role::Current => { self.current.as_ref() },
            Role::Previous => { self.previous.as_ref() },
        }
    }

    /// Percentage growth from previous to current, rounded to 2 places.
    ///
    /// A missing previous period gives `None`, a missing current period is a
    /// full decline (`-100.0`). A zero previous value has no defined growth
    /// and is reported as `UndefinedGrowth` for the caller to resolve.
    pub fn growth(&self, metric: Metric) -> Result<Option<f64>> {
        match (self.current.as_ref(), self.previous.as_ref()) {
            (Some(current), Some(previous)) => {
                let base = previous.metric(metric);
                if base == 0.0 {
                    return Err(SalesError::UndefinedGrowth { metric });
                }
                Ok(Some(round_percent((current.metric(metric) - base) / base * 100.0)))
            },
            (Some(_), None) => { Ok(None) },
            (None, Some(_)) => { Ok(Some(-100.0)) },
            (None, None) => { Ok(None) }
        }
    }

    pub fn current_week_date(&self) -> Option<NaiveDate> {
        self.current.as_ref().map(|o| o.week_start_date)
    }

    pub fn previous_week_date(&self) -> Option<NaiveDate> {
        self.previous.as_ref().map(|o| o.week_start_date)
    }

    pub fn current_week_iso(&self) -> Option<String> {
        self.current_week_date().map(|d| d.format(ISO_DATE_FORMAT).to_string())
    }

    pub fn previous_week_iso(&self) -> Option<String> {
        self.previous_week_date().map(|d| d.format(ISO_DATE_FORMAT).to_string())
    }
}

/// Formatting rounds the exact binary value with ties to even, so
/// `-90.625` becomes `-90.62` rather than `-90.63`.
fn round_percent(value: f64) -> f64 {
    format!("{:.2}", value).parse::<f64>().unwrap_or(value)
}

#[cfg(test)]
fn observation(period_id: i64, ymd: (i32, u32, u32), gross_sales: f64, units_sold: u64) -> PeriodObservation {
    PeriodObservation::new(period_id, NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(), gross_sales, units_sold)
}

#[test]
fn test_growth_with_both_periods() {
    let mut pair = PeriodPair::new();
    assert_eq!(pair.growth(Metric::GrossSales).unwrap(), None);

    pair.record(Role::Current, observation(2, (2022, 7, 4), 200.0, 20));
    pair.record(Role::Previous, observation(1, (2021, 7, 4), 100.0, 10));

    assert_eq!(pair.growth(Metric::GrossSales).unwrap(), Some(100.0));
    assert_eq!(pair.growth(Metric::UnitsSold).unwrap(), Some(100.0));
}

#[test]
fn test_growth_rounds_to_two_places() {
    let mut pair = PeriodPair::new();
    pair.record(Role::Previous, observation(1, (2022, 6, 27), 300.0, 30));
    pair.record(Role::Current, observation(2, (2022, 7, 4), 200.0, 40));

    assert_eq!(pair.growth(Metric::UnitsSold).unwrap(), Some(33.33));
    assert_eq!(pair.growth(Metric::GrossSales).unwrap(), Some(-33.33));

    pair.record(Role::Current, observation(2, (2022, 7, 4), 300.0, 30));
    assert_eq!(pair.growth(Metric::UnitsSold).unwrap(), Some(0.0));
    assert_eq!(pair.growth(Metric::GrossSales).unwrap(), Some(0.0));
}

#[test]
fn test_growth_with_one_period() {
    let mut current_only = PeriodPair::new();
    current_only.record(Role::Current, observation(2, (2022, 7, 4), 200.0, 20));
    assert_eq!(current_only.growth(Metric::GrossSales).unwrap(), None);
    assert_eq!(current_only.growth(Metric::UnitsSold).unwrap(), None);
    assert_eq!(current_only.previous_week_iso(), None);

    let mut previous_only = PeriodPair::new();
    previous_only.record(Role::Previous, observation(1, (2022, 7, 18), 0.0, 50));
    assert_eq!(previous_only.growth(Metric::GrossSales).unwrap(), Some(-100.0));
    assert_eq!(previous_only.growth(Metric::UnitsSold).unwrap(), Some(-100.0));
    assert_eq!(previous_only.current_week_date(), None);
    assert_eq!(previous_only.previous_week_iso(), Some("2022-07-18".to_owned()));
}

#[test]
fn test_growth_zero_baseline() {
    let mut pair = PeriodPair::new();
    pair.record(Role::Previous, observation(1, (2022, 6, 27), 0.0, 10));
    pair.record(Role::Current, observation(2, (2022, 7, 4), 50.0, 10));

    match pair.growth(Metric::GrossSales) {
        Err(SalesError::UndefinedGrowth { metric }) => { assert_eq!(metric, Metric::GrossSales) },
        other => { panic!("expected UndefinedGrowth, got {:?}", other) }
    }
    assert_eq!(pair.growth(Metric::UnitsSold).unwrap(), Some(0.0));
}

#[test]
fn test_record_overwrites_and_rejects_unknown_role() {
    let mut pair = PeriodPair::new();
    assert!(pair.record_named("current", observation(2, (2022, 7, 4), 200.0, 20)).unwrap().is_none());

    let replaced = pair.record_named("current", observation(3, (2022, 7, 4), 250.0, 25)).unwrap();
    assert_eq!(replaced.map(|o| o.period_id), Some(2));
    assert_eq!(pair.get(Role::Current).map(|o| o.units_sold), Some(25));

    let before = pair.clone();
    match pair.record_named("next", observation(4, (2023, 7, 4), 600.0, 60)) {
        Err(SalesError::InvalidRole(role)) => { assert_eq!(role, "next") },
        other => { panic!("expected InvalidRole, got {:?}", other) }
    }
    assert_eq!(pair, before);
    assert_eq!(pair.current_week_iso(), Some("2022-07-04".to_owned()));
}

#[test]
fn test_growth_rounds_ties_to_even() {
    let mut pair = PeriodPair::new();
    pair.record(Role::Previous, observation(1, (2022, 6, 27), 32.0, 32));
    pair.record(Role::Current, observation(2, (2022, 7, 4), 3.0, 3));

    // -29 / 32 * 100 is exactly -90.625
    assert_eq!(pair.growth(Metric::UnitsSold).unwrap(), Some(-90.62));
    assert_eq!(pair.growth(Metric::GrossSales).unwrap(), Some(-90.62));

    pair.record(Role::Previous, observation(1, (2022, 6, 27), 8.0, 8));
    pair.record(Role::Current, observation(2, (2022, 7, 4), 8.01, 9));
    assert_eq!(pair.growth(Metric::UnitsSold).unwrap(), Some(12.5));
    assert_eq!(pair.growth(Metric::GrossSales).unwrap(), Some(0.12));
}
