use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{Result, SalesError};

/// Date format used by the sales CSV exports, e.g. `04/07/2022`.
pub const INPUT_DATE_FORMAT: &str = "%d/%m/%Y";
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Current,
    Previous,
}

impl FromStr for Role {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "current" => {Ok(Role::Current)},
            "previous" => {Ok(Role::Previous)},
            q => {Err(SalesError::InvalidRole(q.to_owned()))}
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Role::Current => {write!(f, "current")},
            Role::Previous => {write!(f, "previous")},
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    GrossSales,
    UnitsSold,
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Metric::GrossSales => {write!(f, "gross sales")},
            Metric::UnitsSold => {write!(f, "units sold")},
        }
    }
}

/// One validated period of sales for an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodObservation {
    pub period_id: i64,
    pub week_start_date: NaiveDate,
    pub gross_sales: f64,
    pub units_sold: u64,
}

impl PeriodObservation {
    pub fn new(period_id: i64, week_start_date: NaiveDate, gross_sales: f64, units_sold: u64) -> PeriodObservation {
        PeriodObservation {
            period_id,
            week_start_date,
            gross_sales,
            units_sold,
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::GrossSales => { self.gross_sales },
            Metric::UnitsSold => { self.units_sold as f64 },
        }
    }
}

/// A row as it comes out of a record source: every field still text.
/// `line` is the 1-based source line, used only for error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub line: u64,
    pub entity_id: String,
    pub entity_name: String,
    pub period_id: String,
    pub period_name: String,
    pub week_commencing_date: String,
    pub gross_sales: String,
    pub units_sold: String,
}

/// A raw row after type coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub entity_id: i64,
    pub entity_name: String,
    pub role: Role,
    pub observation: PeriodObservation,
}

impl RawRow {
    /// Coerces every field, failing on the first one that does not parse.
    /// `id_field` is the column name reported when the entity id is bad.
    pub fn coerce(&self, id_field: &'static str) -> Result<SalesRecord> {
        let entity_id = self.parse_field(id_field, &self.entity_id, |v| {
            v.parse::<i64>().map_err(|e| e.to_string())
        })?;

        let period_id = self.parse_field("period_id", &self.period_id, |v| {
            v.parse::<i64>().map_err(|e| e.to_string())
        })?;

        let role = self.period_name.trim().parse::<Role>().map_err(|_| SalesError::InvalidRowRole {
            line: self.line,
            entity: self.entity_name.clone(),
            role: self.period_name.clone(),
        })?;

        let week_start_date = self.parse_field("week_commencing_date", &self.week_commencing_date, |v| {
            NaiveDate::parse_from_str(v, INPUT_DATE_FORMAT).map_err(|e| e.to_string())
        })?;

        let gross_sales = self.parse_field("gross_sales", &self.gross_sales, |v| {
            match v.parse::<f64>() {
                Ok(n) if !n.is_finite() => { Err("not a finite number".to_owned()) },
                Ok(n) if n < 0.0 => { Err("must not be negative".to_owned()) },
                Ok(n) => { Ok(n) },
                Err(e) => { Err(e.to_string()) }
            }
        })?;

        let units_sold = self.parse_field("units_sold", &self.units_sold, |v| {
            v.parse::<u64>().map_err(|e| e.to_string())
        })?;

        Ok(SalesRecord {
            entity_id,
            entity_name: self.entity_name.clone(),
            role,
            observation: PeriodObservation::new(period_id, week_start_date, gross_sales, units_sold),
        })
    }

    fn parse_field<T, F>(&self, field: &'static str, value: &str, parse: F) -> Result<T>
        where F: Fn(&str) -> std::result::Result<T, String> {
        parse(value.trim()).map_err(|reason| SalesError::MalformedRow {
            line: self.line,
            field,
            value: value.to_owned(),
            reason,
        })
    }
}

#[cfg(test)]
pub fn raw_row(line: u64, id: &str, name: &str, period_name: &str, date: &str, gross: &str, units: &str) -> RawRow {
    RawRow {
        line,
        entity_id: id.to_owned(),
        entity_name: name.to_owned(),
        period_id: if period_name == "previous" { "1".to_owned() } else { "2".to_owned() },
        period_name: period_name.to_owned(),
        week_commencing_date: date.to_owned(),
        gross_sales: gross.to_owned(),
        units_sold: units.to_owned(),
    }
}

#[test]
fn test_role_parse() {
    assert_eq!("current".parse::<Role>().unwrap(), Role::Current);
    assert_eq!("previous".parse::<Role>().unwrap(), Role::Previous);

    match "Current".parse::<Role>() {
        Err(SalesError::InvalidRole(role)) => { assert_eq!(role, "Current") },
        other => { panic!("expected InvalidRole, got {:?}", other) }
    }
}

#[test]
fn test_coerce_row() {
    let record = raw_row(2, "101", "Brand A", "current", "04/07/2022", "200.50", "30")
        .coerce("brand_id")
        .unwrap();

    assert_eq!(record.entity_id, 101);
    assert_eq!(record.entity_name, "Brand A");
    assert_eq!(record.role, Role::Current);
    assert_eq!(record.observation.week_start_date, NaiveDate::from_ymd_opt(2022, 7, 4).unwrap());
    assert_eq!(record.observation.gross_sales, 200.5);
    assert_eq!(record.observation.units_sold, 30);
}

#[test]
fn test_coerce_names_offending_field() {
    let cases = vec![
        (raw_row(3, "abc", "Brand A", "current", "04/07/2022", "200", "30"), "barcode_no"),
        (raw_row(3, "1", "Brand A", "current", "2022-07-04", "200", "30"), "week_commencing_date"),
        (raw_row(3, "1", "Brand A", "current", "31/02/2022", "200", "30"), "week_commencing_date"),
        (raw_row(3, "1", "Brand A", "current", "04/07/2022", "lots", "30"), "gross_sales"),
        (raw_row(3, "1", "Brand A", "current", "04/07/2022", "-5", "30"), "gross_sales"),
        (raw_row(3, "1", "Brand A", "current", "04/07/2022", "200", "3.5"), "units_sold"),
    ];

    for (row, expected) in cases {
        match row.coerce("barcode_no") {
            Err(SalesError::MalformedRow { line, field, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(field, expected);
            },
            other => { panic!("expected MalformedRow for {}, got {:?}", expected, other) }
        }
    }
}
