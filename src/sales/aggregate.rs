use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::common::{RawRow, SalesRecord, ISO_DATE_FORMAT};
use crate::error::{Result, SalesError};
use super::EntityKind;
use super::period::PeriodPair;

/// How a week-start date becomes the bucket it is grouped and sorted under.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeekKeyPolicy {
    /// `DD/MM`, no year: the same week a year apart lands in the same bucket.
    DayMonth,
    /// `YYYY-MM-DD`.
    FullDate,
}

impl Default for WeekKeyPolicy {
    fn default() -> Self {
        WeekKeyPolicy::DayMonth
    }
}

impl WeekKeyPolicy {
    pub fn key(&self, date: NaiveDate) -> String {
        match self {
            WeekKeyPolicy::DayMonth => { date.format("%d/%m").to_string() },
            WeekKeyPolicy::FullDate => { date.format(ISO_DATE_FORMAT).to_string() },
        }
    }
}

impl FromStr for WeekKeyPolicy {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day_month" => {Ok(WeekKeyPolicy::DayMonth)},
            "full_date" => {Ok(WeekKeyPolicy::FullDate)},
            q => {Err(SalesError::Config(format!("unknown week key policy '{}', expected 'day_month' or 'full_date'", q)))}
        }
    }
}

/// What happens when a week receives a second observation for a role.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateRolePolicy {
    Overwrite,
    Reject,
}

impl Default for DuplicateRolePolicy {
    fn default() -> Self {
        DuplicateRolePolicy::Overwrite
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationOptions {
    pub week_key: WeekKeyPolicy,
    pub duplicate_roles: DuplicateRolePolicy,
}

/// A brand or product with its weekly period pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: i64,
    pub name: String,
    weeks: BTreeMap<String, PeriodPair>,
}

impl EntityRecord {
    pub fn new(id: i64, name: String) -> EntityRecord {
        EntityRecord {
            id,
            name,
            weeks: BTreeMap::new(),
        }
    }

    /// Weeks in ascending week-key order.
    pub fn weeks(&self) -> impl Iterator<Item = (&str, &PeriodPair)> {
        self.weeks.iter().map(|(key, pair)| (key.as_str(), pair))
    }

    pub fn week(&self, key: &str) -> Option<&PeriodPair> {
        self.weeks.get(key)
    }

    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }
}

/// Build phase: owns every entity record while rows are folded in.
/// `finish` freezes the result into a `Ledger`.
#[derive(Debug)]
pub struct Aggregator<K: EntityKind> {
    options: AggregationOptions,
    entities: BTreeMap<String, EntityRecord>,
    rows: usize,
    kind: PhantomData<K>,
}

impl<K: EntityKind> Aggregator<K> {
    pub fn new(options: AggregationOptions) -> Aggregator<K> {
        Aggregator {
            options,
            entities: BTreeMap::new(),
            rows: 0,
            kind: PhantomData,
        }
    }

    /// Coerces and records one raw row.
    pub fn ingest(&mut self, row: &RawRow) -> Result<()> {
        let record = row.coerce(K::ID_COLUMN)?;
        self.record(record)
    }

    pub fn record(&mut self, record: SalesRecord) -> Result<()> {
        let week_key = self.options.week_key.key(record.observation.week_start_date);

        // checked up front so a rejected duplicate leaves no trace
        if self.options.duplicate_roles == DuplicateRolePolicy::Reject {
            let existing = self.entities.get(&record.entity_name)
                .and_then(|entity| entity.week(&week_key))
                .and_then(|pair| pair.get(record.role));

            if existing.is_some() {
                return Err(SalesError::DuplicateRole {
                    kind: K::LABEL,
                    entity: record.entity_name,
                    week: week_key,
                    role: record.role,
                });
            }
        }

        let entity = match self.entities.entry(record.entity_name) {
            Entry::Occupied(e) => { e.into_mut() },
            Entry::Vacant(e) => {
                debug!("new {} '{}' (id {})", K::LABEL, e.key(), record.entity_id);
                let name = e.key().to_owned();
                e.insert(EntityRecord::new(record.entity_id, name))
            }
        };

        let pair = entity.weeks.entry(week_key).or_insert_with(PeriodPair::new);
        if let Some(replaced) = pair.record(record.role, record.observation) {
            debug!(
                "{} '{}': '{}' observation for period {} overwritten",
                K::LABEL, entity.name, record.role, replaced.period_id
            );
        }

        self.rows += 1;
        Ok(())
    }

    /// Folds a whole source in. The first failing row aborts the batch.
    pub fn ingest_all<I>(mut self, rows: I) -> Result<Ledger<K>>
        where I: IntoIterator<Item = Result<RawRow>> {
        for row in rows {
            self.ingest(&row?)?;
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> Ledger<K> {
        info!("Aggregated {} {} rows into {} {} entries", self.rows, K::LABEL, self.entities.len(), K::LABEL);

        Ledger {
            entities: self.entities,
            kind: PhantomData,
        }
    }
}

/// Frozen phase: read-only view over the aggregated entity records.
#[derive(Debug, Clone)]
pub struct Ledger<K: EntityKind> {
    entities: BTreeMap<String, EntityRecord>,
    kind: PhantomData<K>,
}

impl<K: EntityKind> Ledger<K> {
    /// Entities in ascending name order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.values()
    }

    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        self.entities.get(name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
fn brand_rows() -> Vec<RawRow> {
    use crate::common::raw_row;

    vec![
        raw_row(2, "1", "Brand A", "previous", "04/07/2021", "100", "20"),
        raw_row(3, "1", "Brand A", "current", "04/07/2022", "200", "30"),
        raw_row(4, "1", "Brand A", "current", "18/07/2022", "150", "40"),
        raw_row(5, "1", "Brand A", "previous", "11/07/2021", "80", "10"),
        raw_row(6, "2", "Brand B", "previous", "18/07/2022", "300", "50"),
        raw_row(7, "3", "Brand C", "current", "25/07/2022", "120", "38"),
    ]
}

#[test]
fn test_aggregate_groups_by_entity_then_week() {
    use super::Brand;
    use crate::common::Role;

    let ledger = Aggregator::<Brand>::new(AggregationOptions::default())
        .ingest_all(brand_rows().into_iter().map(Ok))
        .unwrap();

    assert_eq!(ledger.len(), 3);
    let names: Vec<&str> = ledger.entities().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Brand A", "Brand B", "Brand C"]);

    let brand_a = ledger.get("Brand A").unwrap();
    assert_eq!(brand_a.id, 1);
    assert_eq!(brand_a.week_count(), 3);

    // 2021 and 2022 share the 04/07 bucket
    let week = brand_a.week("04/07").unwrap();
    assert_eq!(week.get(Role::Previous).map(|o| o.units_sold), Some(20));
    assert_eq!(week.get(Role::Current).map(|o| o.units_sold), Some(30));
    assert_eq!(brand_a.week("18/07").unwrap().get(Role::Current).map(|o| o.units_sold), Some(40));

    assert_eq!(ledger.get("Brand B").unwrap().week("18/07").unwrap().get(Role::Previous).map(|o| o.units_sold), Some(50));
    assert_eq!(ledger.get("Brand C").unwrap().week("25/07").unwrap().get(Role::Current).map(|o| o.units_sold), Some(38));
    assert!(ledger.get("brand a").is_none());
}

#[test]
fn test_full_date_week_keys_keep_years_apart() {
    use super::Brand;

    let options = AggregationOptions {
        week_key: WeekKeyPolicy::FullDate,
        ..AggregationOptions::default()
    };
    let ledger = Aggregator::<Brand>::new(options)
        .ingest_all(brand_rows().into_iter().map(Ok))
        .unwrap();

    let brand_a = ledger.get("Brand A").unwrap();
    assert_eq!(brand_a.week_count(), 4);
    let keys: Vec<&str> = brand_a.weeks().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["2021-07-04", "2021-07-11", "2022-07-04", "2022-07-18"]);
}

#[test]
fn test_first_id_wins() {
    use super::Product;
    use crate::common::raw_row;

    let rows = vec![
        raw_row(2, "5000", "Product A", "current", "04/07/2022", "10", "1"),
        raw_row(3, "9999", "Product A", "previous", "04/07/2021", "10", "1"),
    ];
    let ledger = Aggregator::<Product>::new(AggregationOptions::default())
        .ingest_all(rows.into_iter().map(Ok))
        .unwrap();

    assert_eq!(ledger.get("Product A").unwrap().id, 5000);
}

#[test]
fn test_invalid_role_leaves_state_untouched() {
    use super::Brand;
    use crate::common::{raw_row, Role};

    let mut aggregator = Aggregator::<Brand>::new(AggregationOptions::default());
    aggregator.ingest(&raw_row(2, "1", "Brand A", "current", "04/07/2022", "200", "30")).unwrap();

    match aggregator.ingest(&raw_row(3, "1", "Brand A", "next", "04/07/2022", "600", "60")) {
        Err(SalesError::InvalidRowRole { line, entity, role }) => {
            assert_eq!(line, 3);
            assert_eq!(entity, "Brand A");
            assert_eq!(role, "next");
        },
        other => { panic!("expected InvalidRowRole, got {:?}", other) }
    }

    let ledger = aggregator.finish();
    let week = ledger.get("Brand A").unwrap().week("04/07").unwrap();
    assert_eq!(week.get(Role::Current).map(|o| o.units_sold), Some(30));
    assert!(week.get(Role::Previous).is_none());
}

#[test]
fn test_malformed_row_aborts_batch() {
    use super::Brand;
    use crate::common::raw_row;

    let mut rows = brand_rows();
    rows.insert(2, raw_row(9, "1", "Brand A", "current", "not a date", "200", "30"));

    match Aggregator::<Brand>::new(AggregationOptions::default()).ingest_all(rows.into_iter().map(Ok)) {
        Err(SalesError::MalformedRow { line, field, value, .. }) => {
            assert_eq!(line, 9);
            assert_eq!(field, "week_commencing_date");
            assert_eq!(value, "not a date");
        },
        other => { panic!("expected MalformedRow, got {:?}", other) }
    }
}

#[test]
fn test_duplicate_roles() {
    use super::Brand;
    use crate::common::{raw_row, Role};

    let rows = vec![
        raw_row(2, "1", "Brand A", "current", "04/07/2022", "200", "30"),
        raw_row(3, "1", "Brand A", "current", "04/07/2022", "250", "35"),
    ];

    let ledger = Aggregator::<Brand>::new(AggregationOptions::default())
        .ingest_all(rows.clone().into_iter().map(Ok))
        .unwrap();
    assert_eq!(ledger.get("Brand A").unwrap().week("04/07").unwrap().get(Role::Current).map(|o| o.units_sold), Some(35));

    let strict = AggregationOptions {
        duplicate_roles: DuplicateRolePolicy::Reject,
        ..AggregationOptions::default()
    };
    match Aggregator::<Brand>::new(strict).ingest_all(rows.into_iter().map(Ok)) {
        Err(SalesError::DuplicateRole { entity, week, role, .. }) => {
            assert_eq!(entity, "Brand A");
            assert_eq!(week, "04/07");
            assert_eq!(role, Role::Current);
        },
        other => { panic!("expected DuplicateRole, got {:?}", other) }
    }
}

#[test]
fn test_week_key_policy_from_str() {
    assert_eq!("day_month".parse::<WeekKeyPolicy>().unwrap(), WeekKeyPolicy::DayMonth);
    assert_eq!("full_date".parse::<WeekKeyPolicy>().unwrap(), WeekKeyPolicy::FullDate);
    assert!("weekly".parse::<WeekKeyPolicy>().is_err());
}
