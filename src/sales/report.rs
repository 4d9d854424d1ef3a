use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::Metric;
use crate::error::{Result, SalesError};
use super::{Brand, EntityKind, Product};
use super::aggregate::{EntityRecord, Ledger};
use super::period::PeriodPair;

/// Growth figures shared by brand and product rows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeeklyGrowth {
    pub current_week_commencing_date: Option<String>,
    pub previous_week_commencing_date: Option<String>,
    pub perc_gross_sales_growth: Option<f64>,
    pub perc_unit_sales_growth: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BrandGrowth {
    pub brand_id: i64,
    pub brand_name: String,
    #[serde(flatten)]
    pub growth: WeeklyGrowth,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProductGrowth {
    pub barcode_no: i64,
    pub product_name: String,
    #[serde(flatten)]
    pub growth: WeeklyGrowth,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Report {
    #[serde(rename = "PRODUCT")]
    pub product: Vec<ProductGrowth>,
    #[serde(rename = "BRAND")]
    pub brand: Vec<BrandGrowth>,
}

/// What a zero previous-period value turns into in the report.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZeroBaselinePolicy {
    /// Emit `null` and log a warning.
    Null,
    /// Fail the run.
    Error,
}

impl Default for ZeroBaselinePolicy {
    fn default() -> Self {
        ZeroBaselinePolicy::Null
    }
}

impl std::str::FromStr for ZeroBaselinePolicy {
    type Err = SalesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "null" => {Ok(ZeroBaselinePolicy::Null)},
            "error" => {Ok(ZeroBaselinePolicy::Error)},
            q => {Err(SalesError::Config(format!("unknown zero baseline policy '{}', expected 'null' or 'error'", q)))}
        }
    }
}

pub fn assemble(brands: &Ledger<Brand>, products: &Ledger<Product>, zero_baseline: ZeroBaselinePolicy) -> Result<Report> {
    let report = Report {
        product: assemble_rows(products, zero_baseline)?,
        brand: assemble_rows(brands, zero_baseline)?,
    };

    info!("Assembled report with {} brand rows and {} product rows", report.brand.len(), report.product.len());
    Ok(report)
}

/// Flattens one ledger: entities by name, weeks by key, and within each
/// entity the weeks with no current period moved to the end.
pub fn assemble_rows<K: EntityKind>(ledger: &Ledger<K>, zero_baseline: ZeroBaselinePolicy) -> Result<Vec<K::ReportRow>> {
    let mut rows = Vec::new();

    for entity in ledger.entities() {
        let mut no_current = Vec::new();

        for (week_key, pair) in entity.weeks() {
            let growth = weekly_growth::<K>(entity, week_key, pair, zero_baseline)?;
            let row = K::report_row(entity.id, &entity.name, growth);

            if pair.current_week_date().is_some() {
                rows.push(row);
            } else {
                no_current.push(row);
            }
        }

        rows.append(&mut no_current);
    }

    Ok(rows)
}

fn weekly_growth<K: EntityKind>(entity: &EntityRecord, week_key: &str, pair: &PeriodPair, zero_baseline: ZeroBaselinePolicy) -> Result<WeeklyGrowth> {
    let resolve = |metric: Metric| -> Result<Option<f64>> {
        match (pair.growth(metric), zero_baseline) {
            (Err(SalesError::UndefinedGrowth { .. }), ZeroBaselinePolicy::Null) => {
                warn!("{} '{}', week {}: previous {} is zero, growth left empty", K::LABEL, entity.name, week_key, metric);
                Ok(None)
            },
            (Err(e), _) => {
                Err(SalesError::Entity {
                    kind: K::LABEL,
                    entity: entity.name.clone(),
                    week: week_key.to_owned(),
                    source: Box::new(e),
                })
            },
            (Ok(growth), _) => { Ok(growth) }
        }
    };

    Ok(WeeklyGrowth {
        current_week_commencing_date: pair.current_week_iso(),
        previous_week_commencing_date: pair.previous_week_iso(),
        perc_gross_sales_growth: resolve(Metric::GrossSales)?,
        perc_unit_sales_growth: resolve(Metric::UnitsSold)?,
    })
}

#[cfg(test)]
fn ledgers(brand_rows: Vec<crate::common::RawRow>, product_rows: Vec<crate::common::RawRow>) -> (Ledger<Brand>, Ledger<Product>) {
    use super::aggregate::{Aggregator, AggregationOptions};

    let brands = Aggregator::<Brand>::new(AggregationOptions::default())
        .ingest_all(brand_rows.into_iter().map(Ok))
        .unwrap();
    let products = Aggregator::<Product>::new(AggregationOptions::default())
        .ingest_all(product_rows.into_iter().map(Ok))
        .unwrap();
    (brands, products)
}

#[test]
fn test_assemble_orders_entities_and_defers_missing_current() {
    use crate::common::raw_row;

    let (brands, products) = ledgers(
        vec![
            raw_row(2, "2", "Brand B", "current", "11/07/2022", "10", "1"),
            raw_row(3, "1", "Brand A", "previous", "04/07/2021", "100", "10"),
            raw_row(4, "1", "Brand A", "current", "04/07/2022", "200", "20"),
            raw_row(5, "1", "Brand A", "previous", "01/07/2021", "100", "10"),
            raw_row(6, "1", "Brand A", "current", "18/07/2022", "150", "40"),
            raw_row(7, "1", "Brand A", "previous", "25/07/2021", "80", "8"),
        ],
        vec![
            raw_row(2, "5012345678900", "Product A", "previous", "18/07/2022", "300", "50"),
        ],
    );

    let report = assemble(&brands, &products, ZeroBaselinePolicy::Null).unwrap();

    let order: Vec<(&str, Option<&str>, Option<&str>)> = report.brand.iter()
        .map(|r| (
            r.brand_name.as_str(),
            r.growth.current_week_commencing_date.as_deref(),
            r.growth.previous_week_commencing_date.as_deref(),
        ))
        .collect();

    assert_eq!(order, vec![
        ("Brand A", Some("2022-07-04"), Some("2021-07-04")),
        ("Brand A", Some("2022-07-18"), None),
        ("Brand A", None, Some("2021-07-01")),
        ("Brand A", None, Some("2021-07-25")),
        ("Brand B", Some("2022-07-11"), None),
    ]);

    assert_eq!(report.brand[0].brand_id, 1);
    assert_eq!(report.brand[0].growth.perc_gross_sales_growth, Some(100.0));
    assert_eq!(report.brand[0].growth.perc_unit_sales_growth, Some(100.0));
    assert_eq!(report.brand[1].growth.perc_unit_sales_growth, None);
    assert_eq!(report.brand[2].growth.perc_unit_sales_growth, Some(-100.0));

    assert_eq!(report.product.len(), 1);
    assert_eq!(report.product[0].barcode_no, 5012345678900);
    assert_eq!(report.product[0].growth.current_week_commencing_date, None);
    assert_eq!(report.product[0].growth.perc_gross_sales_growth, Some(-100.0));
}

#[test]
fn test_zero_baseline_policies() {
    use crate::common::raw_row;

    let (brands, products) = ledgers(
        vec![
            raw_row(2, "1", "Brand A", "previous", "04/07/2021", "0", "10"),
            raw_row(3, "1", "Brand A", "current", "04/07/2022", "50", "15"),
        ],
        Vec::new(),
    );

    let report = assemble(&brands, &products, ZeroBaselinePolicy::Null).unwrap();
    assert_eq!(report.brand[0].growth.perc_gross_sales_growth, None);
    assert_eq!(report.brand[0].growth.perc_unit_sales_growth, Some(50.0));

    match assemble(&brands, &products, ZeroBaselinePolicy::Error) {
        Err(SalesError::Entity { kind, entity, week, source }) => {
            assert_eq!(kind, "brand");
            assert_eq!(entity, "Brand A");
            assert_eq!(week, "04/07");
            assert!(matches!(*source, SalesError::UndefinedGrowth { metric: Metric::GrossSales }));
        },
        other => { panic!("expected UndefinedGrowth for Brand A, got {:?}", other) }
    }
}

#[test]
fn test_report_json_shape_and_round_trip() {
    use crate::common::raw_row;

    let (brands, products) = ledgers(
        vec![
            raw_row(2, "1", "Brand A", "previous", "04/07/2021", "300", "30"),
            raw_row(3, "1", "Brand A", "current", "04/07/2022", "200", "40"),
        ],
        vec![
            raw_row(2, "42", "Product C", "current", "25/07/2022", "120", "38"),
        ],
    );
    let report = assemble(&brands, &products, ZeroBaselinePolicy::Null).unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["BRAND"][0], serde_json::json!({
        "brand_id": 1,
        "brand_name": "Brand A",
        "current_week_commencing_date": "2022-07-04",
        "previous_week_commencing_date": "2021-07-04",
        "perc_gross_sales_growth": -33.33,
        "perc_unit_sales_growth": 33.33
    }));
    assert_eq!(value["PRODUCT"][0], serde_json::json!({
        "barcode_no": 42,
        "product_name": "Product C",
        "current_week_commencing_date": "2022-07-25",
        "previous_week_commencing_date": null,
        "perc_gross_sales_growth": null,
        "perc_unit_sales_growth": null
    }));

    let text = serde_json::to_string(&report).unwrap();
    assert!(text.starts_with("{\"PRODUCT\":"));
    let parsed: Report = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, report);
}
