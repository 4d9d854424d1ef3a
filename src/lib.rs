//! Week-over-week sales growth for brands and products.
//!
//! Brand and product CSV exports are folded into per-entity, per-week
//! current/previous pairs, turned into percentage growth figures and written
//! out as one JSON report.

pub mod common;
pub mod config;
pub mod error;
pub mod sales;
pub mod sink;
pub mod source;

use tracing::info;

use common::RawRow;
use config::Config;
use error::Result;
use sales::{Brand, Product};
use sales::aggregate::Aggregator;
use sales::report::{assemble, Report};
use sink::{JsonFileSink, ReportSink};
use source::CsvSource;

/// Aggregates both sources and assembles the report. Either source failing
/// fails the whole run; there is no partial report.
pub fn build_report<B, P>(brand_rows: B, product_rows: P, config: &Config) -> Result<Report>
    where B: IntoIterator<Item = Result<RawRow>>,
          P: IntoIterator<Item = Result<RawRow>> {
    let options = config.aggregation_options();

    let brands = Aggregator::<Brand>::new(options).ingest_all(brand_rows)?;
    let products = Aggregator::<Product>::new(options).ingest_all(product_rows)?;

    assemble(&brands, &products, config.aggregation.zero_baseline)
}

/// Reads the configured CSV inputs and writes the report to `sink`.
pub fn run<S: ReportSink>(config: &Config, sink: S) -> Result<Report> {
    info!("Reading brand sales from {}", config.input.brand.display());
    let brand_rows = CsvSource::<Brand, _>::from_path(&config.input.brand)?;

    info!("Reading product sales from {}", config.input.product.display());
    let product_rows = CsvSource::<Product, _>::from_path(&config.input.product)?;

    let report = build_report(brand_rows, product_rows, config)?;
    sink.write_report(&report)?;

    Ok(report)
}

/// `run` with the JSON file sink named in the config.
pub fn run_to_file(config: &Config) -> Result<Report> {
    let sink = JsonFileSink::new(&config.output.path, config.output.pretty);
    run(config, sink)
}

#[cfg(test)]
const TEST_SALES_BRAND: &str = "\
brand_id,brand,period_id,period_name,week_commencing_date,gross_sales,units_sold
1,Brand A,1,previous,04/07/2021,100.00,20
1,Brand A,2,current,04/07/2022,200.00,30
1,Brand A,2,current,18/07/2022,180.50,40
1,Brand A,1,previous,11/07/2021,90.00,15
2,Brand B,1,previous,18/07/2021,300.00,50
3,Brand C,2,current,25/07/2022,120.00,38
";

#[cfg(test)]
const TEST_SALES_PRODUCT: &str = "\
barcode_no,product_name,period_id,period_name,week_commencing_date,gross_sales,units_sold
5000001,Product A,1,previous,04/07/2021,50.00,20
5000001,Product A,2,current,04/07/2022,75.00,30
5000001,Product A,2,current,18/07/2022,60.00,40
5000002,Product B,1,previous,18/07/2021,150.00,50
5000003,Product C,2,current,25/07/2022,95.00,38
";

#[test]
fn test_run_end_to_end() {
    use std::fs;

    let dir = tempfile::tempdir().unwrap();
    let brand_path = dir.path().join("sales_brand.csv");
    let product_path = dir.path().join("sales_product.csv");
    fs::write(&brand_path, TEST_SALES_BRAND).unwrap();
    fs::write(&product_path, TEST_SALES_PRODUCT).unwrap();

    let mut config = Config::default();
    config.input.brand = brand_path;
    config.input.product = product_path;
    config.output.path = dir.path().join("output").join("results.json");

    let report = run_to_file(&config).unwrap();

    let names: Vec<&str> = report.brand.iter().map(|r| r.brand_name.as_str()).collect();
    assert_eq!(names, vec!["Brand A", "Brand A", "Brand A", "Brand B", "Brand C"]);

    // 04/07: 100 -> 200 gross, 20 -> 30 units
    assert_eq!(report.brand[0].growth.current_week_commencing_date.as_deref(), Some("2022-07-04"));
    assert_eq!(report.brand[0].growth.perc_gross_sales_growth, Some(100.0));
    assert_eq!(report.brand[0].growth.perc_unit_sales_growth, Some(50.0));

    // 18/07 has no previous period
    assert_eq!(report.brand[1].growth.previous_week_commencing_date, None);
    assert_eq!(report.brand[1].growth.perc_unit_sales_growth, None);

    // 11/07 has no current period and sorts after the weeks that do
    assert_eq!(report.brand[2].growth.current_week_commencing_date, None);
    assert_eq!(report.brand[2].growth.previous_week_commencing_date.as_deref(), Some("2021-07-11"));
    assert_eq!(report.brand[2].growth.perc_unit_sales_growth, Some(-100.0));

    assert_eq!(report.product.len(), 4);
    assert_eq!(report.product[0].barcode_no, 5000001);
    assert_eq!(report.product[0].growth.perc_gross_sales_growth, Some(50.0));
    assert_eq!(report.product[2].product_name, "Product B");
    assert_eq!(report.product[2].growth.perc_gross_sales_growth, Some(-100.0));

    let written: Report = serde_json::from_str(&fs::read_to_string(&config.output.path).unwrap()).unwrap();
    assert_eq!(written, report);
}

#[test]
fn test_failed_source_writes_nothing() {
    use std::fs;

    let dir = tempfile::tempdir().unwrap();
    let brand_path = dir.path().join("sales_brand.csv");
    let product_path = dir.path().join("sales_product.csv");
    fs::write(&brand_path, TEST_SALES_BRAND).unwrap();
    fs::write(&product_path, TEST_SALES_PRODUCT.replace("95.00", "ninety-five")).unwrap();

    let mut config = Config::default();
    config.input.brand = brand_path;
    config.input.product = product_path;
    config.output.path = dir.path().join("results.json");

    match run_to_file(&config) {
        Err(error::SalesError::MalformedRow { line, field, .. }) => {
            assert_eq!(line, 6);
            assert_eq!(field, "gross_sales");
        },
        other => { panic!("expected MalformedRow, got {:?}", other) }
    }
    assert!(!config.output.path.exists());
}
