use std::fmt::Debug;

pub mod aggregate;
pub mod period;
pub mod report;

use serde::Serialize;
use serde::de::DeserializeOwned;

use report::{BrandGrowth, ProductGrowth, WeeklyGrowth};

/// The two entity kinds run through the same pipeline; a kind only decides
/// which columns it reads and how its report rows are named.
pub trait EntityKind {
    /// Used in log lines and error messages.
    const LABEL: &'static str;
    const ID_COLUMN: &'static str;
    const NAME_COLUMN: &'static str;

    type ReportRow: Serialize + DeserializeOwned + Debug + Clone + PartialEq;

    fn report_row(entity_id: i64, entity_name: &str, growth: WeeklyGrowth) -> Self::ReportRow;
}

#[derive(Debug, Clone, Copy)]
pub struct Brand;

impl EntityKind for Brand {
    const LABEL: &'static str = "brand";
    const ID_COLUMN: &'static str = "brand_id";
    const NAME_COLUMN: &'static str = "brand";

    type ReportRow = BrandGrowth;

    fn report_row(entity_id: i64, entity_name: &str, growth: WeeklyGrowth) -> BrandGrowth {
        BrandGrowth {
            brand_id: entity_id,
            brand_name: entity_name.to_owned(),
            growth,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Product;

impl EntityKind for Product {
    const LABEL: &'static str = "product";
    const ID_COLUMN: &'static str = "barcode_no";
    const NAME_COLUMN: &'static str = "product_name";

    type ReportRow = ProductGrowth;

    fn report_row(entity_id: i64, entity_name: &str, growth: WeeklyGrowth) -> ProductGrowth {
        ProductGrowth {
            barcode_no: entity_id,
            product_name: entity_name.to_owned(),
            growth,
        }
    }
}
