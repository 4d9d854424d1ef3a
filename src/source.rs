use std::fs::File;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};

use crate::common::RawRow;
use crate::error::{Result, SalesError};
use crate::sales::EntityKind;

/// Column positions of the fields a `RawRow` is built from.
#[derive(Debug, Clone, Copy)]
struct Columns {
    entity_id: usize,
    entity_name: usize,
    period_id: usize,
    period_name: usize,
    week_commencing_date: usize,
    gross_sales: usize,
    units_sold: usize,
}

impl Columns {
    fn locate<K: EntityKind>(headers: &StringRecord) -> Result<Columns> {
        let find = |name: &'static str| -> Result<usize> {
            match headers.iter().position(|h| h == name) {
                Some(index) => { Ok(index) },
                None => { Err(SalesError::MissingColumn(name)) }
            }
        };

        Ok(Columns {
            entity_id: find(K::ID_COLUMN)?,
            entity_name: find(K::NAME_COLUMN)?,
            period_id: find("period_id")?,
            period_name: find("period_name")?,
            week_commencing_date: find("week_commencing_date")?,
            gross_sales: find("gross_sales")?,
            units_sold: find("units_sold")?,
        })
    }

    fn row(&self, record: &StringRecord) -> RawRow {
        let field = |index: usize| record.get(index).unwrap_or("").to_owned();

        RawRow {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            entity_id: field(self.entity_id),
            entity_name: field(self.entity_name),
            period_id: field(self.period_id),
            period_name: field(self.period_name),
            week_commencing_date: field(self.week_commencing_date),
            gross_sales: field(self.gross_sales),
            units_sold: field(self.units_sold),
        }
    }
}

/// Reads raw sales rows for one entity kind from CSV with a header line.
/// Columns are matched by header name, so their order does not matter.
pub struct CsvSource<K: EntityKind, R: Read> {
    records: StringRecordsIntoIter<R>,
    columns: Columns,
    kind: PhantomData<K>,
}

impl<K: EntityKind> CsvSource<K, File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<CsvSource<K, File>> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(path)?;
        CsvSource::from_csv(reader)
    }
}

impl<K: EntityKind, R: Read> CsvSource<K, R> {
    pub fn from_reader(reader: R) -> Result<CsvSource<K, R>> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        CsvSource::from_csv(reader)
    }

    fn from_csv(mut reader: csv::Reader<R>) -> Result<CsvSource<K, R>> {
        let columns = Columns::locate::<K>(reader.headers()?)?;

        Ok(CsvSource {
            records: reader.into_records(),
            columns,
            kind: PhantomData,
        })
    }
}

impl<K: EntityKind, R: Read> Iterator for CsvSource<K, R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let columns = self.columns;
        self.records.next().map(|record| -> Result<RawRow> {
            let record = record?;
            Ok(columns.row(&record))
        })
    }
}

#[test]
fn test_read_product_csv() {
    use crate::sales::Product;

    let text = "\
barcode_no,product_name,period_id,period_name,week_commencing_date,gross_sales,units_sold
5012345678900,Product A,1,previous,04/07/2021,100.0,20
5012345678900, Product A ,2,current,04/07/2022,200.0,30
";

    let rows: Vec<RawRow> = CsvSource::<Product, _>::from_reader(text.as_bytes())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].line, 2);
    assert_eq!(rows[0].entity_id, "5012345678900");
    assert_eq!(rows[1].line, 3);
    assert_eq!(rows[1].entity_name, "Product A");
    assert_eq!(rows[1].period_name, "current");
    assert_eq!(rows[1].week_commencing_date, "04/07/2022");
}

#[test]
fn test_columns_matched_by_name() {
    use crate::sales::Brand;

    let text = "\
units_sold,gross_sales,week_commencing_date,period_name,period_id,brand,brand_id
38,120.5,25/07/2022,current,2,Brand C,3
";

    let rows: Vec<RawRow> = CsvSource::<Brand, _>::from_reader(text.as_bytes())
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();

    assert_eq!(rows[0].entity_id, "3");
    assert_eq!(rows[0].entity_name, "Brand C");
    assert_eq!(rows[0].units_sold, "38");
    assert_eq!(rows[0].gross_sales, "120.5");
}

#[test]
fn test_missing_column() {
    use crate::sales::Brand;

    // a product export handed to the brand pipeline
    let text = "barcode_no,product_name,period_id,period_name,week_commencing_date,gross_sales,units_sold\n";

    match CsvSource::<Brand, _>::from_reader(text.as_bytes()) {
        Err(SalesError::MissingColumn(column)) => { assert_eq!(column, "brand_id") },
        Err(e) => { panic!("expected MissingColumn, got {:?}", e) },
        Ok(_) => { panic!("expected MissingColumn") }
    }
}
