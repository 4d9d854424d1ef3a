use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::info;

use crate::error::Result;
use crate::sales::report::Report;

/// Destination for a finished report. Taking `self` means a sink can only
/// be written once.
pub trait ReportSink {
    fn write_report(self, report: &Report) -> Result<()>;
}

/// Writes the report as a JSON document, creating parent directories.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    pretty: bool,
}

impl JsonFileSink {
    pub fn new<P: Into<PathBuf>>(path: P, pretty: bool) -> JsonFileSink {
        JsonFileSink {
            path: path.into(),
            pretty,
        }
    }
}

impl ReportSink for JsonFileSink {
    fn write_report(self, report: &Report) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, report)?;
        } else {
            serde_json::to_writer(&mut writer, report)?;
        }
        writer.flush()?;

        info!("Wrote report to {}", self.path.display());
        Ok(())
    }
}

/// Writes the report as JSON to any writer, e.g. standard output.
#[derive(Debug)]
pub struct JsonWriterSink<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonWriterSink<W> {
    pub fn new(writer: W, pretty: bool) -> JsonWriterSink<W> {
        JsonWriterSink {
            writer,
            pretty,
        }
    }
}

impl<W: Write> ReportSink for JsonWriterSink<W> {
    fn write_report(mut self, report: &Report) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, report)?;
        } else {
            serde_json::to_writer(&mut self.writer, report)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[test]
fn test_json_file_sink_creates_directories() {
    use crate::sales::report::{BrandGrowth, WeeklyGrowth};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output").join("results.json");

    let report = Report {
        product: Vec::new(),
        brand: vec![BrandGrowth {
            brand_id: 7,
            brand_name: "Brand A".to_owned(),
            growth: WeeklyGrowth {
                current_week_commencing_date: Some("2022-07-04".to_owned()),
                previous_week_commencing_date: None,
                perc_gross_sales_growth: None,
                perc_unit_sales_growth: None,
            },
        }],
    };

    JsonFileSink::new(&path, true).write_report(&report).unwrap();

    let parsed: Report = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn test_writer_sink() {
    let mut buffer: Vec<u8> = Vec::new();
    JsonWriterSink::new(&mut buffer, false).write_report(&Report::default()).unwrap();

    assert_eq!(String::from_utf8(buffer).unwrap(), r#"{"PRODUCT":[],"BRAND":[]}"#);
}

#[test]
fn test_writer_sink_pretty() {
    let mut buffer: Vec<u8> = Vec::new();
    JsonWriterSink::new(&mut buffer, true).write_report(&Report::default()).unwrap();

    assert_eq!(String::from_utf8(buffer).unwrap(), "{\n  \"PRODUCT\": [],\n  \"BRAND\": []\n}");
}
