use std::io;

use thiserror::Error;

use crate::common::{Metric, Role};

pub type Result<T> = std::result::Result<T, SalesError>;

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("invalid period role '{0}', expected 'current' or 'previous'")]
    InvalidRole(String),

    #[error("invalid period role '{role}' at line {line} for '{entity}': field 'period_name' must be 'current' or 'previous'")]
    InvalidRowRole {
        line: u64,
        entity: String,
        role: String,
    },

    #[error("malformed row at line {line}: field '{field}' has value '{value}' ({reason})")]
    MalformedRow {
        line: u64,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("input is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("{metric} growth is undefined: previous period value is zero")]
    UndefinedGrowth { metric: Metric },

    #[error("duplicate '{role}' observation for {kind} '{entity}' in week {week}")]
    DuplicateRole {
        kind: &'static str,
        entity: String,
        week: String,
        role: Role,
    },

    #[error("{kind} '{entity}', week {week}")]
    Entity {
        kind: &'static str,
        entity: String,
        week: String,
        #[source]
        source: Box<SalesError>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
