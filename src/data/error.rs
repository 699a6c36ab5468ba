use std::path::PathBuf;

use thiserror::Error;

use super::model::ExperimentId;

/// Everything the data layer can report to its caller.
#[derive(Debug, Error)]
pub enum DataError {
    /// The source table for an experiment is missing, unreadable or malformed.
    /// Fatal to the whole load.
    #[error("{experiment}: data source {path} unavailable: {reason}")]
    DataSourceUnavailable {
        experiment: ExperimentId,
        path: PathBuf,
        reason: String,
    },

    /// A retained row carries a condition label outside the palette.
    #[error("{experiment}, line {line}: unknown condition '{label}'")]
    UnknownCondition {
        experiment: ExperimentId,
        line: u64,
        label: String,
    },

    /// Too few usable points to fit a line.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type DataResult<T> = Result<T, DataError>;
