use std::io;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Error taxonomy of the `difmet` library.
///
/// Configuration and alignment problems are fatal and raised before any
/// computation. Degenerate per-cell conditions (zero variance, too few
/// usable sites in a window) are never errors — they surface as missing
/// values in the output tables.
#[derive(Error, Debug)]
pub enum DifmetError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("sample and population tables share no common sites")]
    EmptyAlignment,

    #[error("{table} table is missing required column `{column}`")]
    MissingColumn {
        table:  &'static str,
        column: &'static str,
    },

    #[error("column `{column}` of the {table} table: {reason}")]
    InvalidColumn {
        table:  &'static str,
        column: String,
        reason: String,
    },

    #[error("chromosome {chr} partition failed: {source}")]
    Partition {
        chr:    u32,
        #[source]
        source: Box<DifmetError>,
    },

    #[error("chromosome partition(s) {pending:?} did not finish within {secs} s")]
    PartitionTimeout { secs: u64, pending: Vec<u32> },

    #[error("chromosome partition(s) {pending:?} terminated without producing a result")]
    PartitionLost { pending: Vec<u32> },

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DifmetError>;
