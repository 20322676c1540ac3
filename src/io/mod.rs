//! Delimited-table readers and writers.
//!
//! All tables are plain CSV/TSV with a header row; gzip-compressed input is
//! decompressed transparently. Schema validation happens in the table
//! constructors, so a malformed file fails at load time, not mid-pipeline.

use std::fs::File;
use std::path::Path;

use log::info;
use polars::prelude::*;

use crate::data_structs::{AnnotationTable, PopStats, SiteMatrix, WindowTable};
use crate::error::{DifmetError, Result};

fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1024))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_try_parse_dates(false),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    info!(
        "read {} row(s) x {} column(s) from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Reads a sites × samples value matrix (measurements or p-values).
pub fn read_value_matrix(path: &Path, separator: u8) -> Result<SiteMatrix> {
    SiteMatrix::try_new(read_delimited(path, separator)?)
}

/// Reads a population statistics table (`cg_id`, `mean`, `std`, extras).
pub fn read_pop_stats(path: &Path, separator: u8) -> Result<PopStats> {
    PopStats::try_new(read_delimited(path, separator)?)
}

/// Reads a window table, parsing the persisted `cgs` site lists.
pub fn read_window_table(path: &Path, separator: u8) -> Result<WindowTable> {
    WindowTable::from_dataframe(read_delimited(path, separator)?)
}

/// Reads a site → chromosome annotation table.
pub fn read_annotation(path: &Path, separator: u8) -> Result<AnnotationTable> {
    AnnotationTable::from_dataframe(read_delimited(path, separator)?)
}

/// Reads a master site index: the `cg_id` column of a table, or its first
/// column when no `cg_id` column exists.
pub fn read_site_index(path: &Path, separator: u8) -> Result<Vec<String>> {
    let df = read_delimited(path, separator)?;
    let column = match df.column(crate::data_structs::ID_COL) {
        Ok(column) => column.clone(),
        Err(_) => {
            df.get_columns()
                .first()
                .ok_or_else(|| {
                    DifmetError::MissingColumn {
                        table:  "site index",
                        column: crate::data_structs::ID_COL,
                    }
                })?
                .clone()
        },
    };
    Ok(column
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .flatten()
        .map(|id| id.to_string())
        .collect())
}

/// Writes a table as a delimited file with a header row.
pub fn write_table(df: &mut DataFrame, path: &Path, separator: u8) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .with_separator(separator)
        .include_header(true)
        .finish(df)?;
    info!("wrote {} row(s) to {}", df.height(), path.display());
    Ok(())
}
