use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;
use polars::prelude::*;

use crate::data_structs::PopStats;
use crate::error::{DifmetError, Result};

/// Name of the site identifier column shared by all per-site tables.
pub const ID_COL: &str = "cg_id";

/// A sites × samples matrix of floating point values backed by a
/// [`DataFrame`].
///
/// The `cg_id` column holds unique, non-null site identifiers; every other
/// column is a Float64 sample column. Missing measurements are nulls and
/// propagate through all downstream stages.
#[derive(Debug, Clone)]
pub struct SiteMatrix {
    data: DataFrame,
}

impl SiteMatrix {
    const TABLE: &'static str = "value matrix";

    /// Validates a raw DataFrame into a site matrix.
    ///
    /// The `cg_id` column must be present, non-null and unique; all
    /// remaining columns must be numeric and are cast to Float64.
    pub fn try_new(df: DataFrame) -> Result<Self> {
        if df.column(ID_COL).is_err() {
            return Err(DifmetError::MissingColumn {
                table:  Self::TABLE,
                column: ID_COL,
            });
        }

        let ids = df.column(ID_COL)?.cast(&DataType::String)?;
        if ids.null_count() > 0 {
            return Err(DifmetError::InvalidColumn {
                table:  Self::TABLE,
                column: ID_COL.to_string(),
                reason: "contains missing identifiers".to_string(),
            });
        }
        if ids.n_unique()? != ids.len() {
            return Err(DifmetError::InvalidColumn {
                table:  Self::TABLE,
                column: ID_COL.to_string(),
                reason: "identifiers are not unique".to_string(),
            });
        }

        let mut columns = Vec::with_capacity(df.width());
        columns.push(ids);
        for col in df.get_columns() {
            if col.name().as_str() == ID_COL {
                continue;
            }
            if !col.dtype().is_numeric() {
                return Err(DifmetError::InvalidColumn {
                    table:  Self::TABLE,
                    column: col.name().to_string(),
                    reason: format!("expected a numeric column, found {}", col.dtype()),
                });
            }
            columns.push(col.cast(&DataType::Float64)?);
        }

        Ok(Self {
            data: DataFrame::new(columns)?,
        })
    }

    /// Builds a matrix from pre-validated columns (`cg_id` first, Float64
    /// sample columns after). Used internally by transformations that
    /// preserve the constructor invariants.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Result<Self> {
        Ok(Self {
            data: DataFrame::new(columns)?,
        })
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn into_data(self) -> DataFrame {
        self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Site identifiers, in row order.
    pub fn ids(&self) -> &StringChunked {
        self.data.column(ID_COL).unwrap().str().unwrap()
    }

    /// Sample column names, in column order.
    pub fn sample_names(&self) -> Vec<&str> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .filter(|name| *name != ID_COL)
            .collect_vec()
    }

    /// One sample column.
    pub fn sample(&self, name: &str) -> Result<&Float64Chunked> {
        Ok(self.data.column(name)?.f64()?)
    }

    /// Row subset by positional indices.
    pub fn take(&self, indices: &IdxCa) -> Result<Self> {
        Ok(Self {
            data: self.data.take(indices)?,
        })
    }

    /// Applies a function to every non-missing value of every sample
    /// column; nulls are preserved.
    pub fn map_values<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(f64) -> f64, {
        let mut columns = vec![self.data.column(ID_COL)?.clone()];
        for name in self.sample_names() {
            let mapped = self
                .data
                .column(name)?
                .f64()?
                .apply_values(|v| f(v))
                .with_name(name.into());
            columns.push(mapped.into_column());
        }
        Self::from_columns(columns)
    }
}

/// Result of aligning a sample matrix against population statistics.
///
/// `sample` and `stats` are row-identical in site order (population order);
/// the `dropped_*` lists name the sites discarded from either side, so
/// callers can detect data loss instead of it happening silently.
#[derive(Debug)]
pub struct Aligned {
    pub sample:         SiteMatrix,
    pub stats:          PopStats,
    pub dropped_sample: Vec<String>,
    pub dropped_stats:  Vec<String>,
}

/// Aligns a sample matrix and a population statistics table to their common
/// sites, keeping the population's row order.
///
/// Sites present in only one table are dropped and reported. An empty
/// intersection is an [`DifmetError::EmptyAlignment`] error.
pub fn align(sample: &SiteMatrix, stats: &PopStats) -> Result<Aligned> {
    let mut sample_pos: HashMap<&str, IdxSize> =
        HashMap::with_capacity(sample.height());
    for (i, id) in sample.ids().into_iter().enumerate() {
        if let Some(id) = id {
            sample_pos.insert(id, i as IdxSize);
        }
    }

    let mut take_sample = Vec::new();
    let mut take_stats = Vec::new();
    let mut dropped_stats = Vec::new();
    for (j, id) in stats.ids().into_iter().enumerate() {
        let Some(id) = id else { continue };
        match sample_pos.remove(id) {
            Some(i) => {
                take_sample.push(i);
                take_stats.push(j as IdxSize);
            },
            None => dropped_stats.push(id.to_string()),
        }
    }

    if take_sample.is_empty() {
        return Err(DifmetError::EmptyAlignment);
    }

    let dropped_sample = sample_pos
        .keys()
        .map(|id| id.to_string())
        .sorted()
        .collect_vec();
    debug!(
        "alignment kept {} site(s), dropped {} from the sample and {} from \
         the population stats",
        take_sample.len(),
        dropped_sample.len(),
        dropped_stats.len()
    );

    Ok(Aligned {
        sample: sample.take(&IdxCa::from_vec(PlSmallStr::EMPTY, take_sample))?,
        stats: stats.take(&IdxCa::from_vec(PlSmallStr::EMPTY, take_stats))?,
        dropped_sample,
        dropped_stats,
    })
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    fn sample() -> SiteMatrix {
        SiteMatrix::try_new(
            df!(
                ID_COL => ["cgA", "cgB", "cgC"],
                "patient1" => [0.7, 0.5, 0.2],
                "patient2" => [Some(0.1), None, Some(0.9)],
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn missing_id_column_is_rejected() {
        let df = df!("patient1" => [0.1, 0.2]).unwrap();
        assert!(matches!(
            SiteMatrix::try_new(df),
            Err(DifmetError::MissingColumn { column: ID_COL, .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let df = df!(
            ID_COL => ["cgA", "cgA"],
            "patient1" => [0.1, 0.2],
        )
        .unwrap();
        assert!(matches!(
            SiteMatrix::try_new(df),
            Err(DifmetError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn non_numeric_sample_column_is_rejected() {
        let df = df!(
            ID_COL => ["cgA", "cgB"],
            "patient1" => ["high", "low"],
        )
        .unwrap();
        assert!(matches!(
            SiteMatrix::try_new(df),
            Err(DifmetError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn integer_columns_are_cast_to_float() {
        let df = df!(
            ID_COL => ["cgA", "cgB"],
            "patient1" => [1i64, 0i64],
        )
        .unwrap();
        let matrix = SiteMatrix::try_new(df).unwrap();
        assert_eq!(
            matrix.data().column("patient1").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn alignment_reports_dropped_sites() {
        let stats = PopStats::try_new(
            df!(
                ID_COL => ["cgB", "cgA", "cgZ"],
                "mean" => [0.4, 0.5, 0.6],
                "std" => [0.1, 0.1, 0.1],
            )
            .unwrap(),
        )
        .unwrap();

        let aligned = align(&sample(), &stats).unwrap();
        // Population order is kept.
        assert_eq!(
            aligned
                .sample
                .ids()
                .into_iter()
                .flatten()
                .collect::<Vec<_>>(),
            vec!["cgB", "cgA"]
        );
        assert_eq!(aligned.dropped_sample, vec!["cgC"]);
        assert_eq!(aligned.dropped_stats, vec!["cgZ"]);
        assert_eq!(aligned.sample.height(), aligned.stats.height());
    }

    #[test]
    fn disjoint_tables_fail_alignment() {
        let stats = PopStats::try_new(
            df!(
                ID_COL => ["cgX"],
                "mean" => [0.5],
                "std" => [0.1],
            )
            .unwrap(),
        )
        .unwrap();
        assert!(matches!(
            align(&sample(), &stats),
            Err(DifmetError::EmptyAlignment)
        ));
    }

    #[test]
    fn map_values_preserves_nulls() {
        let doubled = sample().map_values(|v| v * 2.0).unwrap();
        let col = doubled.sample("patient2").unwrap();
        assert_eq!(col.get(0), Some(0.2));
        assert_eq!(col.get(1), None);
    }
}
