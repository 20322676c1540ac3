use itertools::Itertools;
use polars::prelude::*;

use crate::data_structs::ID_COL;
use crate::error::{DifmetError, Result};

pub const MEAN_COL: &str = "mean";
pub const STD_COL: &str = "std";

/// Per-site summary statistics of the reference control population.
///
/// Requires `cg_id`, `mean` and `std` columns; any further columns
/// (percentiles, min/max) are carried along untouched and ignored by the
/// scoring pipeline. A site with `std == 0` never produces a finite score —
/// downstream stages turn it into a missing value.
#[derive(Debug, Clone)]
pub struct PopStats {
    data: DataFrame,
}

impl PopStats {
    const TABLE: &'static str = "population statistics";

    pub fn try_new(df: DataFrame) -> Result<Self> {
        for required in [ID_COL, MEAN_COL, STD_COL] {
            if df.column(required).is_err() {
                return Err(DifmetError::MissingColumn {
                    table:  Self::TABLE,
                    column: required,
                });
            }
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

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn into_data(self) -> DataFrame {
        self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn ids(&self) -> &StringChunked {
        self.data.column(ID_COL).unwrap().str().unwrap()
    }

    pub fn mean(&self) -> &Float64Chunked {
        self.data.column(MEAN_COL).unwrap().f64().unwrap()
    }

    pub fn std(&self) -> &Float64Chunked {
        self.data.column(STD_COL).unwrap().f64().unwrap()
    }

    /// Names of the extra (non-required) statistic columns, if any.
    pub fn extra_columns(&self) -> Vec<&str> {
        self.data
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .filter(|name| ![ID_COL, MEAN_COL, STD_COL].contains(name))
            .collect_vec()
    }

    /// Row subset by positional indices.
    pub fn take(&self, indices: &IdxCa) -> Result<Self> {
        Ok(Self {
            data: self.data.take(indices)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    #[test]
    fn missing_std_column_is_rejected() {
        let df = df!(
            ID_COL => ["cgA"],
            MEAN_COL => [0.5],
        )
        .unwrap();
        assert!(matches!(
            PopStats::try_new(df),
            Err(DifmetError::MissingColumn {
                column: STD_COL,
                ..
            })
        ));
    }

    #[test]
    fn extra_columns_are_kept() {
        let df = df!(
            ID_COL => ["cgA"],
            MEAN_COL => [0.5],
            STD_COL => [0.1],
            "99" => [0.9],
        )
        .unwrap();
        let stats = PopStats::try_new(df).unwrap();
        assert_eq!(stats.extra_columns(), vec!["99"]);
    }
}
