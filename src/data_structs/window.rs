use itertools::Itertools;
use log::warn;
use polars::prelude::*;

use crate::error::{DifmetError, Result};

pub const WINDOW_ID_COL: &str = "window_id";
pub const CHR_COL: &str = "chr";
pub const START_COL: &str = "start";
pub const END_COL: &str = "end";
pub const CGS_COL: &str = "cgs";

/// A table of genomic windows, each owning an ordered list of member site
/// identifiers.
///
/// Loaded from a delimited table whose `cgs` column holds the persisted
/// list form `"['cg1', 'cg2']"`; the list is parsed back at construction.
#[derive(Debug, Clone)]
pub struct WindowTable {
    ids:    Vec<String>,
    chrs:   Vec<u32>,
    starts: Vec<u64>,
    ends:   Vec<u64>,
    cgs:    Vec<Vec<String>>,
}

/// One row of a [`WindowTable`].
#[derive(Debug, Clone, Copy)]
pub struct WindowRecord<'a> {
    pub id:    &'a str,
    pub chr:   u32,
    pub start: u64,
    pub end:   u64,
    pub cgs:   &'a [String],
}

impl WindowTable {
    const TABLE: &'static str = "window";

    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        for required in [WINDOW_ID_COL, CHR_COL, START_COL, END_COL, CGS_COL] {
            if df.column(required).is_err() {
                return Err(DifmetError::MissingColumn {
                    table:  Self::TABLE,
                    column: required,
                });
            }
        }

        let height = df.height();
        let id_col = df.column(WINDOW_ID_COL)?.cast(&DataType::String)?;
        let chr_col = df.column(CHR_COL)?.cast(&DataType::UInt32).map_err(|_| {
            DifmetError::InvalidColumn {
                table:  Self::TABLE,
                column: CHR_COL.to_string(),
                reason: "expected chromosome numbers".to_string(),
            }
        })?;
        let start_col = df.column(START_COL)?.cast(&DataType::UInt64)?;
        let end_col = df.column(END_COL)?.cast(&DataType::UInt64)?;
        let cgs_col = df.column(CGS_COL)?.cast(&DataType::String)?;

        let mut ids = Vec::with_capacity(height);
        let mut chrs = Vec::with_capacity(height);
        let mut starts = Vec::with_capacity(height);
        let mut ends = Vec::with_capacity(height);
        let mut cgs = Vec::with_capacity(height);

        for i in 0..height {
            let (id, chr) = match (
                id_col.str().unwrap().get(i),
                chr_col.u32().unwrap().get(i),
            ) {
                (Some(id), Some(chr)) => (id, chr),
                _ => {
                    return Err(DifmetError::InvalidColumn {
                        table:  Self::TABLE,
                        column: WINDOW_ID_COL.to_string(),
                        reason: format!("row {i} has a missing id or chromosome"),
                    })
                },
            };
            let raw_cgs = cgs_col.str().unwrap().get(i).unwrap_or("[]");
            ids.push(id.to_string());
            chrs.push(chr);
            starts.push(start_col.u64().unwrap().get(i).unwrap_or(0));
            ends.push(end_col.u64().unwrap().get(i).unwrap_or(0));
            cgs.push(parse_cg_list(raw_cgs)?);
        }

        let out_of_range = chrs.iter().filter(|chr| !(1..=22).contains(*chr)).count();
        if out_of_range > 0 {
            warn!(
                "{out_of_range} window(s) lie outside chromosomes 1-22 and \
                 will never be processed"
            );
        }

        Ok(Self {
            ids,
            chrs,
            starts,
            ends,
            cgs,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = WindowRecord<'_>> {
        (0..self.len()).map(move |i| WindowRecord {
            id:    &self.ids[i],
            chr:   self.chrs[i],
            start: self.starts[i],
            end:   self.ends[i],
            cgs:   &self.cgs[i],
        })
    }

    /// Distinct chromosomes present in the table, ascending.
    pub fn chromosomes(&self) -> Vec<u32> {
        self.chrs.iter().copied().unique().sorted().collect_vec()
    }
}

/// Parses the persisted list form of the `cgs` column: a bracketed,
/// comma-separated list of (optionally quoted) site identifiers.
pub(crate) fn parse_cg_list(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| DifmetError::InvalidColumn {
            table:  WindowTable::TABLE,
            column: CGS_COL.to_string(),
            reason: format!("malformed site list `{raw}`"),
        })?;

    Ok(inner
        .split(',')
        .map(|entry| entry.trim().trim_matches(['\'', '"']).to_string())
        .filter(|entry| !entry.is_empty())
        .collect_vec())
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    #[test]
    fn parses_quoted_lists() {
        assert_eq!(
            parse_cg_list("['cg1', 'cg2']").unwrap(),
            vec!["cg1".to_string(), "cg2".to_string()]
        );
        assert_eq!(
            parse_cg_list(r#"["cg1","cg2"]"#).unwrap(),
            vec!["cg1".to_string(), "cg2".to_string()]
        );
        assert!(parse_cg_list("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_unbracketed_lists() {
        assert!(matches!(
            parse_cg_list("cg1, cg2"),
            Err(DifmetError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn loads_from_dataframe() {
        let df = df!(
            WINDOW_ID_COL => ["W1", "W2"],
            CHR_COL => [1u32, 2u32],
            START_COL => [100u64, 5000u64],
            END_COL => [1100u64, 6000u64],
            CGS_COL => ["['cg1', 'cg2']", "[]"],
        )
        .unwrap();
        let table = WindowTable::from_dataframe(df).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.chromosomes(), vec![1, 2]);

        let first = table.iter().next().unwrap();
        assert_eq!(first.id, "W1");
        assert_eq!(first.cgs, ["cg1".to_string(), "cg2".to_string()]);
    }
}
