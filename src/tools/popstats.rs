//! Row-wise population summary statistics.
//!
//! Builds the `mean`/`std` (plus min/max and percentile) table consumed by
//! the per-site pipeline from one or more raw population value tables.

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::info;
use polars::prelude::*;
use statrs::statistics::Statistics;

use crate::data_structs::{PopStats, SiteMatrix, ID_COL, MEAN_COL, STD_COL};
use crate::error::{DifmetError, Result};

/// Default percentile columns, matching the reference population files.
pub const DEFAULT_PERCENTILES: [u8; 6] = [1, 5, 25, 75, 95, 99];

/// Computes per-site summary statistics over all sample columns of a merged
/// population matrix.
///
/// Missing and NaN entries are skipped per row; a site with no usable value
/// gets nulls across every statistic column. The standard deviation is the
/// population one (denominator n), matching the files the scoring stage was
/// calibrated against.
pub fn make_stats(matrix: &SiteMatrix, percentiles: &[u8]) -> Result<PopStats> {
    for p in percentiles {
        if *p > 100 {
            return Err(DifmetError::Config(format!(
                "percentile {p} is outside 0-100"
            )));
        }
    }

    let height = matrix.height();
    let cols = matrix
        .sample_names()
        .into_iter()
        .map(|name| matrix.sample(name))
        .collect::<Result<Vec<_>>>()?;

    let mut mean = Vec::with_capacity(height);
    let mut std = Vec::with_capacity(height);
    let mut max = Vec::with_capacity(height);
    let mut min = Vec::with_capacity(height);
    let mut pct: Vec<Vec<Option<f64>>> =
        vec![Vec::with_capacity(height); percentiles.len()];

    for row in 0..height {
        let mut values = cols
            .iter()
            .filter_map(|col| col.get(row))
            .filter(|v| !v.is_nan())
            .collect_vec();
        if values.is_empty() {
            mean.push(None);
            std.push(None);
            max.push(None);
            min.push(None);
            pct.iter_mut().for_each(|p| p.push(None));
            continue;
        }
        values.sort_by(f64::total_cmp);

        mean.push(Some(values.iter().mean()));
        std.push(Some(values.iter().population_std_dev()));
        min.push(Some(values[0]));
        max.push(Some(*values.last().unwrap()));
        for (k, &p) in percentiles.iter().enumerate() {
            pct[k].push(Some(percentile_sorted(&values, p as f64)));
        }
    }

    let mut columns = vec![matrix.data().column(ID_COL)?.clone()];
    let stat_cols = [
        (MEAN_COL.to_string(), mean),
        (STD_COL.to_string(), std),
        ("max".to_string(), max),
        ("min".to_string(), min),
    ];
    for (name, values) in stat_cols.into_iter().chain(
        percentiles
            .iter()
            .map(|p| p.to_string())
            .zip(pct),
    ) {
        let ca: Float64Chunked = values.into_iter().collect();
        columns.push(ca.with_name(name.as_str().into()).into_column());
    }

    info!(
        "computed population statistics for {} site(s) across {} column(s)",
        height,
        cols.len()
    );
    PopStats::try_new(DataFrame::new(columns)?)
}

/// Linear-interpolation percentile of an ascending-sorted, non-empty slice.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - lo as f64;
    if lo + 1 < sorted.len() {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    }
    else {
        sorted[lo]
    }
}

/// Merges several population tables onto a master site index.
///
/// Every table is reindexed to `index`: sites absent from a table
/// contribute nulls in that table's columns. Duplicate sample names across
/// tables are a configuration error.
pub fn combine_tables(
    index: &[String],
    tables: &[SiteMatrix],
) -> Result<SiteMatrix> {
    let mut seen = HashSet::new();
    for table in tables {
        for name in table.sample_names() {
            if !seen.insert(name.to_string()) {
                return Err(DifmetError::Config(format!(
                    "duplicate sample name `{name}` across population tables"
                )));
            }
        }
    }

    let mut columns =
        vec![Column::new(ID_COL.into(), index.to_vec())];
    for table in tables {
        let rows: HashMap<&str, usize> = table
            .ids()
            .into_iter()
            .enumerate()
            .filter_map(|(i, id)| id.map(|id| (id, i)))
            .collect();
        for name in table.sample_names() {
            let col = table.sample(name)?;
            let reindexed: Float64Chunked = index
                .iter()
                .map(|id| rows.get(id.as_str()).and_then(|&row| col.get(row)))
                .collect();
            columns.push(reindexed.with_name(name.into()).into_column());
        }
    }
    SiteMatrix::try_new(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use polars::df;

    use super::*;

    fn population() -> SiteMatrix {
        SiteMatrix::try_new(
            df!(
                ID_COL => ["cgA", "cgB"],
                "i1" => [Some(0.2), Some(0.5)],
                "i2" => [Some(0.4), None],
                "i3" => [Some(0.6), Some(0.7)],
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn stats_match_hand_computed_values() {
        let stats = make_stats(&population(), &[25]).unwrap();

        assert_approx_eq!(stats.mean().get(0).unwrap(), 0.4, 1e-12);
        // Population std of [0.2, 0.4, 0.6].
        assert_approx_eq!(
            stats.std().get(0).unwrap(),
            (2.0f64 / 75.0).sqrt(),
            1e-12
        );
        // Second row skips the missing entry: mean of [0.5, 0.7].
        assert_approx_eq!(stats.mean().get(1).unwrap(), 0.6, 1e-12);

        let p25 = stats.data().column("25").unwrap().f64().unwrap();
        // Linear interpolation over [0.2, 0.4, 0.6] at rank 0.5.
        assert_approx_eq!(p25.get(0).unwrap(), 0.3, 1e-12);
    }

    #[test]
    fn empty_rows_give_missing_stats() {
        let matrix = SiteMatrix::try_new(
            df!(
                ID_COL => ["cgA"],
                "i1" => [None::<f64>],
            )
            .unwrap(),
        )
        .unwrap();
        let stats = make_stats(&matrix, &DEFAULT_PERCENTILES).unwrap();
        assert_eq!(stats.mean().get(0), None);
        assert_eq!(stats.std().get(0), None);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_approx_eq!(percentile_sorted(&sorted, 0.0), 1.0, 1e-12);
        assert_approx_eq!(percentile_sorted(&sorted, 100.0), 4.0, 1e-12);
        assert_approx_eq!(percentile_sorted(&sorted, 50.0), 2.5, 1e-12);
    }

    #[test]
    fn combine_reindexes_to_the_master_index() {
        let extra = SiteMatrix::try_new(
            df!(
                ID_COL => ["cgB", "cgZ"],
                "j1" => [0.9, 0.1],
            )
            .unwrap(),
        )
        .unwrap();
        let index =
            vec!["cgA".to_string(), "cgB".to_string(), "cgC".to_string()];
        let merged = combine_tables(&index, &[population(), extra]).unwrap();

        assert_eq!(merged.height(), 3);
        assert_eq!(merged.sample_names().len(), 4);
        let j1 = merged.sample("j1").unwrap();
        assert_eq!(j1.get(0), None);
        assert_eq!(j1.get(1), Some(0.9));
        // cgC is on the index but in no table.
        assert_eq!(merged.sample("i1").unwrap().get(2), None);
    }

    #[test]
    fn duplicate_sample_names_are_rejected() {
        let dup = SiteMatrix::try_new(
            df!(
                ID_COL => ["cgA"],
                "i1" => [0.5],
            )
            .unwrap(),
        )
        .unwrap();
        let index = vec!["cgA".to_string()];
        assert!(matches!(
            combine_tables(&index, &[population(), dup]),
            Err(DifmetError::Config(_))
        ));
    }
}
