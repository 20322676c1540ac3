//! Windowed aggregation of per-site p-values (stage B).
//!
//! Splits the work by chromosome (1-22): every partition reads its own
//! slice of the window, p-value and raw-value tables, estimates the
//! covariance among each window's sites and combines each sample's
//! p-values into one value per (window, sample) cell. Partitions share no
//! mutable state; their result tables are concatenated once all of them
//! have reported back.

mod combine;
mod covariance;

pub use combine::combine_pvalues;
pub use covariance::{estimate, WindowCovariance};

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use log::{debug, error, info};
use ndarray::Array2;
use polars::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::data_structs::{
    AnnotationTable,
    SiteMatrix,
    WindowTable,
    CHR_COL,
    END_COL,
    START_COL,
    WINDOW_ID_COL,
};
use crate::error::{DifmetError, Result};

/// Chromosomes the driver partitions by.
pub const CHROMOSOMES: std::ops::RangeInclusive<u32> = 1..=22;

/// Options of the windowed aggregation driver.
#[derive(Debug, Clone)]
pub struct WindowOpts {
    /// Worker threads; 0 uses all available cores.
    pub threads: usize,
    /// Per-partition collection timeout. A partition that neither finishes
    /// nor fails within this window aborts the run instead of hanging it.
    pub timeout: Duration,
}

impl Default for WindowOpts {
    fn default() -> Self {
        Self {
            threads: 0,
            timeout: Duration::from_secs(1800),
        }
    }
}

/// Runs the per-window combination for every chromosome partition and
/// concatenates the partial results.
///
/// The output has one row per processed window (`window_id`, `chr`,
/// `start`, `end`) and one Float64 column per sample of `pvals`; cells
/// without any usable site are missing. Row order follows partition
/// completion and carries no guarantee.
///
/// A failing partition aborts the whole run with the chromosome named in
/// the error; no partial output is produced.
pub fn combine_windows(
    windows: &WindowTable,
    pvals: &SiteMatrix,
    betas: &SiteMatrix,
    annot: &AnnotationTable,
    opts: &WindowOpts,
) -> Result<DataFrame> {
    let chroms = windows
        .chromosomes()
        .into_iter()
        .filter(|chr| CHROMOSOMES.contains(chr))
        .collect_vec();
    if chroms.is_empty() {
        info!("no windows on chromosomes 1-22, returning an empty table");
        return empty_result(pvals);
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(opts.threads)
        .thread_name(|i| format!("difmet-window-{i}"))
        // A panicking worker drops its channel sender; the collector then
        // reports the lost partitions instead of the process aborting.
        .panic_handler(|_| error!("window partition worker panicked"))
        .build()
        .map_err(|e| {
            DifmetError::Config(format!("failed to build worker pool: {e}"))
        })?;

    info!(
        "combining {} window(s) over {} chromosome partition(s) on {} \
         thread(s)",
        windows.len(),
        chroms.len(),
        pool.current_num_threads()
    );

    let chr_sites = Arc::new(annot.partition());
    let windows = Arc::new(windows.clone());
    let pvals = Arc::new(pvals.clone());
    let betas = Arc::new(betas.clone());

    let (tx, rx) = channel::unbounded();
    for &chr in &chroms {
        let tx = tx.clone();
        let windows = Arc::clone(&windows);
        let pvals = Arc::clone(&pvals);
        let betas = Arc::clone(&betas);
        let chr_sites = Arc::clone(&chr_sites);
        pool.spawn(move || {
            let result =
                process_partition(chr, &windows, &pvals, &betas, &chr_sites);
            let _ = tx.send((chr, result));
        });
    }
    drop(tx);

    let mut pending: HashSet<u32> = chroms.iter().copied().collect();
    let mut parts = Vec::with_capacity(chroms.len());
    while !pending.is_empty() {
        match rx.recv_timeout(opts.timeout) {
            Ok((chr, Ok(df))) => {
                debug!(
                    "chromosome {chr} partition finished ({} window(s))",
                    df.height()
                );
                pending.remove(&chr);
                parts.push(df);
            },
            Ok((chr, Err(source))) => {
                return Err(DifmetError::Partition {
                    chr,
                    source: Box::new(source),
                })
            },
            Err(RecvTimeoutError::Timeout) => {
                return Err(DifmetError::PartitionTimeout {
                    secs:    opts.timeout.as_secs(),
                    pending: pending.iter().copied().sorted().collect_vec(),
                })
            },
            Err(RecvTimeoutError::Disconnected) => {
                return Err(DifmetError::PartitionLost {
                    pending: pending.iter().copied().sorted().collect_vec(),
                })
            },
        }
    }

    let mut parts = parts.into_iter();
    let mut merged = parts.next().expect("at least one partition");
    for part in parts {
        merged.vstack_mut(&part)?;
    }
    Ok(merged)
}

/// Processes one chromosome: every window on it, every sample column.
fn process_partition(
    chr: u32,
    windows: &WindowTable,
    pvals: &SiteMatrix,
    betas: &SiteMatrix,
    chr_sites: &HashMap<u32, HashSet<String>>,
) -> Result<DataFrame> {
    let sites = chr_sites.get(&chr);
    let on_chromosome = |id: &str| sites.map_or(false, |s| s.contains(id));

    // Row lookups restricted to this chromosome's sites.
    let beta_rows: HashMap<&str, usize> = betas
        .ids()
        .into_iter()
        .enumerate()
        .filter_map(|(i, id)| id.filter(|id| on_chromosome(id)).map(|id| (id, i)))
        .collect();
    let pval_rows: HashMap<&str, usize> = pvals
        .ids()
        .into_iter()
        .enumerate()
        .filter_map(|(i, id)| id.filter(|id| on_chromosome(id)).map(|id| (id, i)))
        .collect();

    let beta_cols = betas
        .sample_names()
        .into_iter()
        .map(|name| betas.sample(name))
        .collect::<Result<Vec<_>>>()?;
    let sample_names = pvals.sample_names();
    let pval_cols = sample_names
        .iter()
        .map(|name| pvals.sample(name))
        .collect::<Result<Vec<_>>>()?;
    let n_obs = beta_cols.len();

    let mut out_ids = Vec::new();
    let mut out_chrs = Vec::new();
    let mut out_starts = Vec::new();
    let mut out_ends = Vec::new();
    let mut out_pvals: Vec<Vec<Option<f64>>> =
        vec![Vec::new(); sample_names.len()];

    for window in windows.iter().filter(|w| w.chr == chr) {
        // Raw-value rows for the member sites annotated on this chromosome.
        let mut row_ids = Vec::new();
        let mut flat = Vec::new();
        for cg in window.cgs {
            if let Some(&row) = beta_rows.get(cg.as_str()) {
                row_ids.push(cg.as_str());
                for col in &beta_cols {
                    flat.push(col.get(row).unwrap_or(f64::NAN));
                }
            }
        }
        let values = Array2::from_shape_vec((row_ids.len(), n_obs), flat)
            .unwrap();
        let cov = covariance::estimate(&values);
        let kept_ids = cov
            .kept
            .iter()
            .map(|&i| row_ids[i])
            .collect_vec();

        out_ids.push(window.id.to_string());
        out_chrs.push(window.chr);
        out_starts.push(window.start);
        out_ends.push(window.end);

        for (column, out) in pval_cols.iter().zip(out_pvals.iter_mut()) {
            // Sites that survived complete-case filtering *and* carry a
            // p-value for this sample; the covariance is restricted to the
            // same subset.
            let mut sub_idx = Vec::new();
            let mut ps = Vec::new();
            for (k, cg) in kept_ids.iter().enumerate() {
                if let Some(&row) = pval_rows.get(cg) {
                    if let Some(p) = column.get(row) {
                        if !p.is_nan() {
                            sub_idx.push(k);
                            ps.push(p);
                        }
                    }
                }
            }
            let combined = if ps.len() == kept_ids.len() {
                combine::combine_pvalues(&cov.matrix, &ps)
            }
            else {
                let sub = submatrix(&cov.matrix, &sub_idx);
                combine::combine_pvalues(&sub, &ps)
            };
            out.push(combined);
        }
    }

    let mut columns = vec![
        Column::new(WINDOW_ID_COL.into(), out_ids),
        Column::new(CHR_COL.into(), out_chrs),
        Column::new(START_COL.into(), out_starts),
        Column::new(END_COL.into(), out_ends),
    ];
    for (name, combined) in sample_names.iter().zip(out_pvals) {
        let ca: Float64Chunked = combined.into_iter().collect();
        columns.push(ca.with_name((*name).into()).into_column());
    }
    Ok(DataFrame::new(columns)?)
}

fn submatrix(matrix: &Array2<f64>, idx: &[usize]) -> Array2<f64> {
    let mut out = Array2::zeros((idx.len(), idx.len()));
    for (a, &i) in idx.iter().enumerate() {
        for (b, &j) in idx.iter().enumerate() {
            out[[a, b]] = matrix[[i, j]];
        }
    }
    out
}

/// Empty result table with the full output schema.
fn empty_result(pvals: &SiteMatrix) -> Result<DataFrame> {
    let mut columns = vec![
        Series::new_empty(WINDOW_ID_COL.into(), &DataType::String).into_column(),
        Series::new_empty(CHR_COL.into(), &DataType::UInt32).into_column(),
        Series::new_empty(START_COL.into(), &DataType::UInt64).into_column(),
        Series::new_empty(END_COL.into(), &DataType::UInt64).into_column(),
    ];
    for name in pvals.sample_names() {
        columns.push(
            Series::new_empty(name.into(), &DataType::Float64).into_column(),
        );
    }
    Ok(DataFrame::new(columns)?)
}
