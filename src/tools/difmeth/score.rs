use std::num::NonZeroU32;

use itertools::izip;
use once_cell::sync::Lazy;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::data_structs::{PopStats, SiteMatrix, ID_COL};
use crate::error::Result;

static STD_NORMAL: Lazy<Normal> =
    Lazy::new(|| Normal::new(0.0, 1.0).unwrap());

/// Per-site deviation scoring method.
///
/// Crawford-Howell carries its degrees of freedom (control population size
/// minus one) in the variant itself, so a CH run without `df` cannot be
/// expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreMethod {
    /// Absolute z-score `|x - mean| / std`.
    ZScore,
    /// Crawford-Howell case-control t statistic
    /// `(x - mean) / (std * sqrt((df + 1) / df))`, sign preserved.
    CrawfordHowell { df: NonZeroU32 },
}

impl ScoreMethod {
    fn score_one(&self, x: f64, mean: f64, std: f64) -> f64 {
        match self {
            ScoreMethod::ZScore => ((x - mean) / std).abs(),
            ScoreMethod::CrawfordHowell { df } => {
                let df = df.get() as f64;
                (x - mean) / (std * ((df + 1.0) / df).sqrt())
            },
        }
    }
}

/// Scores every (site, sample) cell of an aligned sample/population pair.
///
/// The inputs must be row-aligned (see [`crate::data_structs::align`]).
/// A cell is missing in the output when the measurement is missing or NaN,
/// when the population `mean` is missing, or when `std` is missing, zero or
/// negative (zero variance cannot produce a finite score).
pub fn score_matrix(
    sample: &SiteMatrix,
    stats: &PopStats,
    method: ScoreMethod,
) -> Result<SiteMatrix> {
    debug_assert_eq!(sample.height(), stats.height());

    let mean = stats.mean();
    let std = stats.std();

    let mut columns = vec![sample.data().column(ID_COL)?.clone()];
    for name in sample.sample_names() {
        let values = sample.sample(name)?;
        let scored: Float64Chunked = izip!(values, mean, std)
            .map(|(x, m, s)| {
                match (x, m, s) {
                    (Some(x), Some(m), Some(s))
                        if s > 0.0 && !x.is_nan() && !m.is_nan() => {
                        Some(method.score_one(x, m, s))
                    },
                    _ => None,
                }
            })
            .collect();
        columns.push(scored.with_name(name.into()).into_column());
    }
    SiteMatrix::from_columns(columns)
}

/// Converts a score matrix to two-tailed p-values, preserving shape and
/// labels.
///
/// Z-scores (already absolute) go through the standard normal survival
/// function; Crawford-Howell t statistics through the Student-t survival
/// function with the method's degrees of freedom, after taking the absolute
/// value.
pub fn pvalue_matrix(
    scores: &SiteMatrix,
    method: ScoreMethod,
) -> Result<SiteMatrix> {
    match method {
        ScoreMethod::ZScore => {
            scores.map_values(|z| (2.0 * STD_NORMAL.sf(z)).min(1.0))
        },
        ScoreMethod::CrawfordHowell { df } => {
            let t_dist = StudentsT::new(0.0, 1.0, df.get() as f64).unwrap();
            scores.map_values(move |t| (2.0 * t_dist.sf(t.abs())).min(1.0))
        },
    }
}
