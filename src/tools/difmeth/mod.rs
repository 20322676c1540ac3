//! Per-site differential methylation pipeline (stage A).
//!
//! Aligns a sample matrix against population statistics, scores every
//! (site, sample) cell, converts scores to two-tailed p-values and applies
//! an optional multiple-testing correction per sample column.

mod correction;
mod score;

pub use correction::{correct_matrix, Correction};
pub use score::{pvalue_matrix, score_matrix, ScoreMethod};

use log::info;

use crate::data_structs::{align, PopStats, SiteMatrix};
use crate::error::Result;

/// Configuration of the per-site pipeline.
#[derive(Debug, Clone, Copy)]
pub struct DifMeth {
    pub score_method: ScoreMethod,
    pub correction:   Option<Correction>,
}

/// Output of [`DifMeth::run`]: the per-site p-value table plus the sites
/// dropped while aligning the two inputs.
#[derive(Debug)]
pub struct DifMethResult {
    pub pvalues:        SiteMatrix,
    pub dropped_sample: Vec<String>,
    pub dropped_stats:  Vec<String>,
}

impl DifMeth {
    pub fn new(score_method: ScoreMethod) -> Self {
        Self {
            score_method,
            correction: None,
        }
    }

    pub fn with_correction(mut self, correction: Option<Correction>) -> Self {
        self.correction = correction;
        self
    }

    /// Runs alignment, scoring, p-value conversion and (if configured)
    /// multiple-testing correction.
    pub fn run(
        &self,
        sample: &SiteMatrix,
        stats: &PopStats,
    ) -> Result<DifMethResult> {
        let aligned = align(sample, stats)?;
        if !aligned.dropped_sample.is_empty()
            || !aligned.dropped_stats.is_empty()
        {
            info!(
                "alignment dropped {} sample site(s) and {} population \
                 site(s)",
                aligned.dropped_sample.len(),
                aligned.dropped_stats.len()
            );
        }

        let scores =
            score_matrix(&aligned.sample, &aligned.stats, self.score_method)?;
        let pvals = pvalue_matrix(&scores, self.score_method)?;
        let pvalues = match self.correction {
            Some(method) => correct_matrix(&pvals, method)?,
            None => pvals,
        };

        Ok(DifMethResult {
            pvalues,
            dropped_sample: aligned.dropped_sample,
            dropped_stats: aligned.dropped_stats,
        })
    }
}
