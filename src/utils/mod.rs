//! Value-scale transforms between Beta values (methylation proportions in
//! (0,1)) and M-values (log2-odds).

use num::Float;

use crate::data_structs::SiteMatrix;
use crate::error::Result;

/// Beta values exactly 0 are clamped here before the log-odds transform.
pub const BETA_CLAMP_LOW: f64 = 0.001;
/// Beta values exactly 1 are clamped here before the log-odds transform.
pub const BETA_CLAMP_HIGH: f64 = 0.999;

/// log2-odds of a single Beta value.
///
/// Values exactly equal to 0 or 1 are clamped to 0.001 / 0.999 so the
/// transform stays finite; everything else passes through unchanged.
pub fn mval_of<F: Float>(beta: F) -> F {
    let one = F::one();
    let beta = if beta == one {
        F::from(BETA_CLAMP_HIGH).unwrap()
    }
    else if beta == F::zero() {
        F::from(BETA_CLAMP_LOW).unwrap()
    }
    else {
        beta
    };
    (beta / (one - beta)).log2()
}

/// Inverse of [`mval_of`] (logistic function in base 2).
pub fn beta_of<F: Float>(mval: F) -> F {
    let odds = mval.exp2();
    odds / (F::one() + odds)
}

/// Applies [`mval_of`] to every sample column of a matrix; nulls propagate.
pub fn to_mval(matrix: &SiteMatrix) -> Result<SiteMatrix> {
    matrix.map_values(mval_of::<f64>)
}

/// Applies [`beta_of`] to every sample column of a matrix; nulls propagate.
pub fn to_beta(matrix: &SiteMatrix) -> Result<SiteMatrix> {
    matrix.map_values(beta_of::<f64>)
}
