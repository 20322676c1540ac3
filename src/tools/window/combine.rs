use log::debug;
use ndarray::Array2;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Combines correlated per-site p-values for one (window, sample) pair.
///
/// `cov` must be aligned to `pvals`: same site subset, same order (see
/// [`super::covariance::estimate`]). Policy:
///
/// * 0 p-values — not computable, returns `None`;
/// * 1 p-value — returned unchanged, no combination needed;
/// * 2 or more — Brown's covariance-adjusted extension of Fisher's method.
pub fn combine_pvalues(cov: &Array2<f64>, pvals: &[f64]) -> Option<f64> {
    match pvals.len() {
        0 => None,
        1 => Some(pvals[0]),
        _ => Some(brown(cov, pvals)),
    }
}

/// Brown's method: Fisher's statistic `x = sum(-2 ln p)` referred to a
/// chi-squared distribution whose scale `c` and degrees of freedom are
/// corrected by the total covariance among the `-2 ln p` inputs. Zero
/// covariance reduces to Fisher's combination exactly.
fn brown(cov: &Array2<f64>, pvals: &[f64]) -> f64 {
    let m = pvals.len();
    debug_assert_eq!(cov.nrows(), m);
    debug_assert_eq!(cov.ncols(), m);

    let expected = 2.0 * m as f64;
    let df_fisher = 2.0 * m as f64;

    let mut cov_sum = 0.0;
    for i in 0..m {
        for j in (i + 1)..m {
            cov_sum += cov[[i, j]];
        }
    }

    let var = 4.0 * m as f64 + 2.0 * cov_sum;
    let (mut c, mut df) = if var > 0.0 {
        (var / (2.0 * expected), 2.0 * expected * expected / var)
    }
    else {
        // Degenerate negative covariance total: fall back to Fisher.
        debug!("non-positive Brown variance ({var}), using Fisher's method");
        (1.0, df_fisher)
    };
    if df > df_fisher {
        df = df_fisher;
        c = 1.0;
    }

    let x: f64 = pvals
        .iter()
        .map(|&p| -2.0 * p.max(f64::MIN_POSITIVE).ln())
        .sum();

    let chi = ChiSquared::new(df).unwrap();
    chi.sf(x / c).min(1.0)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use ndarray::{array, Array2};

    use super::*;

    #[test]
    fn empty_input_is_not_computable() {
        assert_eq!(combine_pvalues(&Array2::zeros((0, 0)), &[]), None);
    }

    #[test]
    fn single_pvalue_passes_through() {
        let combined =
            combine_pvalues(&Array2::zeros((1, 1)), &[0.042]).unwrap();
        assert_eq!(combined, 0.042);
    }

    #[test]
    fn independent_inputs_reduce_to_fisher() {
        // Two independent p-values of 0.04: Fisher's combination gives
        // x = -2 ln(0.04) * 2 ~= 12.876 on chi2(4), p ~= 0.0103 -- clearly
        // different from either input.
        let combined =
            combine_pvalues(&Array2::zeros((2, 2)), &[0.04, 0.04]).unwrap();
        assert_approx_eq!(combined, 0.0103, 1e-3);
    }

    #[test]
    fn positive_correlation_weakens_the_combination() {
        let independent =
            combine_pvalues(&Array2::zeros((2, 2)), &[0.04, 0.04]).unwrap();
        // Strong positive covariance between the -2 ln p terms.
        let correlated_cov = array![[4.0, 3.0], [3.0, 4.0]];
        let correlated =
            combine_pvalues(&correlated_cov, &[0.04, 0.04]).unwrap();
        assert!(correlated > independent);
        // Evidence is not double counted: the combined p-value stays above
        // the naive Fisher result.
    }

    #[test]
    fn negative_variance_falls_back_to_fisher() {
        let pathological = array![[4.0, -8.0], [-8.0, 4.0]];
        let fallback =
            combine_pvalues(&pathological, &[0.04, 0.04]).unwrap();
        let fisher =
            combine_pvalues(&Array2::zeros((2, 2)), &[0.04, 0.04]).unwrap();
        assert_approx_eq!(fallback, fisher, 1e-12);
    }

    #[test]
    fn zero_pvalues_do_not_produce_nan() {
        let combined =
            combine_pvalues(&Array2::zeros((2, 2)), &[0.0, 0.5]).unwrap();
        assert!(combined.is_finite());
        assert!(combined >= 0.0);
    }
}
