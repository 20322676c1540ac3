use ndarray::{Array1, Array2, ArrayView1};
use statrs::statistics::Statistics;

/// Covariance structure of one window's sites.
///
/// `kept` holds the indices (into the input row order) of the sites that
/// survived complete-case filtering; `matrix` is their covariance, in the
/// same order. The reduced site set is the effective dimensionality for the
/// p-value combination step.
#[derive(Debug, Clone)]
pub struct WindowCovariance {
    pub matrix: Array2<f64>,
    pub kept:   Vec<usize>,
}

/// Estimates the covariance among a window's sites from raw per-individual
/// values (rows = sites, columns = individuals).
///
/// Rows containing any non-finite value are excluded entirely. Each
/// surviving row is standardized (mean 0, population std 1) and transformed
/// through `w(x) = -2 * ln(ECDF(x))` with the right-continuous empirical
/// CDF of that row; the output matrix is the n-1-normalized covariance of
/// the transformed rows. This is the empirical estimate of
/// `cov(-2 ln P_i, -2 ln P_j)` needed by Brown's combination.
pub fn estimate(values: &Array2<f64>) -> WindowCovariance {
    let kept: Vec<usize> = values
        .rows()
        .into_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
        .map(|(i, _)| i)
        .collect();

    let m = kept.len();
    if m == 0 || values.ncols() < 2 {
        return WindowCovariance {
            matrix: Array2::zeros((m, m)),
            kept,
        };
    }

    let transformed: Vec<Array1<f64>> = kept
        .iter()
        .map(|&i| transform_row(values.row(i)))
        .collect();

    let mut matrix = Array2::zeros((m, m));
    for i in 0..m {
        for j in i..m {
            let cov = sample_cov(&transformed[i], &transformed[j]);
            matrix[[i, j]] = cov;
            matrix[[j, i]] = cov;
        }
    }

    WindowCovariance { matrix, kept }
}

/// Standardizes one row and maps each value through `-2 * ln(ECDF(x))`.
fn transform_row(row: ArrayView1<f64>) -> Array1<f64> {
    let mean = row.iter().mean();
    let sd = row.iter().population_std_dev();

    let standardized: Vec<f64> = if sd > 0.0 {
        row.iter().map(|v| (v - mean) / sd).collect()
    }
    else {
        // Constant row: every value sits at the ECDF maximum.
        vec![0.0; row.len()]
    };

    let mut sorted = standardized.clone();
    sorted.sort_by(f64::total_cmp);

    let n = standardized.len() as f64;
    standardized
        .iter()
        .map(|&x| {
            let rank = sorted.partition_point(|&y| y <= x);
            -2.0 * (rank as f64 / n).ln()
        })
        .collect()
}

fn sample_cov(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let n = a.len();
    if n < 2 {
        return 0.0;
    }
    let mean_a = a.iter().mean();
    let mean_b = b.iter().mean();
    let cross: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    cross / (n as f64 - 1.0)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn rows_with_missing_values_are_excluded() {
        let values = array![
            [0.1, 0.2, 0.3, 0.4],
            [0.5, f64::NAN, 0.7, 0.8],
            [0.2, 0.4, 0.6, 0.8],
        ];
        let cov = estimate(&values);
        assert_eq!(cov.kept, vec![0, 2]);
        assert_eq!(cov.matrix.dim(), (2, 2));
    }

    #[test]
    fn all_rows_missing_gives_empty_output() {
        let values = array![[f64::NAN, 0.2], [0.1, f64::NAN]];
        let cov = estimate(&values);
        assert!(cov.kept.is_empty());
        assert_eq!(cov.matrix.dim(), (0, 0));
    }

    #[test]
    fn identical_rows_have_equal_variance_and_covariance() {
        let values = array![
            [0.1, 0.9, 0.4, 0.6, 0.2, 0.8],
            [0.1, 0.9, 0.4, 0.6, 0.2, 0.8],
        ];
        let cov = estimate(&values);
        assert_approx_eq!(cov.matrix[[0, 0]], cov.matrix[[0, 1]], 1e-12);
        assert!(cov.matrix[[0, 0]] > 0.0);
    }

    #[test]
    fn transform_is_zero_at_the_maximum() {
        let transformed =
            transform_row(array![1.0, 2.0, 3.0, 4.0].view());
        // ECDF of the maximum is 1, so w = -2 ln(1) = 0.
        assert_approx_eq!(transformed[3], 0.0, 1e-12);
        // Smaller values get larger transforms.
        assert!(transformed[0] > transformed[1]);
    }
}
