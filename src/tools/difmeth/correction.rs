use adjustp::Procedure;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data_structs::{SiteMatrix, ID_COL};
use crate::error::Result;

/// Multiple-testing correction procedures, mapped onto [`adjustp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Correction {
    Bonferroni,
    BenjaminiHochberg,
    BenjaminiYekutieli,
}

impl Correction {
    fn procedure(&self) -> Procedure {
        match self {
            Correction::Bonferroni => Procedure::Bonferroni,
            Correction::BenjaminiHochberg => Procedure::BenjaminiHochberg,
            Correction::BenjaminiYekutieli => Procedure::BenjaminiYekutieli,
        }
    }
}

/// Corrects each sample column for multiple testing, independently.
///
/// Missing p-values are dropped before correction and restored as missing
/// afterwards, so the family size seen by the procedure is the number of
/// tests actually performed in that column and the output keeps the full
/// site index of the input.
pub fn correct_matrix(
    pvals: &SiteMatrix,
    method: Correction,
) -> Result<SiteMatrix> {
    let height = pvals.height();

    let mut columns = vec![pvals.data().column(ID_COL)?.clone()];
    for name in pvals.sample_names() {
        let mut keep_idx = Vec::new();
        let mut keep_val = Vec::new();
        for (i, v) in pvals.sample(name)?.into_iter().enumerate() {
            if let Some(v) = v {
                if !v.is_nan() {
                    keep_idx.push(i);
                    keep_val.push(v);
                }
            }
        }

        let adjusted = adjustp::adjust(&keep_val, method.procedure());

        let mut expanded = vec![None; height];
        for (i, p) in keep_idx.into_iter().zip(adjusted) {
            expanded[i] = Some(p);
        }
        let corrected: Float64Chunked = expanded.into_iter().collect();
        columns.push(corrected.with_name(name.into()).into_column());
    }
    SiteMatrix::from_columns(columns)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use polars::df;
    use rand::prelude::*;
    use rstest::rstest;

    use super::*;

    fn pval_matrix(values: &[Option<f64>]) -> SiteMatrix {
        let ids = (0..values.len())
            .map(|i| format!("cg{i}"))
            .collect::<Vec<_>>();
        SiteMatrix::try_new(
            df!(ID_COL => ids, "s1" => values.to_vec()).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn bonferroni_scales_by_family_size() {
        let pvals =
            pval_matrix(&[Some(0.01), Some(0.04), Some(0.5), Some(0.9)]);
        let corrected =
            correct_matrix(&pvals, Correction::Bonferroni).unwrap();
        let col = corrected.sample("s1").unwrap();
        assert_approx_eq!(col.get(0).unwrap(), 0.04, 1e-12);
        assert_approx_eq!(col.get(1).unwrap(), 0.16, 1e-12);
        // Capped at 1.
        assert_approx_eq!(col.get(3).unwrap(), 1.0, 1e-12);
    }

    #[rstest]
    #[case(Correction::Bonferroni)]
    #[case(Correction::BenjaminiHochberg)]
    fn corrected_is_never_below_raw(#[case] method: Correction) {
        let mut rng = StdRng::seed_from_u64(7);
        let raw: Vec<Option<f64>> =
            (0..200).map(|_| Some(rng.gen_range(0.0..1.0))).collect();
        let pvals = pval_matrix(&raw);
        let corrected = correct_matrix(&pvals, method).unwrap();
        for (raw, adj) in raw.iter().zip(corrected.sample("s1").unwrap()) {
            let (raw, adj) = (raw.unwrap(), adj.unwrap());
            assert!(adj >= raw - 1e-12, "adjusted {adj} < raw {raw}");
            assert!((0.0..=1.0).contains(&adj));
        }
    }

    #[test]
    fn missing_cells_are_excluded_and_restored() {
        let pvals = pval_matrix(&[Some(0.01), None, Some(0.02)]);
        let corrected =
            correct_matrix(&pvals, Correction::Bonferroni).unwrap();
        let col = corrected.sample("s1").unwrap();
        // Family size is 2, not 3.
        assert_approx_eq!(col.get(0).unwrap(), 0.02, 1e-12);
        assert_eq!(col.get(1), None);
        assert_approx_eq!(col.get(2).unwrap(), 0.04, 1e-12);
    }

    #[test]
    fn columns_are_corrected_independently() {
        let df = df!(
            ID_COL => ["cgA", "cgB"],
            "s1" => [Some(0.01), Some(0.02)],
            "s2" => [Some(0.03), None],
        )
        .unwrap();
        let pvals = SiteMatrix::try_new(df).unwrap();
        let corrected =
            correct_matrix(&pvals, Correction::Bonferroni).unwrap();
        // s2 has a single test, so its p-value is unchanged.
        assert_approx_eq!(
            corrected.sample("s2").unwrap().get(0).unwrap(),
            0.03,
            1e-12
        );
        assert_approx_eq!(
            corrected.sample("s1").unwrap().get(0).unwrap(),
            0.02,
            1e-12
        );
    }
}
