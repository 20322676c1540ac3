use std::num::NonZeroU32;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Args, ValueEnum};
use console::style;
use difmet::prelude::*;
use log::warn;

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct DifmethArgs {
    #[arg(help = "Path of the sample value table (sites x samples).")]
    sample: PathBuf,
    #[arg(help = "Path of the population statistics table (`mean`/`std` per site).")]
    stats:  PathBuf,
    #[arg(
        short = 'o',
        long,
        required = true,
        help = "Path for the generated output table."
    )]
    output: PathBuf,

    #[clap(
        short = 'm',
        long = "score-method",
        value_enum,
        default_value_t = ScoreMethodArg::Zscore,
        help = "Per-site scoring method."
    )]
    score_method: ScoreMethodArg,

    #[arg(
        long,
        help = "Degrees of freedom (control population size - 1). Required \
                with `--score-method ch`."
    )]
    df: Option<u32>,

    #[clap(
        short = 'c',
        long = "corr-method",
        value_enum,
        default_value_t = CorrectionArg::Bonferroni,
        help = "Multiple testing correction method."
    )]
    corr_method: CorrectionArg,

    #[arg(
        long,
        default_value_t = false,
        help = "Convert sample Beta values to M-values before scoring. The \
                population statistics must already be on the M-value scale."
    )]
    to_mval: bool,

    #[arg(
        short = 's',
        long,
        default_value_t = ',',
        help = "Input field separator."
    )]
    separator: char,
}

#[derive(Debug, Clone, ValueEnum)]
pub(crate) enum ScoreMethodArg {
    Zscore,
    Ch,
}

#[derive(Debug, Clone, ValueEnum)]
pub(crate) enum CorrectionArg {
    Bonferroni,
    #[value(alias = "fdr_bh")]
    Bh,
    By,
    None,
}

impl DifmethArgs {
    /// Resolves the typed scoring method, failing fast on a `ch` request
    /// without usable degrees of freedom.
    fn score_method(&self) -> anyhow::Result<ScoreMethod> {
        match self.score_method {
            ScoreMethodArg::Zscore => {
                if self.df.is_some() {
                    warn!("--df is ignored with the zscore method");
                }
                Ok(ScoreMethod::ZScore)
            },
            ScoreMethodArg::Ch => {
                let df = self.df.ok_or_else(|| {
                    anyhow!(
                        "--score-method ch requires --df (control population \
                         size - 1)"
                    )
                })?;
                let df = NonZeroU32::new(df)
                    .ok_or_else(|| anyhow!("--df must be a positive integer"))?;
                Ok(ScoreMethod::CrawfordHowell { df })
            },
        }
    }

    fn correction(&self) -> Option<Correction> {
        match self.corr_method {
            CorrectionArg::Bonferroni => Some(Correction::Bonferroni),
            CorrectionArg::Bh => Some(Correction::BenjaminiHochberg),
            CorrectionArg::By => Some(Correction::BenjaminiYekutieli),
            CorrectionArg::None => None,
        }
    }

    pub fn run(&self, _utils: &UtilsArgs) -> anyhow::Result<()> {
        let score_method = self.score_method()?;
        let correction = self.correction();
        let separator = u8::try_from(self.separator)
            .map_err(|_| anyhow!("--separator must be an ASCII character"))?;

        for path in [&self.sample, &self.stats] {
            if !path.is_file() {
                bail!(
                    "input file {} not found",
                    style(path.display()).red()
                );
            }
        }
        if self.output.is_dir() {
            bail!(
                "output path {} is a directory",
                style(self.output.display()).red()
            );
        }

        let sample = difmet::io::read_value_matrix(&self.sample, separator)
            .with_context(|| {
                format!("failed to read sample table {}", self.sample.display())
            })?;
        let sample = if self.to_mval {
            to_mval(&sample)?
        }
        else {
            sample
        };
        let stats = difmet::io::read_pop_stats(&self.stats, separator)
            .with_context(|| {
                format!(
                    "failed to read population statistics {}",
                    self.stats.display()
                )
            })?;

        let result = DifMeth::new(score_method)
            .with_correction(correction)
            .run(&sample, &stats)?;

        if !result.dropped_sample.is_empty() || !result.dropped_stats.is_empty()
        {
            println!(
                "{}",
                style(format!(
                    "Alignment dropped {} sample site(s) and {} population \
                     site(s).",
                    result.dropped_sample.len(),
                    result.dropped_stats.len()
                ))
                .yellow()
            );
        }

        let mut out = result.pvalues.into_data();
        difmet::io::write_table(&mut out, &self.output, b'\t')?;
        println!(
            "{}",
            style(format!(
                "Wrote p-values for {} site(s) to {}.",
                out.height(),
                self.output.display()
            ))
            .green()
            .bold()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: ScoreMethodArg, df: Option<u32>) -> DifmethArgs {
        DifmethArgs {
            sample: PathBuf::from("sample.csv"),
            stats: PathBuf::from("stats.csv"),
            output: PathBuf::from("out.tsv"),
            score_method: method,
            df,
            corr_method: CorrectionArg::Bonferroni,
            to_mval: false,
            separator: ',',
        }
    }

    #[test]
    fn ch_without_df_is_a_configuration_error() {
        let err = args(ScoreMethodArg::Ch, None)
            .score_method()
            .unwrap_err();
        assert!(err.to_string().contains("--df"));
    }

    #[test]
    fn ch_with_zero_df_is_a_configuration_error() {
        assert!(args(ScoreMethodArg::Ch, Some(0)).score_method().is_err());
    }

    #[test]
    fn ch_with_df_resolves() {
        let method =
            args(ScoreMethodArg::Ch, Some(518)).score_method().unwrap();
        assert!(matches!(method, ScoreMethod::CrawfordHowell { .. }));
    }

    #[test]
    fn zscore_ignores_df() {
        let method =
            args(ScoreMethodArg::Zscore, Some(5)).score_method().unwrap();
        assert!(matches!(method, ScoreMethod::ZScore));
    }
}
