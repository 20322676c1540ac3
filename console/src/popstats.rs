use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::Args;
use console::style;
use dialoguer::Confirm;
use difmet::prelude::*;
use difmet::tools::popstats::{combine_tables, make_stats, DEFAULT_PERCENTILES};
use indicatif::ProgressBar;
use serde::Serialize;

use crate::utils::{expand_wildcards, init_pbar, UtilsArgs};

#[derive(Args, Debug, Clone)]
pub(crate) struct PopstatsArgs {
    #[arg(
        value_parser,
        num_args = 1..,
        required = true,
        help = "Paths (or globs) of population value tables."
    )]
    inputs: Vec<String>,

    #[arg(
        short = 'i',
        long,
        help = "Path of a master probe index table (cg_id column, or first \
                column). Defaults to the first input's site index."
    )]
    index: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        required = true,
        help = "Path for the generated statistics table."
    )]
    output: PathBuf,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Percentile columns to compute (default: 1,5,25,75,95,99)."
    )]
    percentiles: Option<Vec<u8>>,

    #[arg(
        long,
        default_value_t = false,
        help = "Convert Beta values to M-values before computing statistics."
    )]
    mval: bool,

    #[arg(long, help = "Optional path for a JSON run summary.")]
    summary: Option<PathBuf>,

    #[arg(
        short = 's',
        long,
        default_value_t = ',',
        help = "Input field separator."
    )]
    separator: char,

    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Overwrite an existing output file without asking."
    )]
    force: bool,
}

#[derive(Serialize)]
struct PopstatsSummary {
    n_tables:    usize,
    n_sites:     usize,
    n_samples:   usize,
    percentiles: Vec<u8>,
    mval_scale:  bool,
}

impl PopstatsArgs {
    pub fn run(&self, utils: &UtilsArgs) -> anyhow::Result<()> {
        let paths = expand_wildcards(self.inputs.clone());
        if paths.is_empty() {
            bail!("no input files matched");
        }
        for path in &paths {
            if !path.is_file() {
                bail!("input file {} not found", style(path.display()).red());
            }
        }

        if self.output.exists() && !self.force {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Output file {} exists. Overwrite?",
                    self.output.display()
                ))
                .default(true)
                .interact()
                .unwrap_or(false);
            if !confirmed {
                println!("{}", style("Process aborted by the user.").red());
                return Err(anyhow!("User aborted the process."));
            }
        }

        let separator = u8::try_from(self.separator)
            .map_err(|_| anyhow!("--separator must be an ASCII character"))?;

        let pbar = if utils.progress {
            init_pbar(paths.len())?
        }
        else {
            ProgressBar::hidden()
        };
        let mut tables = Vec::with_capacity(paths.len());
        for path in &paths {
            tables.push(
                difmet::io::read_value_matrix(path, separator).with_context(
                    || format!("failed to read {}", path.display()),
                )?,
            );
            pbar.inc(1);
        }
        pbar.finish_and_clear();

        let index = match &self.index {
            Some(path) => difmet::io::read_site_index(path, separator)
                .with_context(|| {
                    format!("failed to read index table {}", path.display())
                })?,
            None => {
                tables[0]
                    .ids()
                    .into_iter()
                    .flatten()
                    .map(|id| id.to_string())
                    .collect()
            },
        };

        let merged = combine_tables(&index, &tables)?;
        let merged = if self.mval { to_mval(&merged)? } else { merged };

        let percentiles = self
            .percentiles
            .clone()
            .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec());
        let stats = make_stats(&merged, &percentiles)?;

        let n_samples = merged.sample_names().len();
        let mut out = stats.into_data();
        difmet::io::write_table(&mut out, &self.output, separator)?;

        if let Some(summary_path) = &self.summary {
            let summary = PopstatsSummary {
                n_tables: paths.len(),
                n_sites: out.height(),
                n_samples,
                percentiles,
                mval_scale: self.mval,
            };
            fs::write(summary_path, serde_json::to_string_pretty(&summary)?)?;
        }

        println!(
            "{}",
            style(format!(
                "Wrote statistics for {} site(s) ({} population sample(s)) \
                 to {}.",
                out.height(),
                n_samples,
                self.output.display()
            ))
            .green()
            .bold()
        );
        Ok(())
    }
}
