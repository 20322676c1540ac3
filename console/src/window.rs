use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::Args;
use console::style;
use difmet::prelude::*;
use indicatif::ProgressBar;
use polars::prelude::SortMultipleOptions;

use crate::utils::{init_spinner, UtilsArgs};

#[derive(Args, Debug, Clone)]
pub(crate) struct WindowArgs {
    #[arg(help = "Path of the per-site p-value table (sites x samples).")]
    pvals:   PathBuf,
    #[arg(help = "Path of the window table (window_id, chr, start, end, cgs).")]
    windows: PathBuf,
    #[arg(
        short = 'a',
        long,
        required = true,
        help = "Path of the site annotation table (cg_id, chr)."
    )]
    annotation: PathBuf,
    #[arg(
        short = 'b',
        long,
        required = true,
        help = "Path of the raw value table used for covariance estimation \
                (sites x individuals)."
    )]
    betas: PathBuf,
    #[arg(
        short = 'o',
        long,
        required = true,
        help = "Path for the generated output table."
    )]
    output: PathBuf,

    #[arg(
        long,
        default_value_t = 1800,
        help = "Per-partition timeout in seconds. A chromosome partition \
                that does not report back within this window aborts the run."
    )]
    timeout: u64,

    #[arg(
        short = 's',
        long,
        default_value_t = ',',
        help = "Input field separator."
    )]
    separator: char,
}

impl WindowArgs {
    pub fn run(&self, utils: &UtilsArgs) -> anyhow::Result<()> {
        for path in [&self.pvals, &self.windows, &self.annotation, &self.betas]
        {
            if !path.is_file() {
                bail!("input file {} not found", style(path.display()).red());
            }
        }
        if self.output.is_dir() {
            bail!(
                "output path {} is a directory",
                style(self.output.display()).red()
            );
        }
        let separator = u8::try_from(self.separator)
            .map_err(|_| anyhow!("--separator must be an ASCII character"))?;

        let pvals = difmet::io::read_value_matrix(&self.pvals, separator)
            .with_context(|| {
                format!("failed to read p-value table {}", self.pvals.display())
            })?;
        let windows = difmet::io::read_window_table(&self.windows, separator)
            .with_context(|| {
                format!("failed to read window table {}", self.windows.display())
            })?;
        let annot = difmet::io::read_annotation(&self.annotation, separator)
            .with_context(|| {
                format!(
                    "failed to read annotation table {}",
                    self.annotation.display()
                )
            })?;
        let betas = difmet::io::read_value_matrix(&self.betas, separator)
            .with_context(|| {
                format!("failed to read value table {}", self.betas.display())
            })?;

        let spinner = if utils.progress {
            let spinner = init_spinner()?;
            spinner.set_message(format!(
                "Combining p-values for {} window(s)...",
                windows.len()
            ));
            spinner
        }
        else {
            ProgressBar::hidden()
        };

        let opts = WindowOpts {
            threads: utils.threads,
            timeout: Duration::from_secs(self.timeout),
        };
        let combined =
            combine_windows(&windows, &pvals, &betas, &annot, &opts)?;
        spinner.finish_and_clear();

        let mut out =
            combined.sort(["chr", "start"], SortMultipleOptions::default())?;
        difmet::io::write_table(&mut out, &self.output, b'\t')?;
        println!(
            "{}",
            style(format!(
                "Wrote combined p-values for {} window(s) to {}.",
                out.height(),
                self.output.display()
            ))
            .green()
            .bold()
        );
        Ok(())
    }
}
