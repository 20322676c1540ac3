use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(
        long,
        default_value_t = 0,
        help = "Number of worker threads (0 = all available cores)."
    )]
    pub threads: usize,
    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Verbose (debug) logging."
    )]
    pub verbose: bool,
    #[arg(long, default_value_t = false, help = "Display progress bars.")]
    pub progress: bool,
}

impl UtilsArgs {
    pub fn setup(&self) -> Result<()> {
        if self.threads > 0 {
            std::env::set_var("POLARS_MAX_THREADS", self.threads.to_string());
        }
        init_logger(self.verbose)?;
        Ok(())
    }
}

fn init_logger(verbose: bool) -> Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(if verbose {
            LevelFilter::Debug
        }
        else {
            LevelFilter::Info
        })
        .try_init()?;
    Ok(())
}

pub(crate) fn init_pbar(total: usize) -> Result<ProgressBar> {
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}, ETA: {eta}] [{bar:40.cyan/blue}] {pos:>5.green}/{len:5} {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Processing...");
    Ok(progress_bar)
}

pub(crate) fn init_spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(spinner)
}

pub(crate) fn expand_wildcards(paths: Vec<String>) -> Vec<PathBuf> {
    let mut expanded_paths = Vec::new();

    for path in paths {
        if path.contains('*') || path.contains('?') {
            // Expand wildcard using glob
            match glob(&path) {
                Ok(matches) => {
                    for entry in matches.filter_map(|entry| entry.ok()) {
                        expanded_paths.push(entry);
                    }
                },
                Err(e) => eprintln!("Error processing wildcard '{}': {}", path, e),
            }
        }
        else {
            // If not a wildcard, push the path as-is
            expanded_paths.push(PathBuf::from(path));
        }
    }

    expanded_paths
}
