//! # difmet
//!
//! `difmet` is a Rust library and command-line tool for differential DNA
//! methylation analysis of array methylation data. Given per-site
//! methylation measurements of one or more patients and summary statistics
//! (`mean`/`std`) of a reference control population at the same probe
//! sites, it answers two questions:
//!
//! * **Per site** — how unusual is each measurement relative to the control
//!   population? Sites are scored with an absolute z-score or a
//!   Crawford-Howell case-control t statistic, converted to two-tailed
//!   p-values and corrected for multiple testing per sample
//!   ([`tools::difmeth`]).
//! * **Per genomic window** — how unusual is a whole window of neighboring,
//!   correlated sites? Per-site p-values are combined into one window-level
//!   p-value with Brown's covariance-adjusted extension of Fisher's method,
//!   parallelized over chromosome partitions ([`tools::window`]).
//!
//! ## Structure
//!
//! * [`data_structs`]: validated table types — the sites × samples value
//!   matrix ([`SiteMatrix`]), population statistics ([`PopStats`]), genomic
//!   windows ([`WindowTable`]) and the site → chromosome annotation
//!   ([`AnnotationTable`]) — plus the explicit sample/population alignment
//!   step ([`data_structs::align`]).
//! * [`io`]: delimited-table readers and writers (gzip-compressed input
//!   supported) for every table above.
//! * [`tools`]: the two analysis pipelines and the population-statistics
//!   builder ([`tools::popstats`]).
//! * [`utils`]: Beta ↔ M-value transforms.
//!
//! All tables are immutable after load; every output is a pure function of
//! its inputs. Missing measurements propagate as nulls through every stage.
//!
//! ## Usage
//!
//! ```no_run
//! use difmet::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let sample = difmet::io::read_value_matrix(Path::new("patients.csv"), b',')?;
//!     let stats = difmet::io::read_pop_stats(Path::new("sum_stat_m.csv"), b',')?;
//!
//!     let result = DifMeth::new(ScoreMethod::ZScore)
//!         .with_correction(Some(Correction::Bonferroni))
//!         .run(&sample, &stats)?;
//!
//!     println!(
//!         "{} site(s) dropped during alignment",
//!         result.dropped_sample.len() + result.dropped_stats.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! [`SiteMatrix`]: data_structs::SiteMatrix
//! [`PopStats`]: data_structs::PopStats
//! [`WindowTable`]: data_structs::WindowTable
//! [`AnnotationTable`]: data_structs::AnnotationTable

pub mod data_structs;
pub mod error;
pub mod io;
pub mod prelude;
pub mod tools;
pub mod utils;

pub use error::{DifmetError, Result};
