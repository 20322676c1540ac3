//! Analysis pipelines: per-site differential methylation, windowed p-value
//! combination and population-statistics construction.

pub mod difmeth;
pub mod popstats;
pub mod window;
