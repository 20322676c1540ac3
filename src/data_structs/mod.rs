//! Validated table types shared by both analysis stages.

mod annotation;
mod matrix;
mod pop_stats;
mod window;

pub use annotation::AnnotationTable;
pub use matrix::{align, Aligned, SiteMatrix, ID_COL};
pub use pop_stats::{PopStats, MEAN_COL, STD_COL};
pub use window::{WindowRecord, WindowTable, CGS_COL, CHR_COL, END_COL, START_COL, WINDOW_ID_COL};
