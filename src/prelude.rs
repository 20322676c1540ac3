//! Commonly used types, re-exported in one place.

pub use crate::data_structs::{
    align,
    Aligned,
    AnnotationTable,
    PopStats,
    SiteMatrix,
    WindowRecord,
    WindowTable,
    ID_COL,
};
pub use crate::error::{DifmetError, Result};
pub use crate::tools::difmeth::{Correction, DifMeth, DifMethResult, ScoreMethod};
pub use crate::tools::window::{combine_windows, WindowOpts};
pub use crate::utils::{to_beta, to_mval};
