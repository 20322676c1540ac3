use hashbrown::{HashMap, HashSet};
use log::warn;
use polars::prelude::*;

use crate::data_structs::window::CHR_COL;
use crate::data_structs::ID_COL;
use crate::error::{DifmetError, Result};

/// Site → chromosome annotation.
///
/// Used only to split sites (and with them windows) into independent
/// chromosome groups for parallel processing.
#[derive(Debug, Clone)]
pub struct AnnotationTable {
    map: HashMap<String, u32>,
}

impl AnnotationTable {
    const TABLE: &'static str = "annotation";

    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        for required in [ID_COL, CHR_COL] {
            if df.column(required).is_err() {
                return Err(DifmetError::MissingColumn {
                    table:  Self::TABLE,
                    column: required,
                });
            }
        }

        let ids = df.column(ID_COL)?.cast(&DataType::String)?;
        let chrs = df.column(CHR_COL)?.cast(&DataType::UInt32).map_err(|_| {
            DifmetError::InvalidColumn {
                table:  Self::TABLE,
                column: CHR_COL.to_string(),
                reason: "expected chromosome numbers".to_string(),
            }
        })?;

        let mut map = HashMap::with_capacity(df.height());
        let mut skipped = 0usize;
        for (id, chr) in ids
            .str()
            .unwrap()
            .into_iter()
            .zip(chrs.u32().unwrap().into_iter())
        {
            match (id, chr) {
                (Some(id), Some(chr)) => {
                    map.insert(id.to_string(), chr);
                },
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("annotation table: skipped {skipped} row(s) with missing values");
        }

        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn chromosome_of(&self, cg_id: &str) -> Option<u32> {
        self.map.get(cg_id).copied()
    }

    /// Groups the annotated sites by chromosome.
    pub fn partition(&self) -> HashMap<u32, HashSet<String>> {
        let mut partitions: HashMap<u32, HashSet<String>> = HashMap::new();
        for (id, chr) in &self.map {
            partitions.entry(*chr).or_default().insert(id.clone());
        }
        partitions
    }
}
