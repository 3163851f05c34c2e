//! Metadata table and split file handling.
//!
//! The metadata table is a CSV file with a header row followed by rows of
//! `[tag_or_ref_path, distA_path, distB_path, score]`. A split file maps a
//! split index to a phase name to a list of row indices into the unfiltered
//! table:
//!
//! ```json
//! {"1": {"train": [0, 3, 4], "test": [1, 2]}}
//! ```

use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    config::{DatasetMode, JND_TAG},
    error::{DatasetError, DatasetResult},
};

/// One comparison instance of the BAPPS benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    /// `"jnd"` for just-noticeable-difference rows, otherwise the reference image path.
    pub tag: String,
    pub dist_a: String,
    pub dist_b: String,
    /// Fraction of judges preferring distortion A, in `[0, 1]`.
    pub score: f64,
}

impl MetaRecord {
    pub fn is_jnd(&self) -> bool {
        self.tag == JND_TAG
    }

    /// Reference image path, absent for JND rows.
    pub fn reference(&self) -> Option<&str> {
        (!self.is_jnd()).then_some(self.tag.as_str())
    }
}

/// Split index -> phase name -> row indices.
pub type SplitMap = HashMap<usize, HashMap<String, Vec<usize>>>;

/// Ordered sequence of metadata rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaTable {
    records: Vec<MetaRecord>,
}

impl MetaTable {
    pub fn new(records: Vec<MetaRecord>) -> Self {
        Self { records }
    }

    /// Load a metadata CSV. The first line is a header and is skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| DatasetError::MetaReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        Self::from_reader(reader, path)
    }

    /// Parse metadata rows from any CSV reader; `origin` is used in error messages.
    pub fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        origin: &Path,
    ) -> DatasetResult<Self> {
        let mut records = Vec::new();

        for (row, result) in reader
            .deserialize::<(String, String, String, f64)>()
            .enumerate()
        {
            let (tag, dist_a, dist_b, score) =
                result.map_err(|e| DatasetError::MetaParseFailed {
                    path: origin.to_path_buf(),
                    row,
                    source: e,
                })?;
            records.push(MetaRecord {
                tag,
                dist_a,
                dist_b,
                score,
            });
        }

        Ok(Self { records })
    }

    /// Keep exactly the rows named by `indices`, in that order.
    pub fn select(self, indices: &[usize]) -> DatasetResult<Self> {
        let len = self.records.len();
        let records = indices
            .iter()
            .map(|&index| {
                self.records
                    .get(index)
                    .cloned()
                    .ok_or(DatasetError::SplitIndexOutOfRange { index, len })
            })
            .collect::<DatasetResult<Vec<_>>>()?;

        Ok(Self { records })
    }

    /// Keep the rows belonging to `mode`.
    pub fn filter_mode(self, mode: DatasetMode) -> Self {
        let records = self
            .records
            .into_iter()
            .filter(|record| mode.keeps(&record.tag))
            .collect();
        Self { records }
    }

    /// Keep rows whose distortion A path contains one of `categories`.
    ///
    /// A row is pushed once per matching category, so a row matching two
    /// categories appears twice.
    pub fn filter_categories<S: AsRef<str>>(self, categories: &[S]) -> Self {
        let mut records = Vec::new();
        for record in self.records {
            for category in categories {
                if record.dist_a.contains(category.as_ref()) {
                    records.push(record.clone());
                }
            }
        }
        Self { records }
    }

    pub fn records(&self) -> &[MetaRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MetaRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read a split file and return the row indices for `split_index` and `phase`.
pub fn load_split<P: AsRef<Path>>(
    path: P,
    split_index: usize,
    phase: &str,
) -> DatasetResult<Vec<usize>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| DatasetError::SplitReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let splits: SplitMap = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        DatasetError::SplitParseFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    select_split(splits, split_index, phase)
}

/// Pick the row list for `split_index` and `phase` out of a parsed split map.
pub fn select_split(
    mut splits: SplitMap,
    split_index: usize,
    phase: &str,
) -> DatasetResult<Vec<usize>> {
    splits
        .get_mut(&split_index)
        .and_then(|phases| phases.remove(phase))
        .ok_or_else(|| DatasetError::SplitNotFound {
            split_index,
            phase: phase.to_owned(),
        })
}
