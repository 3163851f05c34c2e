//! IQA-Burn command-line tools
//!
//! ## Available Binaries
//!
//! - `bapps_test`: load the BAPPS dataset, print per-sample shapes and label
//!   statistics, and pull a few batches through Burn's data loader
//! - `correlate`: compute RMSE/PLCC/SRCC/KRCC between a prediction column and
//!   a MOS column of a CSV file
//!
//! ## Usage
//!
//! ```bash
//! # Inspect the 2AFC validation split
//! cargo run --bin bapps_test -- \
//!     --meta-info-file datasets/meta_info/meta_info_BAPPSDataset.csv \
//!     --dataroot datasets/PerceptualSimilarity/dataset --phase val
//!
//! # Correlate model scores with MOS
//! cargo run --bin correlate -- scores.csv --prediction-column pred --mos-column mos --fit-scale
//! ```

pub mod backend;
pub mod config;
pub mod scores;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
pub use config::{default_dataset, BappsTestConfig, DatasetOverrides};
pub use scores::{collect_exact, collect_via_backend};
