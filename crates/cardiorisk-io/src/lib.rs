//! Patient CSV ingestion and JSON result writing for the cardiorisk pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, FEATURE_NAMES, PatientDataset, TARGET_COLUMN};
pub use error::IoError;
pub use reader::PatientReader;
pub use writer::ResultWriter;
