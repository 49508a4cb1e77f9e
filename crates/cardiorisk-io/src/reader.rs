//! CSV patient reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{FEATURE_NAMES, PatientDataset, TARGET_COLUMN};

/// Reads patient attribute rows from a CSV file.
///
/// Expected CSV format:
/// - Header row required, listing the 13 attributes of [`FEATURE_NAMES`] in
///   order, optionally followed by `target`
/// - `age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal[,target]`
/// - One row per patient, all rows must have the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::HeaderMismatch`] | Header differs from the attribute contract |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::InvalidLabel`] | `target` cell is not `0` or `1` |
pub struct PatientReader {
    path: PathBuf,
}

impl PatientReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`PatientDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<PatientDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so short rows surface as InconsistentRowLength, not CsvParse.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let has_target = self.check_header(header)?;
        let expected_cols = FEATURE_NAMES.len() + usize::from(has_target);
        debug!(has_target, "read CSV header");

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(FEATURE_NAMES.len());
            for (raw, column) in record.iter().zip(FEATURE_NAMES) {
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column,
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }
            features.push(row);

            if has_target {
                let raw = record.get(FEATURE_NAMES.len()).unwrap_or("");
                labels.push(self.parse_label(raw, row_index)?);
            }
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_patients = features.len(), labelled = has_target, "patient dataset loaded");

        Ok(PatientDataset::new(features, has_target.then_some(labels)))
    }

    /// Read the file and require a `target` column.
    ///
    /// # Errors
    ///
    /// Every error of [`PatientReader::read`], plus [`IoError::MissingLabels`].
    pub fn read_labelled(&self) -> Result<(Vec<Vec<f64>>, Vec<usize>), IoError> {
        let dataset = self.read()?;
        let labels = dataset
            .labels()
            .ok_or_else(|| IoError::MissingLabels {
                path: self.path.clone(),
            })?
            .to_vec();
        Ok((dataset.features().to_vec(), labels))
    }

    /// Returns whether the header carries a trailing `target` column.
    fn check_header(&self, header: &csv::StringRecord) -> Result<bool, IoError> {
        let names: Vec<&str> = header.iter().collect();
        let has_target = names.len() == FEATURE_NAMES.len() + 1
            && names.last().is_some_and(|n| n.eq_ignore_ascii_case(TARGET_COLUMN));
        let attributes = if has_target {
            &names[..FEATURE_NAMES.len()]
        } else {
            &names[..]
        };

        let matches = attributes.len() == FEATURE_NAMES.len()
            && attributes
                .iter()
                .zip(FEATURE_NAMES)
                .all(|(got, want)| got.eq_ignore_ascii_case(want));
        if !matches {
            return Err(IoError::HeaderMismatch {
                path: self.path.clone(),
                expected: FEATURE_NAMES.join(","),
                got: names.join(","),
            });
        }
        Ok(has_target)
    }

    fn parse_label(&self, raw: &str, row_index: usize) -> Result<usize, IoError> {
        match raw.parse::<f64>() {
            Ok(v) if v == 0.0 => Ok(0),
            Ok(v) if v == 1.0 => Ok(1),
            _ => Err(IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw.to_string(),
            }),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_labelled_rows() {
        let csv = format!(
            "{HEADER},target\n63,1,3,145,233,1,0,150,0,2.3,0,0,6,1\n67,1,0,160,286,0,0,108,1,1.5,1,3,3,0\n"
        );
        let f = write_csv(&csv);
        let ds = PatientReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.labels(), Some(&[1, 0][..]));
        assert_eq!(ds.features()[0].len(), 13);
        assert!((ds.features()[0][9] - 2.3).abs() < f64::EPSILON);
    }

    #[test]
    fn read_unlabelled_rows() {
        let csv = format!("{HEADER}\n63,1,3,145,233,1,0,150,0,2.3,0,0,6\n");
        let f = write_csv(&csv);
        let ds = PatientReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_samples(), 1);
        assert!(ds.labels().is_none());
        assert!(matches!(
            PatientReader::new(f.path()).read_labelled(),
            Err(IoError::MissingLabels { .. })
        ));
    }

    #[test]
    fn reordered_header_rejected() {
        let csv = "sex,age,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal\n1,63,3,145,233,1,0,150,0,2.3,0,0,6\n";
        let f = write_csv(csv);
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::HeaderMismatch { .. }));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv(&format!("{HEADER},target\n"));
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let csv = format!("{HEADER},target\n63,1,3,145,233,1,0,150,0,2.3,0,0,6\n");
        let f = write_csv(&csv);
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength { expected: 14, got: 13, .. }
        ));
    }

    #[test]
    fn non_finite_value_names_column() {
        let csv = format!("{HEADER}\n63,1,3,145,NaN,1,0,150,0,2.3,0,0,6\n");
        let f = write_csv(&csv);
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { column: "chol", .. }));
    }

    #[test]
    fn invalid_label_error() {
        let csv = format!("{HEADER},target\n63,1,3,145,233,1,0,150,0,2.3,0,0,6,2\n");
        let f = write_csv(&csv);
        let err = PatientReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InvalidLabel { row_index: 0, .. }));
    }

    #[test]
    fn missing_file_error() {
        let err = PatientReader::new(Path::new("/nonexistent/heart.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
