//! JSON result writer for report artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::ExperimentName;
use crate::WriteError;

/// Writes report artifacts to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// The report is written to `{experiment}_report.json`, wrapped in an
/// envelope carrying the experiment name. The writer takes any
/// `Serialize` payload, so it has no dependency on the model crates.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

#[derive(Serialize)]
struct ReportArtifact<'a, T: Serialize> {
    experiment: &'a str,
    report: &'a T,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, WriteError> {
        fs::create_dir_all(output_dir).map_err(|e| WriteError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the path the report is written to.
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_report.json", self.experiment.as_str()))
    }

    /// Write a report to `{experiment}_report.json` and return its path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`WriteError::Serialize`] | The report cannot be serialized |
    /// | [`WriteError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_report<T: Serialize>(&self, report: &T) -> Result<PathBuf, WriteError> {
        let path = self.report_path();
        let artifact = ReportArtifact {
            experiment: self.experiment.as_str(),
            report,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| WriteError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| WriteError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "report written");
        Ok(path)
    }
}
