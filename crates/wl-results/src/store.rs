//! Run storage API.
//!
//! Layout per run:
//! ```text
//! <root>/<run_id>/manifest.json
//!                 Summary_<k>.json
//!                 Run_<k>.csv  Leaks_<k>.csv  HeatMap_<k>.csv  NearOptima_<k>.csv
//!                 Error.csv
//! ```

use crate::types::{ErrorRow, IterationReport, IterationSummary, RunManifest};
use crate::{ResultsError, ResultsResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

/// A report file group that could not be written.
#[derive(Debug)]
pub struct SaveFailure {
    /// `iteration <k>` or `error table`
    pub what: String,
    pub error: ResultsError,
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> ResultsResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> ResultsResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store rooted at `output_dir`, resolved against the project file's directory.
    pub fn for_project(project_path: &Path, output_dir: &str) -> ResultsResult<Self> {
        let out = Path::new(output_dir);
        if out.is_absolute() {
            return Self::new(out.to_path_buf());
        }
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "project path has no parent directory".to_string(),
            })?;
        Self::new(project_dir.join(out))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn create_run(&self, run_id: &str) -> ResultsResult<PathBuf> {
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn save_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        let dir = self.create_run(&manifest.run_id)?;
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(dir.join("manifest.json"), json)?;
        Ok(())
    }

    /// Write the summary and tables of iteration `k`.
    ///
    /// `NearOptima_k.csv` is only written when the table is non-empty.
    pub fn save_iteration(&self, run_id: &str, report: &IterationReport) -> ResultsResult<()> {
        let dir = self.create_run(run_id)?;
        let k = report.summary.iteration;

        let json = serde_json::to_string_pretty(&report.summary)?;
        fs::write(dir.join(format!("Summary_{k}.json")), json)?;
        write_csv(&dir.join(format!("Run_{k}.csv")), &report.estimates)?;
        write_csv(&dir.join(format!("Leaks_{k}.csv")), &report.summary.demand)?;
        write_csv(&dir.join(format!("HeatMap_{k}.csv")), &report.heat_map)?;
        if !report.near_optima.is_empty() {
            write_csv(&dir.join(format!("NearOptima_{k}.csv")), &report.near_optima)?;
        }
        Ok(())
    }

    pub fn save_errors(&self, run_id: &str, rows: &[ErrorRow]) -> ResultsResult<()> {
        let dir = self.create_run(run_id)?;
        write_csv(&dir.join("Error.csv"), rows)
    }

    /// Write a whole run: manifest, every iteration, then the error table.
    ///
    /// Only a failed manifest write is an error. Later failures are
    /// collected and the remaining files are still written.
    pub fn save_run(
        &self,
        manifest: &RunManifest,
        iterations: &[IterationReport],
        errors: &[ErrorRow],
    ) -> ResultsResult<Vec<SaveFailure>> {
        self.save_manifest(manifest)?;
        let mut failures = Vec::new();
        for report in iterations {
            if let Err(error) = self.save_iteration(&manifest.run_id, report) {
                failures.push(SaveFailure {
                    what: format!("iteration {}", report.summary.iteration),
                    error,
                });
            }
        }
        if let Err(error) = self.save_errors(&manifest.run_id, errors) {
            failures.push(SaveFailure {
                what: "error table".to_string(),
                error,
            });
        }
        Ok(failures)
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_summary(&self, run_id: &str, iteration: usize) -> ResultsResult<IterationSummary> {
        let path = self.run_dir(run_id).join(format!("Summary_{iteration}.json"));
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_errors(&self, run_id: &str) -> ResultsResult<Vec<ErrorRow>> {
        let path = self.run_dir(run_id).join("Error.csv");
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        read_csv(&path)
    }

    /// Every run with a readable manifest, oldest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id) {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
