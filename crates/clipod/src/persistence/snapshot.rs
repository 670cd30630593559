use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::PersistError;
use crate::jobs::{Job, JobStore};

const RECORD_EXTENSION: &str = "json";

/// Writes each job as `<dir>/<job_id>.json` and reads them back.
///
/// Records are a backup, not the source of truth: the store is snapshotted
/// when a job reaches a terminal state and once more at shutdown.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    directory: PathBuf,
}

/// Outcome of a full snapshot.
#[derive(Debug, Default)]
pub struct SnapshotReport {
    pub written: usize,
    /// Jobs whose record could not be written, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Outcome of a restore. Skipped records never abort the restore.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped: Vec<PersistError>,
    /// Restored jobs that were still initializing or processing when saved.
    pub unfinished: Vec<String>,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn record_path(&self, job_id: &str) -> Result<PathBuf, PersistError> {
        validate_job_id(job_id)?;
        Ok(self
            .directory
            .join(format!("{}.{}", job_id, RECORD_EXTENSION)))
    }

    fn ensure_directory(&self) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.directory).map_err(|e| PersistError::CreateDirectory {
            path: self.directory.clone(),
            source: e,
        })
    }

    /// Writes one job record. The file is written next to its final name and
    /// renamed into place, so a reader never sees a half-written record.
    pub fn write_job(&self, job: &Job) -> Result<PathBuf, PersistError> {
        let path = self.record_path(&job.job_id)?;
        self.ensure_directory()?;

        let json = serde_json::to_string_pretty(job).map_err(|e| PersistError::Serialize {
            job_id: job.job_id.clone(),
            source: e,
        })?;

        // Unique per write, so concurrent writers of one job never share it
        let tmp_path = self.directory.join(format!(
            "{}.{}.tmp",
            job.job_id,
            Uuid::new_v4().simple()
        ));
        std::fs::write(&tmp_path, json).map_err(|e| PersistError::WriteRecord {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            PersistError::WriteRecord {
                path: path.clone(),
                source: e,
            }
        })?;

        Ok(path)
    }

    /// Deletes a job's record. A record that is already gone is not an error.
    pub fn remove_job(&self, job_id: &str) -> Result<bool, PersistError> {
        let path = self.record_path(job_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PersistError::WriteRecord { path, source: e }),
        }
    }

    /// Writes every job in the store.
    ///
    /// Jobs are copied out first so the store lock is not held during disk IO.
    /// A job that fails to write is reported and does not stop the others.
    pub fn snapshot(&self, store: &JobStore) -> Result<SnapshotReport, PersistError> {
        let jobs = store.all();
        self.ensure_directory()?;

        let mut report = SnapshotReport::default();
        for job in &jobs {
            match self.write_job(job) {
                Ok(_) => report.written += 1,
                Err(e) => {
                    log::error!("Failed to save job {}: {}", job.job_id, e);
                    report.failed.push((job.job_id.clone(), e.to_string()));
                }
            }
        }

        log::debug!(
            "Saved {} job records to {}",
            report.written,
            self.directory.display()
        );
        Ok(report)
    }

    /// Reads every record in the directory into `store`.
    ///
    /// A missing directory means there is no prior state. Records that cannot
    /// be read or parsed, or that carry no job id, are logged and skipped.
    pub fn restore(&self, store: &JobStore) -> Result<RestoreReport, PersistError> {
        let mut report = RestoreReport::default();

        if !self.directory.exists() {
            log::warn!(
                "Status directory {} does not exist, starting empty",
                self.directory.display()
            );
            return Ok(report);
        }

        let entries =
            std::fs::read_dir(&self.directory).map_err(|e| PersistError::ReadDirectory {
                path: self.directory.clone(),
                source: e,
            })?;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    log::error!("Failed to read status directory entry: {}", e);
                    continue;
                }
            };
            if !is_record(&path) {
                continue;
            }

            match read_record(&path) {
                Ok(job) => {
                    if !job.is_terminal() {
                        report.unfinished.push(job.job_id.clone());
                    }
                    store.insert_restored(job);
                    report.restored += 1;
                }
                Err(e) => {
                    log::error!("Skipping job record: {}", e);
                    report.skipped.push(e);
                }
            }
        }

        log::info!(
            "Loaded {} job records from {} ({} skipped)",
            report.restored,
            self.directory.display(),
            report.skipped.len()
        );
        Ok(report)
    }
}

fn is_record(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
}

fn read_record(path: &Path) -> Result<Job, PersistError> {
    let malformed = |reason: String| PersistError::MalformedRecord {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let job: Job = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
    if job.job_id.trim().is_empty() {
        return Err(malformed("record has no job id".to_string()));
    }
    Ok(job)
}

/// Job ids become file and directory names, so they must not escape their
/// parent directory.
pub(crate) fn is_safe_job_id(job_id: &str) -> bool {
    !(job_id.trim().is_empty()
        || job_id == "."
        || job_id == ".."
        || job_id.contains(['/', '\\', '\0']))
}

fn validate_job_id(job_id: &str) -> Result<(), PersistError> {
    if !is_safe_job_id(job_id) {
        return Err(PersistError::InvalidJobId(job_id.to_string()));
    }
    Ok(())
}
