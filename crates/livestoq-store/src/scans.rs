//! Scan history: one pretty-printed JSON file per assessment, keyed by id.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use livestoq_core::ScanAssessment;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::StoreError;

pub struct ScanStore {
    dir: PathBuf,
}

impl ScanStore {
    /// Open (and create if needed) a scan directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an assessment. Records are immutable: saving an id twice fails
    /// with [`StoreError::AlreadyExists`].
    pub fn save(&self, assessment: &ScanAssessment) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&assessment.id)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, assessment)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path).map_err(|e| match e.error.kind() {
            ErrorKind::AlreadyExists => StoreError::AlreadyExists(assessment.id.clone()),
            _ => StoreError::Io(e.error),
        })?;

        debug!(id = %assessment.id, path = %path.display(), "scan saved");
        Ok(path)
    }

    pub fn get(&self, id: &str) -> Result<ScanAssessment, StoreError> {
        let path = self.path_for(id)?;
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All readable assessments, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<ScanAssessment>, StoreError> {
        let mut scans = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path)
                .map_err(StoreError::from)
                .and_then(|b| serde_json::from_slice::<ScanAssessment>(&b).map_err(StoreError::from))
            {
                Ok(scan) => scans.push(scan),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable scan"),
            }
        }
        scans.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(scans)
    }

    /// The most recently created assessment, if any.
    pub fn latest(&self) -> Result<Option<ScanAssessment>, StoreError> {
        Ok(self.list()?.into_iter().next())
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}
