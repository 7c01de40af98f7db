use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::ResultRecord;

/// Ordered result records, keyed by final URL.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: Vec<ResultRecord>,
}

impl ResultStore {
    /// Read the store from `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No store at {:?}, starting empty", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<ResultRecord> =
            serde_json::from_str(&content).map_err(|source| AppError::CorruptStore {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Loaded {} records from {:?}", records.len(), path);
        Ok(Self { records })
    }

    /// Replace the first record with the same `link`, or append.
    pub fn upsert(&mut self, record: ResultRecord) {
        match self.records.iter_mut().find(|r| r.link == record.link) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn contains_tracking_link(&self, tracking_link: &str) -> bool {
        self.records.iter().any(|r| r.google_link == tracking_link)
    }

    /// Overwrite `path` with the whole record set.
    ///
    /// Writes a sibling temp file first and renames it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.records)?;
        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        std::fs::write(tmp_path, content)?;
        std::fs::rename(tmp_path, path)?;
        Ok(())
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ResultRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
