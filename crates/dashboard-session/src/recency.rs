//! Recently-viewed instrument log. Best-effort JSON file in the
//! platform data directory; a missing or corrupted file reads as an
//! empty log, never an error.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use dashboard_core::{DashboardError, RecencyEntry};

const MAX_ENTRIES: usize = 10;

pub struct RecencyLog {
    path: PathBuf,
    entries: Vec<RecencyEntry>,
}

impl RecencyLog {
    /// Load the log at `path`, starting empty when the file is absent
    /// or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("Recency log unreadable, starting empty: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, entries }
    }

    /// Default location under the platform data directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("marketdesk").join("recent.json"))
    }

    /// Note a visit: dedup by code, newest first, bounded length.
    pub fn record(&mut self, code: &str, name: &str) -> Result<(), DashboardError> {
        self.entries.retain(|e| e.code != code);
        self.entries.insert(
            0,
            RecencyEntry {
                code: code.to_string(),
                name: name.to_string(),
                observed_at: Utc::now(),
            },
        );
        self.entries.truncate(MAX_ENTRIES);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), DashboardError> {
        self.entries.clear();
        self.persist()
    }

    pub fn entries(&self) -> &[RecencyEntry] {
        &self.entries
    }

    fn persist(&self) -> Result<(), DashboardError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DashboardError::Storage(e.to_string()))?;
        }
        let raw = serde_json::to_string(&self.entries)
            .map_err(|e| DashboardError::Storage(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| DashboardError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_in(dir: &tempfile::TempDir) -> RecencyLog {
        RecencyLog::open(dir.path().join("recent.json"))
    }

    #[test]
    fn revisit_moves_the_entry_to_the_front() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = log_in(&dir);

        log.record("A", "A Corp").unwrap();
        log.record("B", "B Corp").unwrap();
        log.record("A", "A Corp").unwrap();

        let codes: Vec<&str> = log.entries().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }

    #[test]
    fn log_is_bounded_to_ten_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = log_in(&dir);

        for i in 0..12 {
            log.record(&format!("C{:02}", i), "Corp").unwrap();
        }

        assert_eq!(log.entries().len(), 10);
        // Oldest two fell off
        assert_eq!(log.entries()[0].code, "C11");
        assert_eq!(log.entries()[9].code, "C02");
    }

    #[test]
    fn entries_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent.json");

        let mut log = RecencyLog::open(&path);
        log.record("005930", "Samsung Electronics").unwrap();
        drop(log);

        let reloaded = RecencyLog::open(&path);
        assert_eq!(reloaded.entries().len(), 1);
        assert_eq!(reloaded.entries()[0].code, "005930");
    }

    #[test]
    fn corrupted_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent.json");
        fs::write(&path, "{not json").unwrap();

        let log = RecencyLog::open(&path);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn clear_empties_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent.json");

        let mut log = RecencyLog::open(&path);
        log.record("A", "A Corp").unwrap();
        log.clear().unwrap();
        assert!(log.entries().is_empty());

        let reloaded = RecencyLog::open(&path);
        assert!(reloaded.entries().is_empty());
    }
}
