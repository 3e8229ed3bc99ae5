use super::PublishError;
use crate::workflows::funnel::report::Report;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const INDEX_FILE: &str = "index.json";

/// Sorted, duplicate-free list of dates that have a stored report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportIndex {
    dates: Vec<NaiveDate>,
}

impl ReportIndex {
    /// Adds `date`, keeping the list sorted. Returns false if it was present.
    pub fn insert(&mut self, date: NaiveDate) -> bool {
        match self.dates.binary_search(&date) {
            Ok(_) => false,
            Err(position) => {
                self.dates.insert(position, date);
                true
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn within(&self, from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates
            .iter()
            .copied()
            .filter(move |date| *date >= from && *date <= to)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl FromIterator<NaiveDate> for ReportIndex {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        let mut index = Self::default();
        for date in iter {
            index.insert(date);
        }
        index
    }
}

/// Flat directory of per-day report files plus `index.json`.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    pub fn dashboard_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!("{}.html", date.format("%Y-%m-%d")))
    }

    /// Writes the report file and records its date in the index.
    pub fn save(&self, report: &Report) -> Result<PathBuf, PublishError> {
        let path = self.report_path(report.date);
        let body = serde_json::to_string_pretty(report).map_err(|source| PublishError::Json {
            path: path.clone(),
            source,
        })?;
        self.write(&path, &body)?;

        let mut index = self.index()?;
        if index.insert(report.date) {
            self.write_index(&index)?;
        }

        debug!(path = %path.display(), indexed = index.len(), "stored report");
        Ok(path)
    }

    pub fn save_dashboard(&self, date: NaiveDate, html: &str) -> Result<PathBuf, PublishError> {
        let path = self.dashboard_path(date);
        self.write(&path, html)?;
        Ok(path)
    }

    pub fn load(&self, date: NaiveDate) -> Result<Report, PublishError> {
        let path = self.report_path(date);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PublishError::NotFound(date));
            }
            Err(source) => return Err(PublishError::Io { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| PublishError::Json { path, source })
    }

    /// Stored reports with dates in `[from, to]`, oldest first.
    pub fn load_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Report>, PublishError> {
        self.index()?
            .within(from, to)
            .map(|date| self.load(date))
            .collect()
    }

    /// Current index; a missing file is an empty index.
    pub fn index(&self) -> Result<ReportIndex, PublishError> {
        let path = self.root.join(INDEX_FILE);
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| PublishError::Json { path, source }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(ReportIndex::default()),
            Err(source) => Err(PublishError::Io { path, source }),
        }
    }

    fn write_index(&self, index: &ReportIndex) -> Result<(), PublishError> {
        let path = self.root.join(INDEX_FILE);
        let body = serde_json::to_string_pretty(index).map_err(|source| PublishError::Json {
            path: path.clone(),
            source,
        })?;
        self.write(&path, &body)
    }

    /// Writes through a sibling temp file so readers never see partial content.
    fn write(&self, path: &Path, contents: &str) -> Result<(), PublishError> {
        let io_error = |source| PublishError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(io_error)?;
        let staging = staging_path(path);
        fs::write(&staging, contents).map_err(io_error)?;
        fs::rename(&staging, path).map_err(io_error)
    }
}

/// `<file>.tmp` next to the target, distinct for every target file name.
fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_os_string();
    staged.push(".tmp");
    PathBuf::from(staged)
}
