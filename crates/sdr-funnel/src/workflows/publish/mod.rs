mod html;
mod store;
mod table;

pub use html::render_dashboard;
pub use store::{ReportIndex, ReportStore};
pub use table::write_rep_csv;

use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("no report stored for {0}")]
    NotFound(NaiveDate),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid report JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to render dashboard: {0}")]
    Template(#[from] askama::Error),
}
