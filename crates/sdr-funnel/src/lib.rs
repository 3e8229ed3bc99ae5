//! Daily SDR funnel reporting: stage-conversion aggregation over CRM deals,
//! plus the retrieval, persistence and rendering around it.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

pub use config::AppConfig;
pub use error::AppError;
