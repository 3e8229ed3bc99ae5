use crate::workflows::funnel::domain::{RepExclusions, StageTable};
use chrono::NaiveDate;
use secrecy::SecretString;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_PIPELINE_ID: &str = "194381550";
pub const DEFAULT_EXCLUDED_REPS: &str = "Damian Jagusiak";
const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the dashboard tooling.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub hubspot: HubSpotConfig,
    pub pipeline: PipelineConfig,
    pub reports: ReportConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let api_token = non_blank("HUBSPOT_API_TOKEN").map(SecretString::from);
        let base_url =
            non_blank("HUBSPOT_BASE_URL").unwrap_or_else(|| DEFAULT_HUBSPOT_BASE_URL.to_string());
        let max_attempts = match non_blank("HUBSPOT_MAX_ATTEMPTS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .ok_or(ConfigError::InvalidMaxAttempts)?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let pipeline_id =
            non_blank("SDR_PIPELINE_ID").unwrap_or_else(|| DEFAULT_PIPELINE_ID.to_string());
        let excluded_reps = parse_excluded_reps(
            &env::var("SDR_EXCLUDED_REPS").unwrap_or_else(|_| DEFAULT_EXCLUDED_REPS.to_string()),
        );

        let data_dir = non_blank("REPORT_DATA_DIR").unwrap_or_else(|| "data".to_string());
        let report_date = non_blank("REPORT_DATE")
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|source| ConfigError::InvalidReportDate { value: raw, source })
            })
            .transpose()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            hubspot: HubSpotConfig {
                api_token,
                base_url,
                max_attempts,
            },
            pipeline: PipelineConfig {
                pipeline_id,
                excluded_reps,
                stages: StageTable::sdr_pipeline(),
            },
            reports: ReportConfig {
                data_dir: PathBuf::from(data_dir),
                report_date,
            },
        })
    }
}

fn non_blank(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Comma-separated rep display names; blanks are dropped.
pub fn parse_excluded_reps(raw: &str) -> RepExclusions {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// HubSpot API access. The token stays optional so offline commands work
/// without credentials.
#[derive(Clone)]
pub struct HubSpotConfig {
    pub api_token: Option<SecretString>,
    pub base_url: String,
    pub max_attempts: u32,
}

impl fmt::Debug for HubSpotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSpotConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Which pipeline to report on and whose deals to leave out.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pipeline_id: String,
    pub excluded_reps: RepExclusions,
    pub stages: StageTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline_id: DEFAULT_PIPELINE_ID.to_string(),
            excluded_reps: parse_excluded_reps(DEFAULT_EXCLUDED_REPS),
            stages: StageTable::sdr_pipeline(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub data_dir: PathBuf,
    pub report_date: Option<NaiveDate>,
}

impl ReportConfig {
    /// `REPORT_DATE` when set, otherwise the day before `today`.
    pub fn report_date_or_yesterday(&self, today: NaiveDate) -> NaiveDate {
        self.report_date
            .or_else(|| today.pred_opt())
            .unwrap_or(today)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidMaxAttempts,
    InvalidReportDate {
        value: String,
        source: chrono::ParseError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMaxAttempts => {
                write!(f, "HUBSPOT_MAX_ATTEMPTS must be a positive integer")
            }
            ConfigError::InvalidReportDate { value, .. } => {
                write!(f, "REPORT_DATE '{}' must be formatted as YYYY-MM-DD", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidMaxAttempts => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidReportDate { source, .. } => Some(source),
        }
    }
}
