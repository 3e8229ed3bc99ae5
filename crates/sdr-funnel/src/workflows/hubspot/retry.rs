use std::fmt;
use std::time::Duration;

/// Why a CRM call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Timeout,
    Connection,
    /// HTTP 429, with the server's `Retry-After` seconds when it sent one.
    RateLimited { retry_after: Option<u64> },
}

impl FailureClass {
    /// Classifies a transport error. Anything other than a timeout or a
    /// connection failure is not retried.
    pub fn from_transport(error: &reqwest::Error) -> Option<Self> {
        if error.is_timeout() {
            Some(Self::Timeout)
        } else if error.is_connect() {
            Some(Self::Connection)
        } else {
            None
        }
    }

    pub fn rate_limited(retry_after: Option<&str>) -> Self {
        Self::RateLimited {
            retry_after: retry_after.and_then(|raw| raw.trim().parse().ok()),
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connection => f.write_str("connection error"),
            Self::RateLimited { .. } => f.write_str("rate limited"),
        }
    }
}

/// Bounded retry schedule for CRM requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout_wait: Duration,
    pub connection_wait: Duration,
    /// Minimum wait after a 429, also used when `Retry-After` is missing.
    pub rate_limit_floor: Duration,
    /// Pause between consecutive search pages.
    pub page_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            timeout_wait: Duration::from_secs(10),
            connection_wait: Duration::from_secs(15),
            rate_limit_floor: Duration::from_secs(30),
            page_pause: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Zero waits, for tests and offline replays.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout_wait: Duration::ZERO,
            connection_wait: Duration::ZERO,
            rate_limit_floor: Duration::ZERO,
            page_pause: Duration::ZERO,
        }
    }

    pub fn wait_for(&self, failure: FailureClass) -> Duration {
        match failure {
            FailureClass::Timeout => self.timeout_wait,
            FailureClass::Connection => self.connection_wait,
            FailureClass::RateLimited { retry_after } => retry_after
                .map(Duration::from_secs)
                .unwrap_or(self.rate_limit_floor)
                .max(self.rate_limit_floor),
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
