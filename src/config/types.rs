use crate::score::ScoringTable;
use crate::CragError;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable holding the site account name
pub const USERNAME_ENV: &str = "CRAG_LEADER_USERNAME";

/// Environment variable holding the site account password
pub const PASSWORD_ENV: &str = "CRAG_LEADER_PASSWORD";

/// Main configuration structure for Crag-Leader
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub scoring: ScoringTable,
}

/// Where the crag lives on the remote site
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Crag page, e.g. `https://27crags.com/crags/inia-droushia/`
    #[serde(rename = "crag-url")]
    pub crag_url: String,

    /// Login form page
    #[serde(rename = "login-url")]
    pub login_url: String,
}

impl SourceConfig {
    /// Short crag name derived from the last path segment of the crag URL
    pub fn crag_name(&self) -> String {
        self.crag_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between any two outbound requests (milliseconds)
    #[serde(rename = "min-request-interval")]
    pub min_request_interval: u64,

    /// Attempts per request before the request is reported as failed
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Wait before retrying a failed request (milliseconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: u64,

    /// Wait before re-running the whole pipeline after a failure (milliseconds)
    #[serde(rename = "pipeline-retry-delay", default = "default_pipeline_retry_delay")]
    pub pipeline_retry_delay: u64,
}

fn default_pipeline_retry_delay() -> u64 {
    5_000
}

impl CrawlerConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    pub fn pipeline_retry_delay(&self) -> Duration {
        Duration::from_millis(self.pipeline_retry_delay)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown leaderboard file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// Site account used for the authenticated session
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Reads the credentials from the environment
    pub fn from_env() -> Result<Self, CragError> {
        let read = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CragError::Auth(format!("{} is not set", key)))
        };

        Ok(Self {
            username: read(USERNAME_ENV)?,
            password: read(PASSWORD_ENV)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crag_name_from_url() {
        let source = SourceConfig {
            crag_url: "https://27crags.com/crags/inia-droushia/".to_string(),
            login_url: "https://27crags.com/login".to_string(),
        };
        assert_eq!(source.crag_name(), "inia-droushia");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }
}
