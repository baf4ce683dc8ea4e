use crate::config::types::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};
use crate::score::{Combine, ScoringTable};
use crate::ConfigError;
use url::Url;

/// Courtesy ceiling: never more than one request per second
const MIN_REQUEST_INTERVAL_MS: u64 = 1_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_scoring_table(&config.scoring)?;
    Ok(())
}

/// Validates the remote source URLs
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    for (field, value) in [("crag-url", &config.crag_url), ("login-url", &config.login_url)] {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "{} '{}' must use an HTTP(S) scheme",
                field, value
            )));
        }
    }

    if config.crag_name().is_empty() {
        return Err(ConfigError::Validation(format!(
            "crag-url '{}' does not name a crag",
            config.crag_url
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.min_request_interval < MIN_REQUEST_INTERVAL_MS {
        return Err(ConfigError::Validation(format!(
            "min-request-interval must be >= {}ms, got {}ms",
            MIN_REQUEST_INTERVAL_MS, config.min_request_interval
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the scoring table
fn validate_scoring_table(table: &ScoringTable) -> Result<(), ConfigError> {
    if table.base_points.is_empty() {
        return Err(ConfigError::Validation(
            "scoring.base-points must list at least one grade".to_string(),
        ));
    }

    if let Some(grade) = table.base_points.keys().find(|g| g.as_str().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "scoring.base-points contains an empty grade: {:?}",
            grade
        )));
    }

    for (ascent_type, modifier) in &table.modifiers {
        if !modifier.is_finite() {
            return Err(ConfigError::Validation(format!(
                "scoring.modifiers.{} must be a number, got {}",
                ascent_type, modifier
            )));
        }
        // Additive modifiers may be penalties; multipliers may not flip signs
        if table.combine == Combine::Multiply && *modifier < 0.0 {
            return Err(ConfigError::Validation(format!(
                "scoring.modifiers.{} must be non-negative when multiplying, got {}",
                ascent_type, modifier
            )));
        }
    }

    if table.volume.bonus_increment < 1 {
        return Err(ConfigError::Validation(format!(
            "scoring.volume.bonus-increment must be >= 1, got {}",
            table.volume.bonus_increment
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
