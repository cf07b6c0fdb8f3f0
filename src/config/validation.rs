use crate::config::types::{
    CleaningConfig, Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig,
};
use crate::source::{UrlTemplate, MAX_IDENTIFIER};
use crate::ConfigError;
use url::Url;

/// Largest worker pool accepted
pub const MAX_WORKERS: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_cleaning_config(&config.cleaning)?;
    Ok(())
}

/// Validates the identifier range and URL template
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.start_id >= config.end_id {
        return Err(ConfigError::Validation(format!(
            "start_id must be below end_id, got [{}, {})",
            config.start_id, config.end_id
        )));
    }

    if config.end_id > MAX_IDENTIFIER {
        return Err(ConfigError::Validation(format!(
            "end_id must be at most {}, got {}",
            MAX_IDENTIFIER, config.end_id
        )));
    }

    UrlTemplate::parse(&config.base_url_template)
        .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.worker_count < 1 || config.worker_count > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and {}, got {}",
            MAX_WORKERS, config.worker_count
        )));
    }

    if config.request_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 100ms, got {}ms",
            config.request_timeout
        )));
    }

    if config.flush_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "flush_interval must be >= 1, got {}",
            config.flush_interval
        )));
    }

    if config.tombstone_after == Some(0) {
        return Err(ConfigError::Validation(
            "tombstone_after must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dataset_path.is_empty() {
        return Err(ConfigError::Validation(
            "dataset_path cannot be empty".to_string(),
        ));
    }

    if config.ledger_path.is_empty() {
        return Err(ConfigError::Validation(
            "ledger_path cannot be empty".to_string(),
        ));
    }

    if config.dataset_path == config.ledger_path {
        return Err(ConfigError::Validation(
            "dataset_path and ledger_path must differ".to_string(),
        ));
    }

    Ok(())
}

fn validate_cleaning_config(config: &CleaningConfig) -> Result<(), ConfigError> {
    if config.cleaned_path.is_empty() {
        return Err(ConfigError::Validation(
            "cleaned_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
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
