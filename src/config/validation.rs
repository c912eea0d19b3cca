use crate::config::types::{
    Config, EnrichmentConfig, FetcherConfig, OutputConfig, SourceConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_enrichment_config(&config.enrichment)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the directory source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if !config.url_template.contains("{partition}") {
        return Err(ConfigError::Validation(format!(
            "url_template must contain a {{partition}} placeholder, got '{}'",
            config.url_template
        )));
    }

    let sample = config.url_template.replace("{partition}", "A");
    let url = Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url_template: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "url_template must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Selector::parse(&config.next_selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("'{}': {:?}", config.next_selector, e))
    })?;

    if let Some(labels) = &config.partitions {
        if labels.is_empty() {
            return Err(ConfigError::Validation(
                "partitions cannot be an empty list".to_string(),
            ));
        }
        for label in labels {
            validate_partition_label(label)?;
        }
    }

    Ok(())
}

/// Partition labels become filenames, so they stay within a safe character set
fn validate_partition_label(label: &str) -> Result<(), ConfigError> {
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "partition label must be non-empty and alphanumeric, got '{}'",
            label
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

/// Validates fetcher retry configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.min_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "min_backoff_ms ({}) cannot exceed max_backoff_ms ({})",
            config.min_backoff_ms, config.max_backoff_ms
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.deadline_secs == Some(0) {
        return Err(ConfigError::Validation(
            "deadline_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates prediction service configuration
fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if let Some(service_url) = &config.service_url {
        Url::parse(service_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid service_url: {}", e)))?;
    }

    if config.no_image_sentinel.is_empty() {
        return Err(ConfigError::Validation(
            "no_image_sentinel cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation("data_dir cannot be empty".to_string()));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
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

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

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
