use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use directory_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Data dir: {}", config.output.data_dir);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Loads a configuration and the hash recorded with each run
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    let hash = config_hash(&content)?;
    Ok((config, hash))
}

fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Sections whose values change what a run collects
const HASHED_SECTIONS: [&str; 3] = ["source", "fetcher", "enrichment"];

/// Hex SHA-256 over the collection-relevant sections of a TOML document
///
/// Tables are hashed in parsed form, so comments, layout and key order do not
/// matter. Moving output paths or changing the contact details keeps the hash,
/// which lets runs over relocated data be compared.
pub fn config_hash(content: &str) -> Result<String, ConfigError> {
    let document: toml::Table = toml::from_str(content)?;

    let mut hasher = Sha256::new();
    for section in HASHED_SECTIONS {
        hasher.update(section.as_bytes());
        hasher.update(b"=");
        if let Some(value) = document.get(section) {
            hasher.update(value.to_string().as_bytes());
        }
        hasher.update(b"\n");
    }

    Ok(hex::encode(hasher.finalize()))
}
