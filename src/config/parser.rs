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
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Each crawl run records this hash so runs can be traced back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[search]
keywords = ["rust developer", "backend engineer"]
locations = [
    { name = "United States", geo-id = "103644278" },
    { name = "Canada", geo-id = "101174742" },
]
timespan = "r86400"
work-type = "2"
max-pages = 4

[requests]
user-agent = "Mozilla/5.0 (X11; Linux x86_64)"
min-delay-ms = 500
max-delay-ms = 1500

[vpn]
enable = true
path = "/usr/sbin/openvpn"
pool-size = 12
rotation-cadence = 2

[output]
database-path = "./jobs.db"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.search.keywords.len(), 2);
        assert_eq!(config.search.locations[1].geo_id, "101174742");
        assert_eq!(config.search.max_pages, 4);
        assert_eq!(config.search.page_size, 25);
        assert_eq!(config.search.experience, "2");
        assert_eq!(config.requests.timeout_ms, 5_000);
        assert_eq!(config.vpn.pool_size, 12);
        assert_eq!(config.vpn.connect_timeout_secs, 120);
        assert_eq!(config.vpn.shutdown_timeout_secs, 15);
        assert!(config.processing.enable);
        assert!(config.output.logo_dir.is_none());
        assert!(config.api.search_url.contains("seeMoreJobPostings"));
    }

    #[test]
    fn test_vpn_section_is_optional() {
        let content = r#"
[search]
keywords = ["rust"]
locations = [{ name = "Remote", geo-id = "1" }]
timespan = "r604800"
work-type = "2"
max-pages = 1

[requests]
user-agent = "test"
min-delay-ms = 0
max-delay-ms = 0

[processing]
enable = false

[output]
database-path = "./jobs.db"
logo-dir = "./logos"
"#;
        let file = create_temp_config(content);
        let config = load_config(file.path()).unwrap();

        assert!(!config.vpn.enable);
        assert!(!config.processing.enable);
        assert_eq!(config.output.logo_dir.as_deref(), Some("./logos"));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace("min-delay-ms = 500", "min-delay-ms = 5000");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
