use crate::config::types::{ApiConfig, Config, OutputConfig, RequestsConfig, SearchConfig, VpnConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_requests_config(&config.requests)?;
    validate_vpn_config(&config.vpn)?;
    validate_output_config(&config.output)?;
    validate_api_config(&config.api)?;
    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.keywords.is_empty() {
        return Err(ConfigError::Validation(
            "search.keywords must contain at least one keyword".to_string(),
        ));
    }

    if config.keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "search.keywords cannot contain empty keywords".to_string(),
        ));
    }

    if config.locations.is_empty() {
        return Err(ConfigError::Validation(
            "search.locations must contain at least one location".to_string(),
        ));
    }

    for location in &config.locations {
        if location.name.is_empty() || location.geo_id.is_empty() {
            return Err(ConfigError::Validation(format!(
                "location '{}' must have both a name and a geo-id",
                location.name
            )));
        }
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    // The offset of the last page must fit the `start` query parameter
    if (config.max_pages - 1).checked_mul(config.page_size).is_none() {
        return Err(ConfigError::Validation(format!(
            "max_pages ({}) times page_size ({}) is out of range",
            config.max_pages, config.page_size
        )));
    }

    Ok(())
}

/// Validates request configuration
fn validate_requests_config(config: &RequestsConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "timeout_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates VPN configuration; only checked when the VPN is enabled
fn validate_vpn_config(config: &VpnConfig) -> Result<(), ConfigError> {
    if !config.enable {
        return Ok(());
    }

    if config.path.is_empty() {
        return Err(ConfigError::Validation("vpn.path cannot be empty".to_string()));
    }

    if config.pool_size < 1 {
        return Err(ConfigError::Validation(format!(
            "pool_size must be >= 1, got {}",
            config.pool_size
        )));
    }

    if config.rotation_cadence < 1 {
        return Err(ConfigError::Validation(format!(
            "rotation_cadence must be >= 1, got {}",
            config.rotation_cadence
        )));
    }

    if !config.config_pattern.contains("{n}") {
        return Err(ConfigError::Validation(format!(
            "config_pattern '{}' must contain the {{n}} placeholder",
            config.config_pattern
        )));
    }

    if config.connect_timeout_secs < 1 || config.shutdown_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "vpn timeouts must be >= 1 second".to_string(),
        ));
    }

    parse_http_url("ip_check_url", &config.ip_check_url)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.logo_dir.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "logo_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site endpoints
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    parse_http_url("search_url", &config.search_url)?;
    parse_http_url("detail_url", &config.detail_url)?;
    parse_http_url("view_url", &config.view_url)?;
    Ok(())
}

fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requests(min: u64, max: u64) -> RequestsConfig {
        RequestsConfig {
            user_agent: "test".to_string(),
            min_delay_ms: min,
            max_delay_ms: max,
            timeout_ms: 5_000,
        }
    }

    #[test]
    fn test_page_offsets_must_fit() {
        let valid = SearchConfig {
            keywords: vec!["rust".to_string()],
            locations: vec![crate::config::types::SearchLocation {
                name: "United States".to_string(),
                geo_id: "103644278".to_string(),
            }],
            experience: "2".to_string(),
            timespan: "r86400".to_string(),
            work_type: "2".to_string(),
            max_pages: 40,
            page_size: 25,
        };
        assert!(validate_search_config(&valid).is_ok());

        let huge = SearchConfig {
            max_pages: u32::MAX,
            page_size: 25,
            ..valid
        };
        assert!(matches!(
            validate_search_config(&huge),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_delay_window_must_be_ordered() {
        assert!(validate_requests_config(&requests(0, 0)).is_ok());
        assert!(validate_requests_config(&requests(100, 900)).is_ok());
        assert!(validate_requests_config(&requests(900, 100)).is_err());
    }

    #[test]
    fn test_disabled_vpn_is_not_validated() {
        let config = VpnConfig {
            pool_size: 0,
            ..VpnConfig::default()
        };
        assert!(validate_vpn_config(&config).is_ok());
    }

    #[test]
    fn test_enabled_vpn_requirements() {
        let valid = VpnConfig {
            enable: true,
            ..VpnConfig::default()
        };
        assert!(validate_vpn_config(&valid).is_ok());

        let no_pool = VpnConfig {
            pool_size: 0,
            ..valid.clone()
        };
        assert!(validate_vpn_config(&no_pool).is_err());

        let no_placeholder = VpnConfig {
            config_pattern: "server.ovpn".to_string(),
            ..valid.clone()
        };
        assert!(validate_vpn_config(&no_placeholder).is_err());

        let bad_ip_url = VpnConfig {
            ip_check_url: "ftp://example.com".to_string(),
            ..valid
        };
        assert!(matches!(
            validate_vpn_config(&bad_ip_url),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_api_urls() {
        assert!(validate_api_config(&ApiConfig::default()).is_ok());

        let broken = ApiConfig {
            detail_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        assert!(validate_api_config(&broken).is_err());
    }
}
