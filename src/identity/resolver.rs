//! Public IP lookup used to verify that a rotation rerouted traffic

use crate::config::VpnConfig;
use crate::identity::IdentityError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Resolves the caller's externally visible IP address
///
/// The endpoint must answer with a JSON object of the form `{"ip": "..."}`.
#[derive(Debug, Clone)]
pub struct PublicIpResolver {
    client: Client,
    url: String,
}

impl PublicIpResolver {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Each lookup must see the route in effect right now
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &VpnConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.ip_check_url.clone(), Duration::from_secs(5))
    }

    /// Asks the lookup endpoint for the current public IP
    pub async fn current_ip(&self) -> Result<String, IdentityError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IdentityError::IpLookup(e.to_string()))?;

        let body: IpResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::IpLookup(e.to_string()))?;

        Ok(body.ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_current_ip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ip":"198.51.100.4"}"#))
            .mount(&server)
            .await;

        let resolver =
            PublicIpResolver::new(format!("{}/ip", server.uri()), Duration::from_secs(5)).unwrap();
        assert_eq!(resolver.current_ip().await.unwrap(), "198.51.100.4");
    }

    #[tokio::test]
    async fn test_each_lookup_opens_its_own_connection() {
        let server = crate::test_support::CountingServer::start(r#"{"ip":"198.51.100.4"}"#).await;
        let resolver = PublicIpResolver::new(format!("{}/ip", server.uri), Duration::from_secs(5)).unwrap();

        resolver.current_ip().await.unwrap();
        resolver.current_ip().await.unwrap();

        assert_eq!(server.connections(), 2);
    }

    #[tokio::test]
    async fn test_current_ip_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let resolver =
            PublicIpResolver::new(format!("{}/ip", server.uri()), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            resolver.current_ip().await,
            Err(IdentityError::IpLookup(_))
        ));
    }
}
