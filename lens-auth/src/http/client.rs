//! HTTP client builder for token endpoint requests.

use std::time::Duration;

use reqwest::redirect::Policy;

use crate::error::Error;

/// Settings for token endpoint requests.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Total time allowed for one exchange or refresh request.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("lens-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for the HTTP client shared by the token manager and the authenticator.
///
/// Requests are sent exactly once and redirects are never followed, so a form
/// carrying a code or refresh token only reaches the configured endpoint.
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.config.connect_timeout = connect_timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    pub fn build(self) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .user_agent(self.config.user_agent)
            .redirect(Policy::none())
            .build()?;
        Ok(client)
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = HttpClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(30));
        assert!(builder.config.user_agent.starts_with("lens-auth/"));
    }

    #[test]
    fn test_builder_overrides() {
        let builder = HttpClientBuilder::new()
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(1))
            .with_user_agent("lens-test".to_string());
        assert_eq!(builder.config.timeout, Duration::from_secs(5));
        assert_eq!(builder.config.connect_timeout, Duration::from_secs(1));
        assert_eq!(builder.config.user_agent, "lens-test");
    }

    #[tokio::test]
    async fn test_token_endpoint_redirect_is_not_followed() {
        let mut server = mockito::Server::new_async().await;
        let _redirect = server
            .mock("POST", "/token")
            .with_status(307)
            .with_header("location", "/elsewhere")
            .create_async()
            .await;
        let elsewhere = server
            .mock("POST", "/elsewhere")
            .expect(0)
            .create_async()
            .await;

        let client = HttpClientBuilder::new().build().unwrap();
        let response = client
            .post(format!("{}/token", server.url()))
            .form(&[("grant_type", "refresh_token")])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 307);
        elsewhere.assert_async().await;
    }
}
