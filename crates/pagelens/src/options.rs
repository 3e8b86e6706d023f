// ABOUTME: Configuration for the pagelens engine: EngineOptions and the fluent EngineBuilder.
// ABOUTME: EngineBuilder assembles an Engine with a page backend, registry and request policy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{Browser, HttpBrowser};
use crate::error::PageError;
use crate::orchestrator::Engine;
use crate::site::SiteRegistry;

/// Default navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent sent by the HTTP backend.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; pagelens/0.1)";

/// Configuration options for the engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound on navigation, enforced around every `goto`.
    pub navigation_timeout: Duration,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
    /// Responses larger than this are refused by the HTTP backend.
    pub max_content_length: usize,
    pub http_client: Option<reqwest::Client>,
    pub registry: Option<SiteRegistry>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HashMap::new(),
            allow_private_networks: false,
            max_content_length: crate::browser::http::MAX_CONTENT_LENGTH,
            http_client: None,
            registry: None,
        }
    }
}

/// Builder for constructing [`Engine`] instances with custom configuration.
#[derive(Clone, Default)]
pub struct EngineBuilder {
    opts: EngineOptions,
    browser: Option<Arc<dyn Browser>>,
}

impl EngineBuilder {
    /// Create a new EngineBuilder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the navigation timeout.
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.opts.navigation_timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Set the maximum accepted response size in bytes.
    pub fn max_content_length(mut self, bytes: usize) -> Self {
        self.opts.max_content_length = bytes;
        self
    }

    /// Use a custom HTTP client for the default backend.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Use a custom site registry instead of the built-in profiles.
    pub fn registry(mut self, registry: SiteRegistry) -> Self {
        self.opts.registry = Some(registry);
        self
    }

    /// Use a specific page backend instead of the static HTTP one.
    pub fn browser(mut self, browser: Arc<dyn Browser>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// The options collected so far.
    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    /// Build the Engine with the configured options.
    pub fn build(self) -> Result<Engine, PageError> {
        let browser: Arc<dyn Browser> = match self.browser {
            Some(browser) => browser,
            None => Arc::new(HttpBrowser::new(&self.opts)?),
        };
        Ok(Engine::new(self.opts, browser))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = EngineOptions::default();
        assert_eq!(opts.navigation_timeout, Duration::from_secs(30));
        assert!(!opts.allow_private_networks);
        assert_eq!(opts.max_content_length, 10 * 1024 * 1024);
        assert!(opts.registry.is_none());
    }

    #[test]
    fn builder_collects_options() {
        let builder = EngineBuilder::new()
            .navigation_timeout(Duration::from_secs(5))
            .user_agent("test-agent")
            .header("Accept-Language", "ja")
            .allow_private_networks(true)
            .max_content_length(1024);
        let opts = builder.options();
        assert_eq!(opts.navigation_timeout, Duration::from_secs(5));
        assert_eq!(opts.user_agent, "test-agent");
        assert_eq!(opts.headers.get("Accept-Language").map(String::as_str), Some("ja"));
        assert!(opts.allow_private_networks);
        assert_eq!(opts.max_content_length, 1024);
    }

    #[test]
    fn build_uses_http_backend_by_default() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.backend_name(), "http");
    }
}
