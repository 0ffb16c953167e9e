use crate::governor::RateGovernor;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.brawlstars.com/v1";
pub const DEFAULT_CONSTANTS_URL: &str = "https://fourjr.herokuapp.com/bs/constants/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(180);
/// 3 requests a second for the whole TTL.
pub const DEFAULT_CACHE_CAPACITY: usize = 540;

/// How the API key is sent in the `Authorization` header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    #[default]
    Bearer,
    /// `Authorization: <key>`
    Raw,
}

/// What to do when the rate limit says the next request has to wait.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBehavior {
    /// Sleep until a request is allowed again.
    #[default]
    Wait,
    /// Return [`Error::RateLimited`] right away.
    Fail,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub constants_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub auth_scheme: AuthScheme,
    pub cache_ttl: Duration,
    /// Zero disables the cache.
    pub cache_capacity: usize,
    /// Read the letter `O` in tags as the digit `0`.
    pub normalize_letter_o: bool,
    /// Send tags as `%23TAG` rather than `TAG` in URL paths.
    pub escape_tag_prefix: bool,
    pub rate_limit_behavior: RateLimitBehavior,
    pub governor: Option<Arc<dyn RateGovernor>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            constants_url: DEFAULT_CONSTANTS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("brawl-sdk/{} (Rust)", env!("CARGO_PKG_VERSION")),
            auth_scheme: AuthScheme::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            normalize_letter_o: true,
            escape_tag_prefix: true,
            rate_limit_behavior: RateLimitBehavior::default(),
            governor: None,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<()> {
        for url in [&self.base_url, &self.constants_url] {
            reqwest::Url::parse(url)
                .map_err(|e| Error::InvalidArgument(format!("invalid URL '{}': {}", url, e)))?;
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidArgument("timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Configures a [`crate::Client`] or a [`crate::blocking::Client`].
pub struct ClientBuilder {
    api_key: String,
    config: Config,
    session: Option<reqwest::Client>,
    blocking_session: Option<reqwest::blocking::Client>,
}

impl ClientBuilder {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            config: Config::default(),
            session: None,
            blocking_session: None,
        }
    }

    /// Replace the whole configuration at once.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Per request timeout.
    ///
    /// Defaults to 30 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn constants_url(mut self, constants_url: &str) -> Self {
        self.config.constants_url = constants_url.to_string();
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.config.user_agent = user_agent.to_string();
        self
    }

    pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.config.auth_scheme = scheme;
        self
    }

    /// Reuse an existing async session instead of opening a new one.
    pub fn session(mut self, session: reqwest::Client) -> Self {
        self.session = Some(session);
        self
    }

    /// Reuse an existing blocking session instead of opening a new one.
    pub fn blocking_session(mut self, session: reqwest::blocking::Client) -> Self {
        self.blocking_session = Some(session);
        self
    }

    /// Defaults to 180 seconds
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Defaults to 540 entries, 0 turns the cache off
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn normalize_letter_o(mut self, enabled: bool) -> Self {
        self.config.normalize_letter_o = enabled;
        self
    }

    pub fn escape_tag_prefix(mut self, enabled: bool) -> Self {
        self.config.escape_tag_prefix = enabled;
        self
    }

    pub fn rate_limit_behavior(mut self, behavior: RateLimitBehavior) -> Self {
        self.config.rate_limit_behavior = behavior;
        self
    }

    /// Throttle outgoing requests with the given policy.
    pub fn governor(mut self, governor: impl RateGovernor + 'static) -> Self {
        self.config.governor = Some(Arc::new(governor));
        self
    }

    pub(crate) fn into_parts(self) -> Result<(String, Config, Option<reqwest::Client>)> {
        self.config.validate()?;
        Ok((self.api_key, self.config, self.session))
    }

    pub(crate) fn into_blocking_parts(
        self,
    ) -> Result<(String, Config, Option<reqwest::blocking::Client>)> {
        self.config.validate()?;
        Ok((self.api_key, self.config, self.blocking_session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cache_ttl, Duration::from_secs(180));
        assert_eq!(config.cache_capacity, 540);
        assert!(config.normalize_letter_o);
        assert!(config.governor.is_none());
        assert!(config.user_agent.starts_with("brawl-sdk/"));
    }

    #[test]
    fn builder_trims_base_url() {
        let (_, config, _) = ClientBuilder::new("key")
            .base_url("http://localhost:8080/v1/")
            .into_parts()
            .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn rejects_bad_base_url() {
        let res = ClientBuilder::new("key").base_url("not a url").into_parts();
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_zero_timeout() {
        let res = ClientBuilder::new("key")
            .timeout(Duration::ZERO)
            .into_parts();
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }
}
