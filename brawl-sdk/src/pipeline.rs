//! Mode independent half of a request: everything except the network call.

use crate::cache::ResponseCache;
use crate::classify::{self, RawResponse};
use crate::config::{AuthScheme, Config, RateLimitBehavior};
use crate::endpoint::{Endpoint, Resolver};
use crate::governor::RateState;
use crate::tag::Tag;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// `{"items": [...]}` envelope used by list endpoints.
#[derive(Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

/// What to do with a request before it goes out.
#[derive(Debug, PartialEq)]
pub(crate) enum Admission {
    Cached(Value),
    Wait(Duration),
    Send,
}

#[derive(Debug)]
pub(crate) struct Pipeline {
    pub(crate) config: Config,
    pub(crate) resolver: Resolver,
    headers: HeaderMap,
    cache: Option<ResponseCache>,
    rate: Mutex<RateState>,
}

impl Pipeline {
    pub(crate) fn new(api_key: &str, config: Config) -> Result<Self> {
        let mut shared_headers = HeaderMap::new();
        let auth = match config.auth_scheme {
            AuthScheme::Bearer => format!("Bearer {}", api_key),
            AuthScheme::Raw => api_key.to_string(),
        };
        let mut auth: HeaderValue = auth
            .parse()
            .map_err(|_| Error::InvalidArgument("Invalid API key format".into()))?;
        auth.set_sensitive(true);
        shared_headers.insert(AUTHORIZATION, auth);
        shared_headers.insert(
            USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| Error::InvalidArgument("Invalid user agent format".into()))?,
        );

        Ok(Self {
            resolver: Resolver::new(
                &config.base_url,
                &config.constants_url,
                config.escape_tag_prefix,
            ),
            cache: ResponseCache::new(config.cache_capacity, config.cache_ttl),
            rate: Mutex::new(RateState::default()),
            headers: shared_headers,
            config,
        })
    }

    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn tag(&self, input: &str) -> Result<Tag> {
        Ok(Tag::parse(input, self.config.normalize_letter_o)?)
    }

    fn cached(&self, endpoint: &Endpoint) -> Option<Value> {
        let hit = self.cache.as_ref()?.lookup(endpoint)?;
        debug!("GET {} got result from cache", endpoint);
        Some(hit)
    }

    /// Serve `endpoint` from the cache, or hold it back, or let it through.
    ///
    /// Callers come back after every wait, so a response stored by another
    /// call in the meantime is picked up.
    pub(crate) fn admit(&self, endpoint: &Endpoint) -> Result<Admission> {
        if let Some(hit) = self.cached(endpoint) {
            return Ok(Admission::Cached(hit));
        }
        Ok(match self.rate_wait(endpoint)? {
            Some(wait) => Admission::Wait(wait),
            None => Admission::Send,
        })
    }

    /// `Ok(Some(wait))` when the request has to be held back first, an error
    /// instead when the client is set to fail fast.
    fn rate_wait(&self, endpoint: &Endpoint) -> Result<Option<Duration>> {
        let now = chrono::Utc::now().timestamp();
        let wait = self.rate_state().wait_at(now).or_else(|| {
            self.config
                .governor
                .as_ref()
                .and_then(|governor| governor.try_acquire().err())
        });
        let Some(wait) = wait else {
            return Ok(None);
        };
        match self.config.rate_limit_behavior {
            RateLimitBehavior::Wait => {
                warn!("rate limited, holding GET {} for {:?}", endpoint, wait);
                Ok(Some(wait))
            }
            RateLimitBehavior::Fail => Err(Error::RateLimited {
                url: endpoint.to_string(),
                retry_after: wait,
            }),
        }
    }

    /// Classify `raw` and cache the body if it was a success.
    pub(crate) fn complete(&self, endpoint: &Endpoint, raw: RawResponse) -> Result<Value> {
        let now = chrono::Utc::now().timestamp();
        let data = {
            let mut rate = self.rate.lock().unwrap_or_else(PoisonError::into_inner);
            classify::classify(&raw, now, &mut rate)?
        };
        if let Some(cache) = &self.cache {
            cache.store(endpoint, data.clone());
        }
        Ok(data)
    }

    pub(crate) fn rate_state(&self) -> RateState {
        *self.rate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, ResponseCache::len)
    }

    pub(crate) fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(endpoint: &Endpoint, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Unexpected {
        url: endpoint.to_string(),
        code: 200,
        body: format!("unable to decode response: {}", e),
    })
}

pub(crate) fn decode_items<T: DeserializeOwned>(endpoint: &Endpoint, value: Value) -> Result<Vec<T>> {
    decode::<Items<T>>(endpoint, value).map(|envelope| envelope.items)
}

/// Reject a batch that would request the same URL more than once.
pub(crate) fn ensure_unique(endpoints: &[Endpoint]) -> Result<()> {
    let mut seen = HashSet::new();
    for endpoint in endpoints {
        if !seen.insert(endpoint) {
            return Err(Error::DuplicateRequest(endpoint.to_string()));
        }
    }
    Ok(())
}

pub(crate) fn select_constant(data: Value, key: Option<&str>) -> Result<Value> {
    let Some(key) = key else {
        return Ok(data);
    };
    match data.get(key) {
        Some(section) if !section.is_null() => Ok(section.clone()),
        _ => Err(Error::UnknownConstant(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RateHeaders;
    use crate::governor::TokenBucket;
    use serde_json::json;
    use std::sync::Arc;

    fn pipeline(config: Config) -> Pipeline {
        Pipeline::new("token", config).unwrap()
    }

    fn endpoint(p: &Pipeline) -> Endpoint {
        p.resolver.player(&p.tag("GGJVJLU2").unwrap())
    }

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            url: "u".into(),
            status,
            rate: RateHeaders::default(),
            body: body.into(),
        }
    }

    #[test]
    fn auth_header_schemes() {
        let p = pipeline(Config::default());
        assert_eq!(p.headers()[AUTHORIZATION], "Bearer token");
        let p = pipeline(Config {
            auth_scheme: AuthScheme::Raw,
            ..Config::default()
        });
        assert_eq!(p.headers()[AUTHORIZATION], "token");
    }

    #[test]
    fn rejects_api_key_with_newline() {
        let res = Pipeline::new("bad\nkey", Config::default());
        assert!(matches!(res, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn success_is_cached_failure_is_not() {
        let p = pipeline(Config::default());
        let e = endpoint(&p);
        assert!(p.complete(&e, raw(404, "{}")).is_err());
        assert_eq!(p.cached(&e), None);
        p.complete(&e, raw(200, r##"{"tag":"#GGJVJLU2"}"##)).unwrap();
        assert_eq!(p.cached(&e), Some(json!({"tag": "#GGJVJLU2"})));
    }

    #[test]
    fn cache_can_be_disabled() {
        let p = pipeline(Config {
            cache_capacity: 0,
            ..Config::default()
        });
        let e = endpoint(&p);
        p.complete(&e, raw(200, "{}")).unwrap();
        assert_eq!(p.cached(&e), None);
        assert_eq!(p.cache_len(), 0);
    }

    #[test]
    fn exhausted_window_holds_requests() {
        let p = pipeline(Config::default());
        let e = endpoint(&p);
        let mut res = raw(200, "{}");
        res.rate = RateHeaders {
            limit: Some(3),
            remaining: Some(0),
            reset: Some(chrono::Utc::now().timestamp() + 60),
        };
        p.complete(&e, res).unwrap();
        let other = p.resolver.club(&p.tag("QCGV8PG").unwrap());
        match p.admit(&other).unwrap() {
            Admission::Wait(wait) => assert!(wait > Duration::from_secs(50)),
            other => panic!("unexpected {:?}", other),
        }
        // answered from the cache despite the exhausted window
        assert_eq!(p.admit(&e).unwrap(), Admission::Cached(json!({})));
    }

    #[test]
    fn waiting_request_picks_up_cached_response() {
        let p = pipeline(Config::default());
        let e = endpoint(&p);
        let other = p.resolver.club(&p.tag("QCGV8PG").unwrap());
        let mut res = raw(200, "{}");
        res.rate = RateHeaders {
            limit: Some(3),
            remaining: Some(0),
            reset: Some(chrono::Utc::now().timestamp() + 60),
        };
        p.complete(&other, res).unwrap();
        assert!(matches!(p.admit(&e).unwrap(), Admission::Wait(_)));

        // a concurrent call stores the same endpoint while this one sleeps
        p.complete(&e, raw(200, r##"{"tag":"#GGJVJLU2"}"##)).unwrap();
        assert_eq!(
            p.admit(&e).unwrap(),
            Admission::Cached(json!({"tag": "#GGJVJLU2"}))
        );
    }

    #[test]
    fn fail_fast_reports_wait() {
        let p = pipeline(Config {
            rate_limit_behavior: RateLimitBehavior::Fail,
            governor: Some(Arc::new(TokenBucket::with_interval(Duration::from_secs(10)).unwrap())),
            ..Config::default()
        });
        let e = endpoint(&p);
        assert_eq!(p.admit(&e).unwrap(), Admission::Send);
        match p.admit(&e) {
            Err(Error::RateLimited { retry_after, .. }) => {
                assert!(retry_after > Duration::from_secs(9))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn duplicate_endpoints() {
        let p = pipeline(Config::default());
        let a = p.resolver.player(&p.tag("GGJVJLU2").unwrap());
        let b = p.resolver.player(&p.tag("#ggjvjlu2").unwrap());
        let c = p.resolver.player(&p.tag("QCGV8PG").unwrap());
        assert!(ensure_unique(&[a.clone(), c.clone()]).is_ok());
        assert!(matches!(
            ensure_unique(&[a, c, b]),
            Err(Error::DuplicateRequest(_))
        ));
    }

    #[test]
    fn items_envelope() {
        let p = pipeline(Config::default());
        let e = endpoint(&p);
        let items: Vec<u32> = decode_items(&e, json!({"items": [1, 2, 3]})).unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        let res: Result<Vec<u32>> = decode_items(&e, json!([1, 2, 3]));
        assert!(matches!(res, Err(Error::Unexpected { code: 200, .. })));
    }

    #[test]
    fn constants_sections() {
        let data = json!({"maps": [{"id": 1}], "empty": null});
        assert_eq!(select_constant(data.clone(), None).unwrap(), data);
        assert_eq!(
            select_constant(data.clone(), Some("maps")).unwrap(),
            json!([{"id": 1}])
        );
        assert!(matches!(
            select_constant(data.clone(), Some("invalid")),
            Err(Error::UnknownConstant(_))
        ));
        assert!(matches!(
            select_constant(data, Some("empty")),
            Err(Error::UnknownConstant(_))
        ));
    }
}
