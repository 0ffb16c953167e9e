//! Turns a raw HTTP response into decoded data or one of the crate's errors.

use crate::governor::RateState;
use crate::{Error, Result};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

pub const RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Rate limit headers of a response. `reset` is a unix timestamp in seconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateHeaders {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset: Option<i64>,
}

impl RateHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| -> Option<f64> {
            headers.get(name)?.to_str().ok()?.trim().parse::<f64>().ok()
        };
        Self {
            limit: number(RATELIMIT_LIMIT).map(|v| v as u32),
            remaining: number(RATELIMIT_REMAINING).map(|v| v as u32),
            reset: number(RATELIMIT_RESET).map(|v| v as i64),
        }
    }
}

/// What the transport hands over: status, rate headers and the body as text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub rate: RateHeaders,
    pub body: String,
}

/// Decode `text` as JSON, or keep it as an opaque string when it is not.
pub fn decode_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn is_maintenance(data: &Value) -> bool {
    data.get("maintenance").map_or(false, truthy)
        || data.get("reason").and_then(Value::as_str) == Some("inMaintenance")
}

/// Classify `response` at unix time `now`.
///
/// Successful responses carrying rate limit headers update `rate`.
pub fn classify(response: &RawResponse, now: i64, rate: &mut RateState) -> Result<Value> {
    let data = decode_body(&response.body);
    let url = response.url.clone();
    let code = response.status;

    match code {
        200..=299 => {
            rate.observe(&response.rate);
            Ok(data)
        }
        401 => Err(Error::Unauthorized { url }),
        403 => {
            let message = match data.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => response.body.clone(),
            };
            Err(Error::Forbidden { url, message })
        }
        400 | 404 => Err(Error::NotFound { url }),
        429 => {
            let reset = response.rate.reset.unwrap_or(rate.reset_at);
            let retry_after = Duration::from_secs(reset.saturating_sub(now).max(0) as u64);
            Err(Error::RateLimited { url, retry_after })
        }
        500..=u16::MAX => {
            // Gateway errors come back as HTML, not JSON
            if data.is_string() {
                return Err(Error::ServerError { url, code });
            }
            if is_maintenance(&data) {
                return Err(Error::Maintenance { url });
            }
            Err(Error::ServerError { url, code })
        }
        _ => Err(Error::Unexpected {
            url,
            code,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    const NOW: i64 = 1_700_000_000;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            url: "https://api.brawlstars.com/v1/players/%23GGJVJLU2".into(),
            status,
            rate: RateHeaders::default(),
            body: body.into(),
        }
    }

    fn run(res: &RawResponse) -> Result<Value> {
        classify(res, NOW, &mut RateState::default())
    }

    #[test]
    fn success_decodes_json() {
        let data = run(&response(200, r##"{"tag":"#GGJVJLU2","trophies":30000}"##)).unwrap();
        assert_eq!(data["trophies"], 30000);
    }

    #[test]
    fn success_with_opaque_body() {
        let data = run(&response(200, "not json")).unwrap();
        assert_eq!(data, Value::String("not json".into()));
    }

    #[test]
    fn success_updates_rate_state() {
        let mut res = response(200, "{}");
        res.rate = RateHeaders {
            limit: Some(10),
            remaining: Some(4),
            reset: Some(NOW + 30),
        };
        let mut rate = RateState::default();
        classify(&res, NOW, &mut rate).unwrap();
        assert_eq!(rate.limit, 10);
        assert_eq!(rate.remaining, 4);
        assert_eq!(rate.reset_at, NOW + 30);
    }

    #[test]
    fn not_found() {
        assert!(matches!(run(&response(404, "{}")), Err(Error::NotFound { .. })));
        assert!(matches!(run(&response(400, "{}")), Err(Error::NotFound { .. })));
    }

    #[test]
    fn unauthorized_and_forbidden() {
        assert!(matches!(
            run(&response(401, "{}")),
            Err(Error::Unauthorized { .. })
        ));
        match run(&response(403, r#"{"reason":"accessDenied","message":"Invalid authorization: API key does not allow access from IP 1.2.3.4"}"#)) {
            Err(Error::Forbidden { message, .. }) => assert!(message.contains("1.2.3.4")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rate_limited_uses_reset_header() {
        let mut res = response(429, "{}");
        res.rate.reset = Some(NOW + 5);
        match run(&res) {
            Err(Error::RateLimited { retry_after, .. }) => {
                assert_eq!(retry_after, Duration::from_secs(5))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rate_limited_reset_in_the_past() {
        let mut res = response(429, "{}");
        res.rate.reset = Some(NOW - 5);
        match run(&res) {
            Err(Error::RateLimited { retry_after, .. }) => assert_eq!(retry_after, Duration::ZERO),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn maintenance_before_server_error() {
        assert!(matches!(
            run(&response(500, r#"{"maintenance":true}"#)),
            Err(Error::Maintenance { .. })
        ));
        assert!(matches!(
            run(&response(503, r#"{"reason":"inMaintenance"}"#)),
            Err(Error::Maintenance { .. })
        ));
        assert!(matches!(
            run(&response(500, r#"{"maintenance":false}"#)),
            Err(Error::ServerError { code: 500, .. })
        ));
        assert!(matches!(
            run(&response(502, "<html>Bad gateway</html>")),
            Err(Error::ServerError { code: 502, .. })
        ));
    }

    #[test]
    fn anything_else_is_unexpected() {
        match run(&response(302, "moved")) {
            Err(Error::Unexpected { code, body, .. }) => {
                assert_eq!(code, 302);
                assert_eq!(body, "moved");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_rate_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from_static("3"));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from_static("0"));
        headers.insert(RATELIMIT_RESET, HeaderValue::from_static("1700000005"));
        let rate = RateHeaders::from_headers(&headers);
        assert_eq!(rate.limit, Some(3));
        assert_eq!(rate.remaining, Some(0));
        assert_eq!(rate.reset, Some(1_700_000_005));
        assert_eq!(RateHeaders::from_headers(&HeaderMap::new()), RateHeaders::default());
    }
}
