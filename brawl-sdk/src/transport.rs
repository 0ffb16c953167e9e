use crate::classify::{RateHeaders, RawResponse};
use crate::endpoint::Endpoint;
use crate::Error;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::debug;

/// Map a transport failure into the crate's errors. Timeouts and refused
/// connections mean the API is unavailable.
fn transport_error(endpoint: &Endpoint, e: reqwest::Error) -> Error {
    let url = endpoint.to_string();
    if e.is_timeout() || e.is_connect() {
        debug!("GET {} failed: {}", url, e);
        return Error::ServerError { url, code: 503 };
    }
    Error::Unexpected {
        url,
        code: e.status().map_or(0, |s| s.as_u16()),
        body: e.to_string(),
    }
}

pub(crate) async fn get(
    web: &reqwest::Client,
    headers: &HeaderMap,
    endpoint: &Endpoint,
    timeout: Duration,
) -> crate::Result<RawResponse> {
    let res = web
        .get(endpoint.as_str())
        .headers(headers.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_error(endpoint, e))?;

    let status = res.status().as_u16();
    let rate = RateHeaders::from_headers(res.headers());
    let body = res.text().await.map_err(|e| transport_error(endpoint, e))?;
    debug!("GET {} returned {}", endpoint, status);

    Ok(RawResponse {
        url: endpoint.to_string(),
        status,
        rate,
        body,
    })
}

pub(crate) fn get_blocking(
    web: &reqwest::blocking::Client,
    headers: &HeaderMap,
    endpoint: &Endpoint,
    timeout: Duration,
) -> crate::Result<RawResponse> {
    let res = web
        .get(endpoint.as_str())
        .headers(headers.clone())
        .timeout(timeout)
        .send()
        .map_err(|e| transport_error(endpoint, e))?;

    let status = res.status().as_u16();
    let rate = RateHeaders::from_headers(res.headers());
    let body = res.text().map_err(|e| transport_error(endpoint, e))?;
    debug!("GET {} returned {}", endpoint, status);

    Ok(RawResponse {
        url: endpoint.to_string(),
        status,
        rate,
        body,
    })
}
