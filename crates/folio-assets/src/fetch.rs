//! Remote file download.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::error::{AssetError, AssetResult, FetchError};

/// A single-shot HTTP GET. Implementations must not retry.
pub trait RemoteFetch: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> AssetResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssetError::other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl RemoteFetch for HttpFetcher {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(classify)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().map_err(classify)?;
        Ok(body.to_vec())
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::Connection(err.to_string())
    } else {
        FetchError::Client(err.to_string())
    }
}

/// Canned response for [`StaticFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticResponse {
    Body(Vec<u8>),
    Status(u16),
    Timeout,
    Refused,
}

/// Fetcher that serves canned responses and records every request.
///
/// URLs with no canned response are refused.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: RwLock<HashMap<String, StaticResponse>>,
    requests: Mutex<Vec<(String, Duration)>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.with_response(url, StaticResponse::Body(body.into()))
    }

    pub fn with_response(self, url: impl Into<String>, response: StaticResponse) -> Self {
        self.responses.write().insert(url.into(), response);
        self
    }

    /// Every `(url, timeout)` requested so far, in order.
    pub fn requests(&self) -> Vec<(String, Duration)> {
        self.requests.lock().clone()
    }
}

impl RemoteFetch for StaticFetcher {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().push((url.to_string(), timeout));
        match self.responses.read().get(url) {
            Some(StaticResponse::Body(bytes)) => Ok(bytes.clone()),
            Some(StaticResponse::Status(code)) => Err(FetchError::HttpStatus(*code)),
            Some(StaticResponse::Timeout) => Err(FetchError::Timeout),
            Some(StaticResponse::Refused) | None => {
                Err(FetchError::Connection(format!("connection refused: {url}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_responses() {
        let fetcher = StaticFetcher::new()
            .with_body("https://a.example/x.png", b"png".to_vec())
            .with_response("https://a.example/404", StaticResponse::Status(404))
            .with_response("https://a.example/slow", StaticResponse::Timeout);
        let t = Duration::from_secs(13);

        assert_eq!(fetcher.get("https://a.example/x.png", t).unwrap(), b"png");
        assert_eq!(
            fetcher.get("https://a.example/404", t),
            Err(FetchError::HttpStatus(404))
        );
        assert_eq!(
            fetcher.get("https://a.example/slow", t),
            Err(FetchError::Timeout)
        );
        assert!(matches!(
            fetcher.get("https://b.example/", t),
            Err(FetchError::Connection(_))
        ));
        assert_eq!(fetcher.requests().len(), 4);
        assert!(fetcher.requests().iter().all(|(_, timeout)| *timeout == t));
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }
}
