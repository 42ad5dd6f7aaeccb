//! Request/response values passed between pipeline stages.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use reqwest::{Method, StatusCode, Url};

use crate::domain::errors::{ExchangeError, ExchangeResult};

/// Correlation header propagated to every outbound call made for a request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cache hit/miss marker header (`true` on hit, `false` on miss).
pub const CACHED_HEADER: &str = "x-cached";

/// Timeout marker header carrying the configured timeout as text.
pub const TIMEOUT_HEADER: &str = "x-timeout";

/// An inbound or outbound HTTP request.
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ExchangeRequest {
    /// Build a request, failing with `InvalidArgument` on an unparseable URL.
    pub fn new(method: Method, url: &str) -> ExchangeResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| ExchangeError::InvalidArgument(format!("invalid url '{url}': {e}")))?;
        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    pub fn get(url: &str) -> ExchangeResult<Self> {
        Self::new(Method::GET, url)
    }

    /// Add a header; values that are not valid header text are skipped.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(HeaderName::from_static(name), value);
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }
}

/// Response body: either fully buffered or still streaming from upstream.
pub enum Body {
    Full(Bytes),
    Stream(BoxStream<'static, ExchangeResult<Bytes>>),
}

impl Body {
    pub const fn empty() -> Self {
        Self::Full(Bytes::new())
    }

    pub const fn is_buffered(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Read the whole body into memory.
    pub async fn collect(self) -> ExchangeResult<Bytes> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Full(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::Full(Bytes::from_static(s.as_bytes()))
    }
}

/// A response flowing back through the pipeline.
#[derive(Debug)]
pub struct ExchangeResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ExchangeResponse {
    /// Empty-bodied response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn with_body(status: StatusCode, headers: HeaderMap, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: &'static str, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(HeaderName::from_static(name), value);
        }
    }

    /// Consume the response and read its body.
    pub async fn bytes(self) -> ExchangeResult<Bytes> {
        self.body.collect().await
    }

    /// Read the body into memory and replace it with a replayable buffer.
    ///
    /// Returns the buffered bytes; the response keeps an identical copy and
    /// its `Content-Length` is reset to the buffered length.
    pub async fn buffer(&mut self) -> ExchangeResult<Bytes> {
        let body = std::mem::take(&mut self.body);
        let bytes = body.collect().await?;
        self.headers
            .insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        self.body = Body::Full(bytes.clone());
        Ok(bytes)
    }
}

/// Combine a host (with or without scheme) with a path and query.
pub fn build_url(host: &str, path: &str, query: Option<&str>) -> ExchangeResult<Url> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ExchangeError::InvalidArgument(
            "host configuration is empty".to_string(),
        ));
    }
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    let mut url = Url::parse(&base)
        .map_err(|e| ExchangeError::InvalidArgument(format!("invalid host '{host}': {e}")))?;
    url.set_path(path);
    url.set_query(query.filter(|q| !q.is_empty()));
    Ok(url)
}

/// Render a duration the way it is written in configuration (`750ms`, `2s`).
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }
    if millis % 3_600_000 == 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{millis}ms")
    }
}

/// Parse `750ms`, `2s`, `30m`, `1h`; a bare integer is milliseconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().ok()?;
    match unit.trim() {
        "" | "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_adds_scheme() {
        let url = build_url("cache.local", "/search", Some("q=golang")).unwrap();
        assert_eq!(url.as_str(), "http://cache.local/search?q=golang");
    }

    #[test]
    fn test_build_url_keeps_scheme_and_drops_empty_query() {
        let url = build_url("https://localhost:8082", "/search", Some("")).unwrap();
        assert_eq!(url.as_str(), "https://localhost:8082/search");
    }

    #[test]
    fn test_build_url_empty_host() {
        let err = build_url("  ", "/", None).unwrap_err();
        assert!(err.to_string().contains("host configuration is empty"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("750ms"), Some(Duration::from_millis(750)));
        assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("250"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("5d"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(750)), "750ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2s");
        assert_eq!(format_duration(Duration::from_secs(1800)), "30m");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[tokio::test]
    async fn test_buffer_replaces_stream_with_replayable_body() {
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);
        let mut resp = ExchangeResponse::with_body(
            StatusCode::OK,
            HeaderMap::new(),
            Body::Stream(chunks.boxed()),
        );

        let buffered = resp.buffer().await.unwrap();
        assert_eq!(&buffered[..], b"hello world");
        assert!(resp.body.is_buffered());
        assert_eq!(resp.header("content-length"), Some("11"));
        assert_eq!(&resp.bytes().await.unwrap()[..], b"hello world");
    }

    #[tokio::test]
    async fn test_collect_surfaces_stream_error() {
        let chunks = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(ExchangeError::Io("connection reset".into())),
        ]);
        let err = Body::Stream(chunks.boxed()).collect().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Io(_)));
    }
}
