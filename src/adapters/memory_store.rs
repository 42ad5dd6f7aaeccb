//! In-memory cache store addressed by URL.
//!
//! `GET` returns the stored response or 404, `PUT` stores the request body
//! and headers under the request URL and answers 200, anything else is 405.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

use crate::domain::errors::ExchangeResult;
use crate::domain::models::{ExchangeRequest, ExchangeResponse, REQUEST_ID_HEADER};
use crate::domain::ports::Exchange;

#[derive(Debug, Clone)]
struct Entry {
    headers: HeaderMap,
    body: Bytes,
}

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored body for `url`.
    pub fn get(&self, url: &str) -> Option<Bytes> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .map(|entry| entry.body.clone())
    }

    /// Store `body` under `url` directly.
    pub fn insert(&self, url: &str, body: impl Into<Bytes>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                url.to_string(),
                Entry {
                    headers: HeaderMap::new(),
                    body: body.into(),
                },
            );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Exchange for MemoryCacheStore {
    async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        let key = req.url.to_string();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let resp = match req.method {
            Method::GET => match entries.get(key.as_str()) {
                Some(entry) => ExchangeResponse::with_body(
                    StatusCode::OK,
                    entry.headers.clone(),
                    entry.body.clone(),
                ),
                None => ExchangeResponse::new(StatusCode::NOT_FOUND),
            },
            Method::PUT => {
                let mut headers = req.headers;
                headers.remove(REQUEST_ID_HEADER);
                entries.insert(
                    key,
                    Entry {
                        headers,
                        body: req.body,
                    },
                );
                ExchangeResponse::new(StatusCode::OK)
            }
            _ => ExchangeResponse::new(StatusCode::METHOD_NOT_ALLOWED),
        };
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "http://cache.local/search?q=golang";

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryCacheStore::new();
        let resp = store.exchange(ExchangeRequest::get(KEY).unwrap()).await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryCacheStore::new();
        let put = ExchangeRequest::new(Method::PUT, KEY)
            .unwrap()
            .with_header("content-type", "text/plain")
            .with_body("X");
        assert_eq!(store.exchange(put).await.unwrap().status, StatusCode::OK);

        let resp = store.exchange(ExchangeRequest::get(KEY).unwrap()).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.bytes().await.unwrap(), Bytes::from_static(b"X"));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryCacheStore::new();
        for body in ["first", "second"] {
            let put = ExchangeRequest::new(Method::PUT, KEY).unwrap().with_body(body);
            store.exchange(put).await.unwrap();
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(KEY), Some(Bytes::from_static(b"second")));
    }

    #[tokio::test]
    async fn test_other_methods_not_allowed() {
        let store = MemoryCacheStore::new();
        let req = ExchangeRequest::new(Method::DELETE, KEY).unwrap();
        let resp = store.exchange(req).await.unwrap();
        assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
