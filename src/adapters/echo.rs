//! Backend that answers every request with a JSON description of it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;

use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::{ExchangeRequest, ExchangeResponse};
use crate::domain::ports::Exchange;

/// Body returned by [`EchoBackend`].
#[derive(Debug, Serialize)]
pub struct Echo {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body_len: usize,
}

impl From<&ExchangeRequest> for Echo {
    fn from(req: &ExchangeRequest) -> Self {
        Self {
            method: req.method.to_string(),
            url: req.url.to_string(),
            headers: req
                .headers
                .iter()
                .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
                .collect(),
            body_len: req.body.len(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoBackend;

#[async_trait]
impl Exchange for EchoBackend {
    async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        let body = serde_json::to_vec(&Echo::from(&req))
            .map_err(|e| ExchangeError::Io(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(ExchangeResponse::with_body(StatusCode::OK, headers, body))
    }
}
