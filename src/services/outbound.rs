//! Outbound request executor: the single choke point for calls the agents
//! make to the cache store or the backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::Method;

use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::ExchangeRequest;
use crate::domain::models::ExchangeResponse;
use crate::domain::ports::{AccessLog, AccessRecord, Direction, SharedExchange};

/// Connection-scoped headers that must not be copied onto a new request.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "content-length",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop and framing headers before re-sending `headers`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Per-call settings supplied by the calling agent.
#[derive(Clone)]
pub struct RequestContext {
    /// Logical route name written into access records.
    pub route: String,
    /// Bound on the call; zero means unbounded.
    pub timeout: Duration,
    /// Whether to emit an access record on success.
    pub log: bool,
    pub exchange: SharedExchange,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("route", &self.route)
            .field("timeout", &self.timeout)
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

/// Builds, bounds and logs outbound requests.
#[derive(Clone)]
pub struct OutboundExecutor {
    access_log: Arc<dyn AccessLog>,
}

impl OutboundExecutor {
    pub fn new(access_log: Arc<dyn AccessLog>) -> Self {
        Self { access_log }
    }

    /// Issue one outbound request.
    ///
    /// An unbuildable request fails locally with `InvalidArgument` and is
    /// never sent. Exceeding `ctx.timeout` drops the in-flight call and
    /// yields `Timeout`. Every error can be turned into a response with
    /// [`ExchangeError::to_response`], so callers always have a status code
    /// to act on.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        method: &str,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> ExchangeResult<ExchangeResponse> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| {
            ExchangeError::InvalidArgument(format!("invalid method '{method}'"))
        })?;
        let mut req = ExchangeRequest::new(method, url)?;
        req.headers = headers;
        req.body = body;

        let method = req.method.to_string();
        let url = req.url.to_string();
        let request_id = req.request_id().map(str::to_string);

        let start = Utc::now();
        let clock = Instant::now();
        let call = ctx.exchange.exchange(req);
        let result = if ctx.timeout.is_zero() {
            call.await
        } else {
            match tokio::time::timeout(ctx.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ExchangeError::Timeout(ctx.timeout)),
            }
        };

        let resp = match result {
            Ok(resp) => resp,
            Err(ExchangeError::Timeout(_)) => return Err(ExchangeError::Timeout(ctx.timeout)),
            Err(e) => return Err(e),
        };

        if ctx.log {
            self.access_log.log(&AccessRecord {
                direction: Direction::Egress,
                start,
                elapsed: clock.elapsed(),
                route: ctx.route.clone(),
                method,
                url,
                status: resp.status.as_u16(),
                request_id,
                timeout: ctx.timeout,
            });
        }
        Ok(resp)
    }
}
