//! Exchange port: the "request in, response out" function every pipeline
//! stage and transport implements.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::ExchangeResult;
use crate::domain::models::exchange::{ExchangeRequest, ExchangeResponse};

/// Transform a request into a response, possibly by calling another exchange.
///
/// On failure the error carries enough information to synthesize a response
/// with the correct status code (see
/// [`ExchangeError::to_response`](crate::domain::errors::ExchangeError::to_response)).
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse>;
}

/// Exchange shared between stages, routes and agents.
pub type SharedExchange = Arc<dyn Exchange>;

/// A chainable pipeline stage that wraps the next exchange.
pub trait Link {
    /// Produce an exchange that runs this stage in front of `next`.
    /// A `None` next stage models an unterminated pipeline.
    fn link(&self, next: Option<SharedExchange>) -> SharedExchange;
}

/// Adapter turning an async closure into an [`Exchange`].
pub struct ExchangeFn<F>(F);

#[async_trait]
impl<F, Fut> Exchange for ExchangeFn<F>
where
    F: Fn(ExchangeRequest) -> Fut + Send + Sync,
    Fut: Future<Output = ExchangeResult<ExchangeResponse>> + Send + 'static,
{
    async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        (self.0)(req).await
    }
}

/// Wrap an async closure as a shared exchange.
pub fn exchange_fn<F, Fut>(f: F) -> SharedExchange
where
    F: Fn(ExchangeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ExchangeResult<ExchangeResponse>> + Send + 'static,
{
    Arc::new(ExchangeFn(f))
}

/// Compose stages in order in front of `terminal`.
///
/// `chain(&[&cache], routing)` yields `cache.link(Some(routing))`.
pub fn chain(stages: &[&dyn Link], terminal: SharedExchange) -> SharedExchange {
    stages
        .iter()
        .rev()
        .fold(terminal, |next, stage| stage.link(Some(next)))
}
