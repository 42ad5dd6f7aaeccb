//! Routing agent behavior: host configuration, forwarding and timeouts.

mod common;

use std::sync::Arc;
use std::time::Duration;

use intermediary::domain::models::{REQUEST_ID_HEADER, TIMEOUT_HEADER};
use intermediary::services::ROUTING_AGENT_NAME;
use intermediary::{
    chain, exchange_fn, CacheAgent, ConfigContent, EchoBackend, Exchange, ExchangeError,
    ExchangeRequest, ExchangeResponse, Link, MemoryCacheStore, RoutingAgent,
};
use reqwest::StatusCode;

#[tokio::test]
async fn test_host_not_configured() {
    let (options, notifier) = common::test_options(Arc::new(EchoBackend));
    let mut statuses = notifier.subscribe();
    let agent = RoutingAgent::with_options(options);

    let err = agent
        .link(None)
        .exchange(ExchangeRequest::get("http://front.local/search?q=golang").unwrap())
        .await
        .unwrap_err();

    let resp = err.to_response();
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.to_string().contains("host configuration is empty"));
    let body = resp.bytes().await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("host configuration is empty"));

    let status = statuses.recv().await.unwrap();
    assert_eq!(status.agent.as_deref(), Some(ROUTING_AGENT_NAME));
    assert_eq!(status.code, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_forward_preserves_method_path_and_request_id() {
    let (options, _) = common::test_options(Arc::new(EchoBackend));
    let agent = RoutingAgent::with_options(options);
    let status = agent
        .configure(ConfigContent::Map(common::settings(&[(
            "app-host",
            "https://backend.local",
        )])))
        .await;
    assert!(status.is_ok());

    let req = ExchangeRequest::new(reqwest::Method::POST, "http://front.local/items?id=7")
        .unwrap()
        .with_header(REQUEST_ID_HEADER, "req-7")
        .with_body("payload");
    let resp = agent.link(None).exchange(req).await.unwrap();
    assert_eq!(resp.status, StatusCode::OK);

    let echo: serde_json::Value = serde_json::from_slice(&resp.bytes().await.unwrap()).unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["url"], "https://backend.local/items?id=7");
    assert_eq!(echo["headers"][REQUEST_ID_HEADER], "req-7");
    assert_eq!(echo["body_len"], 7);
}

#[tokio::test]
async fn test_timeout_yields_gateway_timeout_with_marker() {
    let slow = exchange_fn(|_req| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ExchangeResponse::new(StatusCode::OK))
    });
    let (options, notifier) = common::test_options(slow);
    let mut statuses = notifier.subscribe();
    let agent = RoutingAgent::with_options(options);
    agent
        .configure(ConfigContent::Map(common::settings(&[
            ("app-host", "backend.local"),
            ("timeout", "100ms"),
        ])))
        .await;

    let err = agent
        .exchange(ExchangeRequest::get("http://front.local/slow").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, ExchangeError::Timeout(d) if d == Duration::from_millis(100)));
    let resp = err.to_response();
    assert_eq!(resp.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(resp.header(TIMEOUT_HEADER), Some("100ms"));
    assert_eq!(statuses.recv().await.unwrap().code, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_cache_then_routing_pipeline() {
    common::setup_test_logging();
    let store = Arc::new(MemoryCacheStore::new());
    let (cache_options, _) = common::test_options(store.clone());
    let (routing_options, _) = common::test_options(Arc::new(EchoBackend));
    let cache = CacheAgent::with_options(cache_options);
    let routing = RoutingAgent::with_options(routing_options);
    cache
        .configure(ConfigContent::Map(common::settings(&[("cache-host", "cache.local")])))
        .await;
    routing
        .configure(ConfigContent::Map(common::settings(&[("app-host", "backend.local")])))
        .await;

    let pipeline = chain(&[&cache], routing.link(None));
    let first = pipeline
        .exchange(ExchangeRequest::get("http://front.local/search?q=golang").unwrap())
        .await
        .unwrap();
    assert_eq!(first.header("x-cached"), Some("false"));
    let first_body = first.bytes().await.unwrap();

    let key = "http://cache.local/search?q=golang";
    let probe = store.clone();
    assert!(common::wait_for(|| probe.get(key).is_some(), 1000).await);

    let second = pipeline
        .exchange(ExchangeRequest::get("http://front.local/search?q=golang").unwrap())
        .await
        .unwrap();
    assert_eq!(second.header("x-cached"), Some("true"));
    assert_eq!(second.bytes().await.unwrap(), first_body);
}
