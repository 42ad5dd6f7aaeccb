//! Real HTTP round-trips through the reqwest transport against mockito.

mod common;

use std::sync::Arc;

use intermediary::domain::models::REQUEST_ID_HEADER;
use intermediary::{
    CacheAgent, ConfigContent, Exchange, ExchangeError, ExchangeRequest, HttpTransport, Link,
    RoutingAgent,
};
use reqwest::StatusCode;

#[tokio::test]
async fn test_transport_streams_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search?q=golang")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("hello")
        .create_async()
        .await;

    let transport = HttpTransport::new().unwrap();
    let req = ExchangeRequest::get(&format!("{}/search?q=golang", server.url())).unwrap();
    let resp = transport.exchange(req).await.unwrap();

    assert_eq!(resp.status, StatusCode::OK);
    assert!(!resp.body.is_buffered());
    assert_eq!(resp.header("content-type"), Some("text/plain"));
    assert_eq!(&resp.bytes().await.unwrap()[..], b"hello");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_transport_connection_failure_is_upstream_error() {
    let transport = HttpTransport::new().unwrap();
    // Port 9 (discard) is not expected to accept connections in CI
    let req = ExchangeRequest::get("http://127.0.0.1:9/").unwrap();
    let err = transport.exchange(req).await.unwrap_err();
    assert!(matches!(err, ExchangeError::Upstream { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_routing_agent_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/items/7")
        .match_header(REQUEST_ID_HEADER, "req-1")
        .with_status(204)
        .create_async()
        .await;

    let (options, _) = common::test_options(Arc::new(HttpTransport::new().unwrap()));
    let agent = RoutingAgent::with_options(options);
    let backend_url = server.url();
    agent
        .configure(ConfigContent::Map(common::settings(&[("app-host", backend_url.as_str())])))
        .await;

    let req = ExchangeRequest::new(reqwest::Method::DELETE, "http://front.local/items/7")
        .unwrap()
        .with_header(REQUEST_ID_HEADER, "req-1");
    let resp = agent.link(None).exchange(req).await.unwrap();

    assert_eq!(resp.status, StatusCode::NO_CONTENT);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cache_store_over_http() {
    let mut store = mockito::Server::new_async().await;
    let lookup = store
        .mock("GET", "/search?q=golang")
        .with_status(404)
        .create_async()
        .await;
    let write_back = store
        .mock("PUT", "/search?q=golang")
        .match_body("fresh")
        .match_header("cache-control", "max-age=30")
        .with_status(201)
        .create_async()
        .await;

    let (options, _) = common::test_options(Arc::new(HttpTransport::new().unwrap()));
    let agent = CacheAgent::with_options(options);
    let store_url = store.url();
    agent
        .configure(ConfigContent::Map(common::settings(&[
            ("cache-host", store_url.as_str()),
            ("cache-control", "max-age=30"),
        ])))
        .await;
    let backend = intermediary::exchange_fn(|_req| async {
        Ok(intermediary::ExchangeResponse::with_body(
            StatusCode::OK,
            reqwest::header::HeaderMap::new(),
            "fresh",
        ))
    });

    let resp = agent
        .link(Some(backend))
        .exchange(ExchangeRequest::get("http://front.local/search?q=golang").unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status, StatusCode::OK);

    lookup.assert_async().await;

    // write-back is detached from the response
    let mut stored = false;
    for _ in 0..200 {
        if write_back.matched_async().await {
            stored = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(stored, "cache write-back was not received");
}
