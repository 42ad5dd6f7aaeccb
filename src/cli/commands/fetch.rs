//! `fetch` command: build the cache → routing pipeline from the
//! configuration and run one request through it repeatedly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::MemoryCacheStore;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::config::CACHE_HOST_KEY;
use crate::domain::models::{
    Config, ConfigContent, ExchangeRequest, Message, Status, CACHED_HEADER, REQUEST_ID_HEADER,
};
use crate::domain::ports::{chain, Exchange, Link, SharedExchange};
use crate::services::{AgentOptions, CacheAgent, RoutingAgent};

/// Host used for the in-memory store when no cache host is configured.
const MEMORY_STORE_HOST: &str = "memory.store";

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Request path and query, e.g. /search?q=golang
    pub path: String,

    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Use an in-process cache store instead of the configured one
    #[arg(long)]
    pub memory_store: bool,

    /// Number of times to send the request
    #[arg(long, default_value_t = 2)]
    pub passes: usize,

    /// Pause between passes so write-back can finish, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub settle_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct PassOutput {
    pub pass: usize,
    pub status: u16,
    pub cached: Option<String>,
    pub body_bytes: usize,
    pub elapsed_ms: u128,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FetchOutput {
    pub method: String,
    pub path: String,
    pub request_id: String,
    pub passes: Vec<PassOutput>,
}

impl CommandOutput for FetchOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["pass", "status", "cached", "bytes", "elapsed", "error"]);
        for p in &self.passes {
            table.add_row(vec![
                p.pass.to_string(),
                p.status.to_string(),
                p.cached.clone().unwrap_or_else(|| "-".to_string()),
                p.body_bytes.to_string(),
                format!("{}ms", p.elapsed_ms),
                p.error.clone().unwrap_or_default(),
            ]);
        }
        format!(
            "{} {} (request id {})\n{table}",
            console::style(&self.method).bold(),
            self.path,
            self.request_id
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn ensure_configured(agent: &str, status: &Status) -> Result<()> {
    if let Some(error) = &status.error {
        bail!("{agent} agent rejected its configuration: {error}");
    }
    Ok(())
}

pub async fn execute(args: FetchArgs, config: Config, json_mode: bool) -> Result<()> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{}'", args.method))?;
    let path = if args.path.starts_with('/') {
        args.path.clone()
    } else {
        format!("/{}", args.path)
    };

    let options = AgentOptions::over_http()?.with_mailbox_capacity(config.mailbox_capacity);
    let cache = CacheAgent::with_options(options.clone());
    let routing = RoutingAgent::with_options(options);

    if !config.cache.is_empty() {
        let status = cache.configure(ConfigContent::Map(config.cache.clone())).await;
        ensure_configured("cache", &status)?;
    }
    if !config.routing.is_empty() {
        let status = routing.configure(ConfigContent::Map(config.routing.clone())).await;
        ensure_configured("routing", &status)?;
    }

    if args.memory_store {
        let store: SharedExchange = Arc::new(MemoryCacheStore::new());
        cache.configure(ConfigContent::Exchange(store)).await;
        if cache.host().is_none() {
            cache
                .configure(ConfigContent::Map(
                    [(CACHE_HOST_KEY.to_string(), MEMORY_STORE_HOST.to_string())].into(),
                ))
                .await;
        }
    }

    cache.send(Message::Startup);
    routing.send(Message::Startup);

    let pipeline = chain(&[&cache], routing.link(None));
    let request_id = Uuid::new_v4().to_string();
    let url = format!("http://intermediary.local{path}");

    let mut passes = Vec::with_capacity(args.passes);
    for pass in 1..=args.passes {
        if pass > 1 {
            tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;
        }
        let req = ExchangeRequest::new(method.clone(), &url)?
            .with_header(REQUEST_ID_HEADER, &request_id);

        let started = Instant::now();
        let outcome = match pipeline.exchange(req).await {
            Ok(resp) => {
                let status = resp.status.as_u16();
                let cached = resp.header(CACHED_HEADER).map(str::to_string);
                match resp.bytes().await {
                    Ok(body) => (status, cached, body.len(), None),
                    Err(e) => (e.status_code().as_u16(), cached, 0, Some(e.to_string())),
                }
            }
            Err(e) => (e.status_code().as_u16(), None, 0, Some(e.to_string())),
        };
        let (status, cached, body_bytes, error) = outcome;
        passes.push(PassOutput {
            pass,
            status,
            cached,
            body_bytes,
            elapsed_ms: started.elapsed().as_millis(),
            error,
        });
    }

    cache.send(Message::Shutdown);
    routing.send(Message::Shutdown);
    cache.stopped().await;
    routing.stopped().await;

    output(
        &FetchOutput {
            method: method.to_string(),
            path,
            request_id,
            passes,
        },
        json_mode,
    );
    Ok(())
}
