//! Cache-aside pipeline stage.
//!
//! GET requests are looked up in an HTTP-addressable cache store first; on a
//! miss the next stage is called and a 200 response is written back to the
//! store in a detached task. Admission is gated by the enabled flag and by
//! the configured cache-store route. The flag is derived from the weekly
//! schedule and written only from the agent's mailbox and tick handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::config::{config_value, CACHE_HOST_KEY};
use crate::domain::models::exchange::build_url;
use crate::domain::models::{
    CacheSettings, ConfigContent, ExchangeRequest, ExchangeResponse, LifecycleState, Message,
    Status, CACHED_HEADER, REQUEST_ID_HEADER,
};
use crate::domain::ports::{Exchange, Link, Notifier, ScheduleSource, SharedExchange};
use crate::services::agent_runtime::{AgentBehavior, AgentOptions, AgentRuntime};
use crate::services::outbound::{strip_hop_by_hop, OutboundExecutor, RequestContext};
use crate::services::route_table::{RouteEntry, RouteTable};

pub const CACHE_AGENT_NAME: &str = "intermediary:agent/cache";

/// Route holding the cache-store host and exchange.
pub const CACHE_ROUTE: &str = "cache";

/// State shared between the cache agent's background task and its pipeline.
pub struct CacheCore {
    enabled: AtomicBool,
    settings: RwLock<Arc<CacheSettings>>,
    routes: RouteTable,
    executor: OutboundExecutor,
    notifier: Arc<dyn Notifier>,
    schedule_source: RwLock<Option<Arc<dyn ScheduleSource>>>,
}

impl CacheCore {
    fn new(options: &AgentOptions) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            settings: RwLock::new(Arc::new(CacheSettings::default())),
            routes: RouteTable::with_route(CACHE_ROUTE, options.transport.clone()),
            executor: OutboundExecutor::new(options.access_log.clone()),
            notifier: options.notifier.clone(),
            schedule_source: RwLock::new(None),
        }
    }

    fn settings(&self) -> Arc<CacheSettings> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn has_schedule_source(&self) -> bool {
        self.schedule_source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn report(&self, err: &ExchangeError) {
        self.notifier
            .notify(Status::from_error(err).with_agent(CACHE_AGENT_NAME));
    }

    fn apply(&self, content: ConfigContent) -> ExchangeResult<()> {
        match content {
            ConfigContent::Exchange(exchange) => {
                self.routes.modify(CACHE_ROUTE, None, Some(exchange));
            }
            ConfigContent::Map(m) => {
                if m.is_empty() {
                    return Err(ExchangeError::config("configuration", "no settings supplied"));
                }
                // Held across read-merge-write so concurrent partial updates
                // compose.
                let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
                let next = settings.merged(&m)?;
                if let Some(host) = config_value(&m, CACHE_HOST_KEY) {
                    self.routes.modify(CACHE_ROUTE, Some(host), None);
                }
                let rescheduled = next.schedule != settings.schedule;
                let schedule = next.schedule;
                *settings = Arc::new(next);

                // configure runs on the flag's single writer
                if rescheduled && !self.has_schedule_source() {
                    self.enabled.store(schedule.now(), Ordering::Release);
                }
            }
        }
        Ok(())
    }

    /// Cache route, if it is configured and `req` may be served from cache.
    fn admit(&self, req: &ExchangeRequest) -> Option<Arc<RouteEntry>> {
        if req.method != Method::GET || has_no_cache(&req.headers) || !self.is_enabled() {
            return None;
        }
        self.routes
            .lookup(CACHE_ROUTE)
            .filter(|route| route.is_configured())
    }

    fn context(&self, route: &RouteEntry, settings: &CacheSettings) -> RequestContext {
        RequestContext {
            route: CACHE_ROUTE.to_string(),
            timeout: settings.timeout,
            log: true,
            exchange: route.exchange.clone(),
        }
    }

    async fn write_back(
        self: Arc<Self>,
        ctx: RequestContext,
        url: String,
        mut headers: HeaderMap,
        body: Bytes,
        cache_control: Option<String>,
    ) {
        strip_hop_by_hop(&mut headers);
        if let Some(directive) = cache_control.and_then(|d| HeaderValue::from_str(&d).ok()) {
            headers.insert(CACHE_CONTROL, directive);
        }

        match self.executor.execute(&ctx, "PUT", &url, headers, body).await {
            Ok(resp) if resp.status.is_success() => {
                debug!(url = %url, "cache write-back stored");
            }
            Ok(resp) => self.report(&ExchangeError::Upstream {
                status: resp.status,
                message: format!("cache store rejected write-back for {url}"),
            }),
            Err(e) => self.report(&e),
        }
    }
}

impl AgentBehavior for CacheCore {
    fn configure(&self, content: ConfigContent) -> Status {
        match self.apply(content) {
            Ok(()) => Status::ok().with_agent(CACHE_AGENT_NAME),
            Err(e) => {
                warn!(agent = CACHE_AGENT_NAME, error = %e, "configuration rejected");
                Status::from_error(&e).with_agent(CACHE_AGENT_NAME)
            }
        }
    }

    fn tick_interval(&self) -> Duration {
        self.settings().interval
    }

    fn on_tick(&self) -> ExchangeResult<()> {
        let source = self
            .schedule_source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let schedule = match source {
            Some(source) => source.resolve()?,
            None => self.settings().schedule,
        };

        let enabled = schedule.now();
        if self.enabled.swap(enabled, Ordering::AcqRel) != enabled {
            debug!(agent = CACHE_AGENT_NAME, enabled, "cache admission changed");
        }
        Ok(())
    }
}

fn has_no_cache(headers: &HeaderMap) -> bool {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
}

/// The cache-aside agent.
pub struct CacheAgent {
    runtime: AgentRuntime<CacheCore>,
}

impl CacheAgent {
    /// Agent over a network transport with tracing-backed collaborators.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_options(AgentOptions::over_http()?))
    }

    pub fn with_options(options: AgentOptions) -> Self {
        let core = Arc::new(CacheCore::new(&options));
        Self {
            runtime: AgentRuntime::new(
                CACHE_AGENT_NAME,
                core,
                options.notifier,
                options.mailbox_capacity,
            ),
        }
    }

    /// Evaluate this source instead of the configured schedule on each tick.
    pub fn set_schedule_source(&self, source: Arc<dyn ScheduleSource>) {
        *self
            .runtime
            .behavior()
            .schedule_source
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(source);
    }

    pub fn name(&self) -> &str {
        self.runtime.name()
    }

    pub fn send(&self, msg: Message) {
        self.runtime.send(msg);
    }

    pub async fn configure(&self, content: ConfigContent) -> Status {
        self.runtime.configure(content).await
    }

    pub fn state(&self) -> LifecycleState {
        self.runtime.state()
    }

    pub fn subscribe_state(&self) -> tokio::sync::watch::Receiver<LifecycleState> {
        self.runtime.subscribe_state()
    }

    pub async fn stopped(&self) {
        self.runtime.stopped().await;
    }

    /// Current value of the enabled flag.
    pub fn is_enabled(&self) -> bool {
        self.runtime.behavior().is_enabled()
    }

    /// Configured cache-store host, if any.
    pub fn host(&self) -> Option<String> {
        self.runtime
            .behavior()
            .routes
            .lookup(CACHE_ROUTE)
            .filter(|route| route.is_configured())
            .map(|route| route.target.clone())
    }

    pub fn timeout(&self) -> Duration {
        self.runtime.behavior().settings().timeout
    }

    pub fn settings(&self) -> Arc<CacheSettings> {
        self.runtime.behavior().settings()
    }

    /// Whether `req` would currently be served through the cache.
    pub fn cacheable(&self, req: &ExchangeRequest) -> bool {
        self.runtime.behavior().admit(req).is_some()
    }
}

impl Link for CacheAgent {
    fn link(&self, next: Option<SharedExchange>) -> SharedExchange {
        Arc::new(CacheExchange {
            core: self.runtime.behavior().clone(),
            next,
        })
    }
}

struct CacheExchange {
    core: Arc<CacheCore>,
    next: Option<SharedExchange>,
}

impl CacheExchange {
    async fn call_next(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        match &self.next {
            Some(next) => next.exchange(req).await,
            None => Ok(ExchangeResponse::new(StatusCode::NO_CONTENT)),
        }
    }
}

#[async_trait]
impl Exchange for CacheExchange {
    async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        let Some(route) = self.core.admit(&req) else {
            return self.call_next(req).await;
        };

        let settings = self.core.settings();
        let url = match build_url(&route.target, req.url.path(), req.url.query()) {
            Ok(url) => url.to_string(),
            Err(e) => {
                self.core.report(&e);
                return self.call_next(req).await;
            }
        };
        let ctx = self.core.context(&route, &settings);
        let request_id = req.headers.get(REQUEST_ID_HEADER).cloned();

        let mut lookup_headers = HeaderMap::new();
        if let Some(id) = &request_id {
            lookup_headers.insert(REQUEST_ID_HEADER, id.clone());
        }
        match self
            .core
            .executor
            .execute(&ctx, "GET", &url, lookup_headers, Bytes::new())
            .await
        {
            Ok(mut hit) if hit.status == StatusCode::OK => {
                hit.set_header(CACHED_HEADER, "true");
                return Ok(hit);
            }
            Ok(_) => {}
            Err(e) => self.core.report(&e),
        }

        if self.next.is_none() {
            return Ok(ExchangeResponse::new(StatusCode::NO_CONTENT));
        }
        let mut resp = self.call_next(req).await?;
        resp.set_header(CACHED_HEADER, "false");
        if resp.status != StatusCode::OK {
            return Ok(resp);
        }

        let body = match resp.buffer().await {
            Ok(body) => body,
            Err(e) => {
                self.core.report(&e);
                return Err(e);
            }
        };
        let mut headers = resp.headers.clone();
        headers.remove(CACHED_HEADER);
        if let Some(id) = request_id {
            headers.insert(REQUEST_ID_HEADER, id);
        }
        tokio::spawn(self.core.clone().write_back(
            ctx,
            url,
            headers,
            body,
            settings.cache_control.clone(),
        ));
        Ok(resp)
    }
}
