//! Pipeline terminus forwarding requests to a single backend host.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, HOST};
use reqwest::StatusCode;
use tracing::warn;

use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::config::{config_value, APP_HOST_KEY};
use crate::domain::models::exchange::{build_url, format_duration};
use crate::domain::models::{
    ConfigContent, ExchangeRequest, ExchangeResponse, LifecycleState, Message, RoutingSettings,
    Status, TIMEOUT_HEADER,
};
use crate::domain::ports::{Exchange, Link, Notifier, SharedExchange};
use crate::services::agent_runtime::{AgentBehavior, AgentOptions, AgentRuntime};
use crate::services::outbound::{strip_hop_by_hop, OutboundExecutor, RequestContext};
use crate::services::route_table::RouteTable;

pub const ROUTING_AGENT_NAME: &str = "intermediary:agent/routing";

/// Default route holding the backend host and exchange.
pub const APP_ROUTE: &str = "app";

const HOST_NOT_CONFIGURED: &str = "host configuration is empty";

/// The routing agent has no periodic work; its loop only drains the mailbox.
const IDLE_TICK: Duration = Duration::from_secs(60);

pub struct RoutingCore {
    settings: RwLock<Arc<RoutingSettings>>,
    routes: RouteTable,
    executor: OutboundExecutor,
    notifier: Arc<dyn Notifier>,
}

impl RoutingCore {
    fn new(options: &AgentOptions) -> Self {
        Self {
            settings: RwLock::new(Arc::new(RoutingSettings::default())),
            routes: RouteTable::with_route(APP_ROUTE, options.transport.clone()),
            executor: OutboundExecutor::new(options.access_log.clone()),
            notifier: options.notifier.clone(),
        }
    }

    fn settings(&self) -> Arc<RoutingSettings> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn apply(&self, content: ConfigContent) -> ExchangeResult<()> {
        match content {
            ConfigContent::Exchange(exchange) => {
                self.routes.modify(APP_ROUTE, None, Some(exchange));
            }
            ConfigContent::Map(m) => {
                if m.is_empty() {
                    return Err(ExchangeError::config("configuration", "no settings supplied"));
                }
                let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
                let next = settings.merged(&m)?;
                if let Some(host) = config_value(&m, APP_HOST_KEY) {
                    self.routes.modify(APP_ROUTE, Some(host), None);
                }
                *settings = Arc::new(next);
            }
        }
        Ok(())
    }

    async fn forward(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        let route = self
            .routes
            .lookup(APP_ROUTE)
            .filter(|route| route.is_configured())
            .ok_or_else(|| ExchangeError::InvalidArgument(HOST_NOT_CONFIGURED.to_string()))?;
        let settings = self.settings();
        let url = build_url(&route.target, req.url.path(), req.url.query())?;

        let mut headers = req.headers;
        headers.remove(HOST);
        strip_hop_by_hop(&mut headers);
        normalize_content_encoding(&mut headers);

        let ctx = RequestContext {
            route: settings.route_name.clone(),
            timeout: settings.timeout,
            log: settings.log,
            exchange: route.exchange.clone(),
        };
        let mut resp = self
            .executor
            .execute(&ctx, req.method.as_str(), url.as_str(), headers, req.body)
            .await?;
        if resp.status == StatusCode::GATEWAY_TIMEOUT {
            resp.set_header(TIMEOUT_HEADER, &format_duration(settings.timeout));
        }
        Ok(resp)
    }
}

impl AgentBehavior for RoutingCore {
    fn configure(&self, content: ConfigContent) -> Status {
        match self.apply(content) {
            Ok(()) => Status::ok().with_agent(ROUTING_AGENT_NAME),
            Err(e) => {
                warn!(agent = ROUTING_AGENT_NAME, error = %e, "configuration rejected");
                Status::from_error(&e).with_agent(ROUTING_AGENT_NAME)
            }
        }
    }

    fn tick_interval(&self) -> Duration {
        IDLE_TICK
    }
}

/// Lower-case the content coding and drop `identity`, which means none.
fn normalize_content_encoding(headers: &mut HeaderMap) {
    let Some(coding) = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase())
    else {
        headers.remove(CONTENT_ENCODING);
        return;
    };
    if coding.is_empty() || coding == "identity" {
        headers.remove(CONTENT_ENCODING);
    } else if let Ok(value) = HeaderValue::from_str(&coding) {
        headers.insert(CONTENT_ENCODING, value);
    }
}

/// The routing agent.
pub struct RoutingAgent {
    runtime: AgentRuntime<RoutingCore>,
}

impl RoutingAgent {
    /// Agent over a network transport with tracing-backed collaborators.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_options(AgentOptions::over_http()?))
    }

    pub fn with_options(options: AgentOptions) -> Self {
        let core = Arc::new(RoutingCore::new(&options));
        Self {
            runtime: AgentRuntime::new(
                ROUTING_AGENT_NAME,
                core,
                options.notifier,
                options.mailbox_capacity,
            ),
        }
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

    pub async fn stopped(&self) {
        self.runtime.stopped().await;
    }

    /// Configured backend host, if any.
    pub fn host(&self) -> Option<String> {
        self.runtime
            .behavior()
            .routes
            .lookup(APP_ROUTE)
            .filter(|route| route.is_configured())
            .map(|route| route.target.clone())
    }

    pub fn timeout(&self) -> Duration {
        self.runtime.behavior().settings().timeout
    }

    pub fn settings(&self) -> Arc<RoutingSettings> {
        self.runtime.behavior().settings()
    }

    /// Forward `req` to the backend.
    ///
    /// Failures are reported to the notifier before being returned; use
    /// [`ExchangeError::to_response`] for the paired response.
    pub async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        forward_reported(self.runtime.behavior(), req).await
    }
}

async fn forward_reported(
    core: &RoutingCore,
    req: ExchangeRequest,
) -> ExchangeResult<ExchangeResponse> {
    let result = core.forward(req).await;
    if let Err(e) = &result {
        core.notifier
            .notify(Status::from_error(e).with_agent(ROUTING_AGENT_NAME));
    }
    result
}

impl Link for RoutingAgent {
    /// The routing agent terminates a pipeline; `next` is ignored.
    fn link(&self, _next: Option<SharedExchange>) -> SharedExchange {
        Arc::new(RoutingExchange {
            core: self.runtime.behavior().clone(),
        })
    }
}

struct RoutingExchange {
    core: Arc<RoutingCore>,
}

#[async_trait]
impl Exchange for RoutingExchange {
    async fn exchange(&self, req: ExchangeRequest) -> ExchangeResult<ExchangeResponse> {
        forward_reported(&self.core, req).await
    }
}
