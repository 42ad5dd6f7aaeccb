//! Agent services: the actor runtime, the two pipeline agents and the
//! collaborators they share.

pub mod access_log;
pub mod agent_runtime;
pub mod cache_agent;
pub mod event_notifier;
pub mod outbound;
pub mod route_table;
pub mod routing_agent;

pub use access_log::{NullAccessLog, TracingAccessLog};
pub use agent_runtime::{AgentBehavior, AgentOptions, AgentRuntime, DEFAULT_MAILBOX_CAPACITY};
pub use cache_agent::{CacheAgent, CACHE_AGENT_NAME, CACHE_ROUTE};
pub use event_notifier::{EventNotifier, EventNotifierConfig, TracingNotifier};
pub use outbound::{OutboundExecutor, RequestContext};
pub use route_table::{RouteEntry, RouteTable};
pub use routing_agent::{RoutingAgent, APP_ROUTE, ROUTING_AGENT_NAME};
