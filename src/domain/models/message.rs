//! Control messages delivered to an agent's mailbox.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tokio::sync::oneshot;

use super::status::Status;
use crate::domain::ports::SharedExchange;

/// Payload of a configuration message.
#[derive(Clone)]
pub enum ConfigContent {
    /// Flat string-keyed settings; unknown keys and empty values are ignored.
    Map(HashMap<String, String>),
    /// Replacement exchange function for the agent's route.
    Exchange(SharedExchange),
}

impl fmt::Debug for ConfigContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Self::Exchange(_) => f.write_str("Exchange(..)"),
        }
    }
}

/// A message for an agent's mailbox.
#[derive(Debug)]
pub enum Message {
    Configure {
        content: ConfigContent,
        reply: Option<oneshot::Sender<Status>>,
    },
    Startup,
    Shutdown,
    Pause,
    Resume,
}

impl Message {
    pub const CONFIGURE: &'static str = "configure";
    pub const STARTUP: &'static str = "startup";
    pub const SHUTDOWN: &'static str = "shutdown";
    pub const PAUSE: &'static str = "pause";
    pub const RESUME: &'static str = "resume";

    /// Configuration message carrying a settings map, without a reply channel.
    pub fn config_map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Configure {
            content: ConfigContent::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            reply: None,
        }
    }

    /// Configuration message installing an exchange function.
    pub fn config_exchange(exchange: SharedExchange) -> Self {
        Self::Configure {
            content: ConfigContent::Exchange(exchange),
            reply: None,
        }
    }

    /// Configuration message with a reply channel for the resulting status.
    pub fn configure_with_reply(content: ConfigContent) -> (Self, oneshot::Receiver<Status>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::Configure {
                content,
                reply: Some(tx),
            },
            rx,
        )
    }

    pub const fn event(&self) -> &'static str {
        match self {
            Self::Configure { .. } => Self::CONFIGURE,
            Self::Startup => Self::STARTUP,
            Self::Shutdown => Self::SHUTDOWN,
            Self::Pause => Self::PAUSE,
            Self::Resume => Self::RESUME,
        }
    }
}

/// Lifecycle of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Unconfigured,
    Running,
    Paused,
    ShutDown,
}

impl LifecycleState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::ShutDown => "shut_down",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ShutDown)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
