//! Actor runtime shared by the agents.
//!
//! Each agent owns one mailbox and, after `Startup`, one background task.
//! The task is the only consumer of the mailbox and the only writer of the
//! lifecycle state past `Running`; it waits on the ticker and the mailbox
//! with a single `select!`, so an idle agent costs nothing.
//!
//! Mailbox backpressure: the mailbox is bounded. `send` never blocks; when
//! the mailbox is full the message is dropped with a warning, and a dropped
//! `Configure` surfaces to its sender as a closed reply channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::models::{ConfigContent, LifecycleState, Message, Status};
use crate::domain::ports::{AccessLog, Notifier, SharedExchange};
use crate::infrastructure::http::HttpTransport;
use crate::services::access_log::TracingAccessLog;
use crate::services::event_notifier::TracingNotifier;

/// Default mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Agent-specific behavior driven by the runtime.
pub trait AgentBehavior: Send + Sync + 'static {
    /// Apply a configuration update and return the reply status.
    fn configure(&self, content: ConfigContent) -> Status;

    /// Period of the background ticker; re-read after every tick and
    /// configuration change.
    fn tick_interval(&self) -> Duration;

    /// Periodic work. An error is reported to the notifier and the loop
    /// continues.
    fn on_tick(&self) -> ExchangeResult<()> {
        Ok(())
    }
}

/// Collaborators handed to an agent at construction.
#[derive(Clone)]
pub struct AgentOptions {
    pub notifier: Arc<dyn Notifier>,
    pub access_log: Arc<dyn AccessLog>,
    /// Exchange installed on routes until a configuration message replaces it.
    pub transport: SharedExchange,
    pub mailbox_capacity: usize,
}

impl AgentOptions {
    /// Options over `transport` with tracing-backed notification and access
    /// logging.
    pub fn new(transport: SharedExchange) -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            access_log: Arc::new(TracingAccessLog),
            transport,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    /// Options over a network [`HttpTransport`].
    pub fn over_http() -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new()?)))
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_access_log(mut self, access_log: Arc<dyn AccessLog>) -> Self {
        self.access_log = access_log;
        self
    }

    #[must_use]
    pub const fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }
}

/// Mailbox, lifecycle and background loop of one agent.
pub struct AgentRuntime<B: AgentBehavior> {
    name: Arc<str>,
    behavior: Arc<B>,
    notifier: Arc<dyn Notifier>,
    mailbox: mpsc::Sender<Message>,
    inbox: Mutex<Option<mpsc::Receiver<Message>>>,
    state: Arc<watch::Sender<LifecycleState>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<B: AgentBehavior> AgentRuntime<B> {
    pub fn new(
        name: impl Into<Arc<str>>,
        behavior: Arc<B>,
        notifier: Arc<dyn Notifier>,
        mailbox_capacity: usize,
    ) -> Self {
        let (mailbox, inbox) = mpsc::channel(mailbox_capacity.max(1));
        let (state, _) = watch::channel(LifecycleState::Unconfigured);
        Self {
            name: name.into(),
            behavior,
            notifier,
            mailbox,
            inbox: Mutex::new(Some(inbox)),
            state: Arc::new(state),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn behavior(&self) -> &Arc<B> {
        &self.behavior
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Deliver a message.
    ///
    /// `Configure` is applied inline before `Startup` and through the
    /// mailbox afterwards. `Startup` is handled here. Other messages are
    /// dropped before `Startup` and queued afterwards.
    ///
    /// Inline handling holds the inbox lock, which `startup` also takes, so
    /// pre-startup configuration is serialized and never overlaps the
    /// background task.
    ///
    /// `Startup` must be sent from within a tokio runtime.
    pub fn send(&self, msg: Message) {
        if matches!(msg, Message::Startup) {
            self.startup();
            return;
        }

        let slot = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            drop(slot);
            self.enqueue(msg);
            return;
        }
        match msg {
            Message::Configure { content, reply } => {
                let status = self.behavior.configure(content);
                if let Some(reply) = reply {
                    let _ = reply.send(status);
                }
            }
            msg => {
                debug!(agent = %self.name, event = msg.event(), "agent not started, dropping message");
            }
        }
    }

    /// Send a configuration update and wait for its reply status.
    pub async fn configure(&self, content: ConfigContent) -> Status {
        let (msg, reply) = Message::configure_with_reply(content);
        self.send(msg);
        reply.await.unwrap_or_else(|_| {
            Status::from_error(&ExchangeError::config("mailbox", "agent is not accepting messages"))
                .with_agent(self.name.as_ref())
        })
    }

    /// Wait until the background task has exited.
    pub async fn stopped(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(LifecycleState::is_terminal).await;
    }

    fn enqueue(&self, msg: Message) {
        let event = msg.event();
        match self.mailbox.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(agent = %self.name, event, "mailbox full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(agent = %self.name, event, "mailbox closed, dropping message");
            }
        }
    }

    fn startup(&self) {
        let mut slot = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(inbox) = slot.take() else {
            return;
        };
        self.state.send_replace(LifecycleState::Running);

        let handle = tokio::spawn(attend(
            self.name.clone(),
            self.behavior.clone(),
            self.notifier.clone(),
            inbox,
            self.state.clone(),
        ));
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}

impl<B: AgentBehavior> Drop for AgentRuntime<B> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = time::interval_at(Instant::now(), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn attend<B: AgentBehavior>(
    name: Arc<str>,
    behavior: Arc<B>,
    notifier: Arc<dyn Notifier>,
    mut inbox: mpsc::Receiver<Message>,
    state: Arc<watch::Sender<LifecycleState>>,
) {
    debug!(agent = %name, "agent started");
    let mut period = behavior.tick_interval();
    let mut ticks = ticker(period);
    let mut paused = false;

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if paused {
                    continue;
                }
                debug!(agent = %name, "tick");
                if let Err(e) = behavior.on_tick() {
                    notifier.notify(Status::from_error(&e).with_agent(name.as_ref()));
                }
            }
            msg = inbox.recv() => {
                let Some(msg) = msg else { break };
                debug!(agent = %name, event = msg.event(), "dispatch");
                match msg {
                    Message::Configure { content, reply } => {
                        let status = behavior.configure(content);
                        if let Some(reply) = reply {
                            let _ = reply.send(status);
                        }
                    }
                    Message::Pause => {
                        paused = true;
                        state.send_replace(LifecycleState::Paused);
                    }
                    Message::Resume => {
                        paused = false;
                        state.send_replace(LifecycleState::Running);
                    }
                    Message::Shutdown => {
                        inbox.close();
                        break;
                    }
                    Message::Startup => {}
                }
            }
        }

        let next = behavior.tick_interval();
        if next != period && !next.is_zero() {
            period = next;
            ticks = time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }
    }

    state.send_replace(LifecycleState::ShutDown);
    debug!(agent = %name, "agent shut down");
}
