//! Session driver: executes state-machine actions against the real world.
//!
//! One tokio task owns the socket, the timers, and every sans-IO state
//! machine. Commands come in over an mpsc channel, events fan out over a
//! broadcast channel, and all protocol decisions stay inside the state
//! machines; this module only executes the actions they return.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use chatwire_core::{
    ChannelMux, ConnectionAction, ConnectionConfig, ConnectionEvent, ConnectionManager,
    ConnectionState, Environment, EventRouter, HealthConfig, HealthMonitor, Notifier,
    RouteOutcome, RouterConfig,
};
use chatwire_proto::{EVENT_PONG, Frame, conversation_channel};

use crate::{
    env::TokioEnv,
    events::{ChatEvent, SessionCommand},
    transport::{self, Socket, SocketEvent},
};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broker websocket URL.
    pub socket_url: String,
    /// Connection lifecycle and backoff policy.
    pub connection: ConnectionConfig,
    /// Keepalive and stability tuning.
    pub health: HealthConfig,
    /// Routing and reconciliation tuning.
    pub router: RouterConfig,
    /// Minimum spacing between user-facing notices.
    pub notice_cooldown: Duration,
    /// Driver tick resolution for timers.
    pub tick_interval: Duration,
    /// Broadcast buffer size for slow event consumers.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            socket_url: String::new(),
            connection: ConnectionConfig::default(),
            health: HealthConfig::default(),
            router: RouterConfig::default(),
            notice_cooldown: Duration::from_secs(30),
            tick_interval: Duration::from_millis(250),
            event_capacity: 256,
        }
    }
}

/// Session handle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The driver task is gone; commands can no longer be delivered.
    #[error("session closed")]
    Closed,
}

/// Handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<ChatEvent>,
}

impl SessionHandle {
    /// Subscribe to the session's event stream.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// Send a command to the driver.
    ///
    /// # Errors
    ///
    /// - `SessionError::Closed` when the driver task has exited.
    pub async fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).await.map_err(|_| SessionError::Closed)
    }

    /// Follow a conversation's channel.
    ///
    /// # Errors
    ///
    /// - `SessionError::Closed` when the driver task has exited.
    pub async fn subscribe(&self, conversation_id: u64) -> Result<(), SessionError> {
        self.command(SessionCommand::Subscribe { conversation_id }).await
    }

    /// Stop following a conversation's channel.
    ///
    /// # Errors
    ///
    /// - `SessionError::Closed` when the driver task has exited.
    pub async fn unsubscribe(&self, conversation_id: u64) -> Result<(), SessionError> {
        self.command(SessionCommand::Unsubscribe { conversation_id }).await
    }

    /// Set or clear the active conversation.
    ///
    /// # Errors
    ///
    /// - `SessionError::Closed` when the driver task has exited.
    pub async fn set_active_conversation(
        &self,
        conversation_id: Option<u64>,
    ) -> Result<(), SessionError> {
        self.command(SessionCommand::SetActiveConversation(conversation_id)).await
    }

    /// Reconnect immediately, resetting the retry record.
    ///
    /// # Errors
    ///
    /// - `SessionError::Closed` when the driver task has exited.
    pub async fn force_reconnect(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::ForceReconnect).await
    }

    /// Tear the session down permanently.
    ///
    /// # Errors
    ///
    /// - `SessionError::Closed` when the driver task has already exited.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Shutdown).await
    }
}

/// Spawn a session driver task and return its handle.
#[must_use]
pub fn spawn(config: SessionConfig) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(config.event_capacity);

    let driver = SessionDriver {
        env: TokioEnv,
        manager: ConnectionManager::new(config.connection.clone()),
        mux: ChannelMux::new(),
        health: HealthMonitor::new(config.health.clone()),
        router: EventRouter::new(config.router.clone()),
        notifier: Notifier::new(config.notice_cooldown),
        socket: None,
        reconnect_at: None,
        events: event_tx.clone(),
        config,
    };
    tokio::spawn(driver.run(command_rx));

    SessionHandle { commands: command_tx, events: event_tx }
}

struct SessionDriver {
    env: TokioEnv,
    config: SessionConfig,
    manager: ConnectionManager<Instant>,
    mux: ChannelMux,
    health: HealthMonitor<Instant>,
    router: EventRouter<Instant>,
    notifier: Notifier<Instant>,
    socket: Option<Socket>,
    reconnect_at: Option<Instant>,
    events: broadcast::Sender<ChatEvent>,
}

impl SessionDriver {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        match self.manager.open(self.config.socket_url.clone()) {
            Ok(actions) => self.execute(actions).await,
            Err(err) => {
                tracing::error!(%err, "initial open rejected");
                return;
            },
        }

        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        // All handles dropped: same as an explicit shutdown
                        let actions = self.manager.close();
                        self.execute(actions).await;
                        break;
                    };
                    if self.handle_command(command).await {
                        break;
                    }
                }
                event = Self::next_socket_event(&mut self.socket) => {
                    self.on_socket_event(event).await;
                }
                _ = tick.tick() => {
                    self.on_tick().await;
                }
            }
        }
        tracing::info!("session driver stopped");
    }

    /// Pending forever while no socket is attached.
    async fn next_socket_event(socket: &mut Option<Socket>) -> SocketEvent {
        match socket {
            Some(live) => live.from_server.recv().await.unwrap_or(SocketEvent::Closed),
            None => std::future::pending().await,
        }
    }

    /// Returns `true` on shutdown.
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        let connected = self.manager.state() == ConnectionState::Connected;
        match command {
            SessionCommand::Subscribe { conversation_id } => {
                if let Some(frame) = self.mux.add(conversation_channel(conversation_id), connected)
                {
                    let actions = self.manager.send(frame);
                    self.execute(actions).await;
                }
            },
            SessionCommand::Unsubscribe { conversation_id } => {
                if let Some(frame) =
                    self.mux.remove(&conversation_channel(conversation_id), connected)
                {
                    let actions = self.manager.send(frame);
                    self.execute(actions).await;
                }
            },
            SessionCommand::SetActiveConversation(conversation_id) => {
                self.router.set_active_conversation(conversation_id);
            },
            SessionCommand::SendFrame(frame) => {
                let actions = self.manager.send(frame);
                self.execute(actions).await;
            },
            SessionCommand::ForceReconnect => {
                self.reconnect_at = None;
                let actions = self.manager.force_reconnect();
                self.execute(actions).await;
            },
            SessionCommand::Shutdown => {
                let actions = self.manager.close();
                self.execute(actions).await;
                return true;
            },
        }
        false
    }

    async fn on_socket_event(&mut self, event: SocketEvent) {
        let now = self.env.now();
        match event {
            SocketEvent::Frame(frame) => {
                self.health.record_received();
                match self.router.route(frame, now) {
                    RouteOutcome::Message(message) => {
                        let _ = self.events.send(ChatEvent::Message(message));
                    },
                    RouteOutcome::Control(frame) => {
                        if frame.event == EVENT_PONG {
                            self.health.on_pong(now);
                        }
                    },
                    RouteOutcome::Passthrough(frame) => {
                        let _ = self.events.send(ChatEvent::Frame(frame));
                    },
                    RouteOutcome::Dropped => {},
                }
            },
            SocketEvent::Closed => {
                if let Some(socket) = self.socket.take() {
                    socket.stop();
                }
                self.mux.mark_disconnected();
                self.health.on_disconnected(now);
                let actions = self.manager.handle(ConnectionEvent::SocketClosed { now });
                self.execute(actions).await;
            },
        }
    }

    async fn on_tick(&mut self) {
        let now = self.env.now();

        if self.reconnect_at.is_some_and(|at| now >= at) {
            self.reconnect_at = None;
            let actions = self.manager.handle(ConnectionEvent::ReconnectElapsed);
            self.execute(actions).await;
        }

        let connected = self.manager.state() == ConnectionState::Connected;
        if let Some(ping) = self.health.tick(now, self.env.now_unix_ms(), connected) {
            let actions = self.manager.send(ping);
            self.execute(actions).await;
            let sample = self.health.sample(now, self.manager.backoff().consecutive_failures);
            let _ = self.events.send(ChatEvent::Health(sample));
        }

        if self.router.tick(now)
            && let Some(conversation_id) = self.router.active_conversation()
        {
            let _ = self.events.send(ChatEvent::ReconcileDue { conversation_id });
        }
    }

    /// Execute actions, queueing the follow-ups each execution produces.
    async fn execute(&mut self, actions: Vec<ConnectionAction>) {
        let mut queue: VecDeque<ConnectionAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                ConnectionAction::OpenSocket { url } => {
                    queue.extend(self.open_socket(&url).await);
                },
                ConnectionAction::SendFrame(frame) => self.send_frame(frame).await,
                ConnectionAction::CloseSocket => {
                    if let Some(socket) = self.socket.take() {
                        socket.stop();
                    }
                },
                ConnectionAction::ScheduleReconnect { delay } => {
                    self.reconnect_at = Some(self.env.now() + delay);
                },
                ConnectionAction::EmitState(state) => {
                    let _ = self.events.send(ChatEvent::Connection(state));
                },
                ConnectionAction::Notify(notice) => {
                    if let Some(notice) = self.notifier.offer(notice, self.env.now()) {
                        let _ = self.events.send(ChatEvent::Notice(notice));
                    }
                },
            }
        }
    }

    async fn open_socket(&mut self, url: &str) -> Vec<ConnectionAction> {
        match transport::connect(url).await {
            Ok(socket) => {
                self.socket = Some(socket);
                let now = self.env.now();
                self.health.on_connected(now);

                let mut actions = self.manager.handle(ConnectionEvent::SocketOpened { now });
                // Desired-set resync restores subscriptions after reconnect
                for frame in self.mux.resync() {
                    actions.extend(self.manager.send(frame));
                }
                actions
            },
            Err(err) => {
                tracing::warn!(%err, url, "socket open failed");
                self.manager.handle(ConnectionEvent::SocketClosed { now: self.env.now() })
            },
        }
    }

    async fn send_frame(&mut self, frame: Frame) {
        let Some(socket) = &self.socket else {
            tracing::warn!(event = %frame.event, "no socket, dropping frame");
            return;
        };
        if socket.to_server.send(frame).await.is_ok() {
            self.health.record_sent();
        } else {
            tracing::warn!("socket task gone, dropping frame");
        }
    }
}
