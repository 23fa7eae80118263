//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Bridge service
//!
//! The BridgeService is the main entry point. It wires the registry,
//! poller, lifecycle controller, router and multiplexer together, and is
//! driven by the embedding chat application.

use crate::{
    BridgeConfig, BridgeError, BridgeMetrics, ChannelName, ChatTransport, Command,
    CommandContext, CommandHandler, CommandOutcome, ConnectionInfo, ConnectionRegistry,
    ConnectionStatus, EventRouter, InboundMessage, LifecycleController, PollMultiplexer, Poller,
    Result, ServerId, SessionPoller, relay_line,
};
use soapbridge_adminport::{AdminConnector, AdminPacket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Chat to admin-port bridge
///
/// # Example
///
/// ```no_run
/// use soapbridge_service::{BridgeConfig, BridgeService, ChatTransport};
/// use soapbridge_adminport::AdminConnector;
/// use std::sync::Arc;
///
/// async fn run(
///     connector: Arc<dyn AdminConnector>,
///     chat: Arc<dyn ChatTransport>,
/// ) -> Result<(), Box<dyn std::error::Error>> {
///     let config = BridgeConfig::load("soapbridge.toml")?;
///     let bridge = BridgeService::new(config, connector, chat)?;
///     bridge.start().await?;
///
///     // Feed chat traffic with handle_message / handle_command ...
///
///     bridge.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct BridgeService {
    config: BridgeConfig,
    registry: Arc<ConnectionRegistry>,
    poller: Arc<dyn Poller>,
    lifecycle: Arc<LifecycleController>,
    multiplexer: Arc<PollMultiplexer>,
    commands: CommandHandler,
    chat: Arc<dyn ChatTransport>,
    metrics: Arc<BridgeMetrics>,
    running: AtomicBool,
    worker: tokio::sync::Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl BridgeService {
    /// Create a bridge using the session-backed poller
    ///
    /// One disconnected connection is created per configured server.
    pub fn new(
        config: BridgeConfig,
        connector: Arc<dyn AdminConnector>,
        chat: Arc<dyn ChatTransport>,
    ) -> Result<Self> {
        Self::with_poller(config, connector, chat, Arc::new(SessionPoller::new()))
    }

    /// Create a bridge with a custom poller
    pub fn with_poller(
        config: BridgeConfig,
        connector: Arc<dyn AdminConnector>,
        chat: Arc<dyn ChatTransport>,
        poller: Arc<dyn Poller>,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(BridgeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(EventRouter::new(chat.clone(), metrics.clone()));
        let lifecycle = Arc::new(LifecycleController::new(
            registry.clone(),
            poller.clone(),
            connector,
            chat.clone(),
            router.clone(),
            metrics.clone(),
        ));
        for server in &config.servers {
            lifecycle.create(server.clone())?;
        }
        let multiplexer = Arc::new(PollMultiplexer::new(
            registry.clone(),
            poller.clone(),
            lifecycle.clone(),
            router,
            metrics.clone(),
            config.poll_timeout,
            config.idle_interval,
        ));
        let commands = CommandHandler::new(
            registry.clone(),
            lifecycle.clone(),
            chat.clone(),
            config.rcon_max_length,
        );

        Ok(Self {
            config,
            registry,
            poller,
            lifecycle,
            multiplexer,
            commands,
            chat,
            metrics,
            running: AtomicBool::new(false),
            worker: tokio::sync::Mutex::new(None),
        })
    }

    /// Start the multiplexer and auto-connect joined channels
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::ServiceAlreadyRunning);
        }
        info!(servers = self.registry.len(), "Starting bridge");
        self.lifecycle.reopen();

        let token = CancellationToken::new();
        let handle = self.multiplexer.clone().spawn(token.clone());
        *self.worker.lock().await = Some((token, handle));

        for connection in self.registry.all() {
            if connection.config().auto_connect() && self.chat.is_joined(connection.channel()) {
                if let Err(e) = self.lifecycle.connect(connection.id(), None).await {
                    warn!(server_id = %connection.id(), error = %e, "Auto-connect failed");
                }
            }
        }
        Ok(())
    }

    /// Notify the bridge that the bot joined a channel
    ///
    /// Connects the bound server if the bridge is running and the server is
    /// configured to auto-connect and currently disconnected. Returns `true`
    /// if a connect was attempted.
    pub async fn on_channel_joined(&self, channel: &ChannelName) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(connection) = self.registry.find_by_channel(channel) else {
            return false;
        };
        if !connection.config().auto_connect()
            || connection.status() != ConnectionStatus::Disconnected
        {
            return false;
        }
        if let Err(e) = self.lifecycle.connect(connection.id(), None).await {
            debug!(server_id = %connection.id(), error = %e, "Auto-connect on join failed");
        }
        true
    }

    /// Execute a chat command
    ///
    /// Commands are ignored with [`CommandOutcome::Unresolved`] once the
    /// bridge has been shut down.
    pub async fn handle_command(
        &self,
        context: &CommandContext,
        command: Command,
    ) -> CommandOutcome {
        if self.lifecycle.is_closed() {
            debug!(command = ?command, "Ignoring command after shutdown");
            return CommandOutcome::Unresolved;
        }
        self.commands.execute(context, command).await
    }

    /// Relay a channel line into the bound game
    ///
    /// Lines starting with a command trigger character are never relayed.
    /// Returns `true` if the line was sent.
    pub async fn handle_message(&self, message: &InboundMessage) -> bool {
        if self.config.is_command(&message.text) {
            return false;
        }
        let Some(connection) = self.registry.find_by_channel(&message.channel) else {
            return false;
        };
        if !connection.is_connected() {
            return false;
        }
        match connection
            .send(AdminPacket::broadcast_chat(relay_line(message)))
            .await
        {
            Ok(()) => {
                self.metrics.message_relayed();
                true
            }
            Err(e) => {
                warn!(server_id = %connection.id(), error = %e, "Failed to relay chat line");
                false
            }
        }
    }

    /// Reconnect a server that is not connected
    ///
    /// Fails with [`BridgeError::ServiceNotRunning`] after shutdown.
    pub async fn reconnect(&self, id: &ServerId) -> Result<()> {
        self.lifecycle.reconnect(id, None).await
    }

    /// Stop the multiplexer and close every connection
    ///
    /// Returns [`BridgeError::CleanupFailed`] if a session could not be
    /// closed or a socket stayed registered.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::ServiceNotRunning);
        }
        info!("Shutting down bridge");

        if let Some((token, handle)) = self.worker.lock().await.take() {
            token.cancel();
            let abort = handle.abort_handle();
            match tokio::time::timeout(WORKER_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Multiplexer task failed"),
                Err(_) => {
                    error!("Multiplexer did not stop in time, aborting");
                    abort.abort();
                }
            }
        }

        self.lifecycle.shutdown_all().await?;
        info!("Bridge shutdown complete");
        Ok(())
    }

    /// Check if the bridge is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get snapshots of all connections
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.registry.all().iter().map(|c| c.info()).collect()
    }

    /// Get the bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Get the connection registry
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Get the poller
    pub fn poller(&self) -> Arc<dyn Poller> {
        self.poller.clone()
    }

    /// Get the lifecycle controller
    pub fn lifecycle(&self) -> Arc<LifecycleController> {
        self.lifecycle.clone()
    }

    /// Get the multiplexer
    pub fn multiplexer(&self) -> Arc<PollMultiplexer> {
        self.multiplexer.clone()
    }

    /// Get the bridge metrics
    pub fn metrics(&self) -> Arc<BridgeMetrics> {
        self.metrics.clone()
    }
}

impl std::fmt::Debug for BridgeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeService")
            .field("running", &self.is_running())
            .field("connections", &self.registry.len())
            .field("registered", &self.poller.registered_count())
            .finish()
    }
}

impl Drop for BridgeService {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            warn!("BridgeService dropped while still running");
            if let Ok(mut worker) = self.worker.try_lock() {
                if let Some((token, _)) = worker.take() {
                    token.cancel();
                }
            }
        }
    }
}
