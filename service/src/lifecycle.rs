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

//! Connection lifecycle
//!
//! The LifecycleController owns every membership and state change:
//! - Connect (open, register, handshake)
//! - Graceful disconnect requested by an operator
//! - Forced disconnect requested by the multiplexer
//! - Reconnect by replacement
//! - Shutdown cleanup
//!
//! Operations on one server ID are serialized by a per-ID async lock, so a
//! forced disconnect racing an operator's disconnect produces exactly one
//! notification. Once [`shutdown_all`](LifecycleController::shutdown_all) has
//! started, connects are refused until [`reopen`](LifecycleController::reopen).

use crate::{
    BridgeError, BridgeMetrics, ChatTransport, Connection, ConnectionRegistry, ConnectionStatus,
    EventRouter, Poller, Result, ServerConfig, ServerId, SocketHandle,
};
use dashmap::DashMap;
use soapbridge_adminport::{AdminConnector, AdminEvent, AdminSession, CloseMode, ServerInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};

/// Announcement after a session was opened
pub const CONNECTING: &str = "Connecting";
/// Announcement after a failed connect
pub const CONNECTION_FAILED: &str = "Connection failed.";
/// Announcement after a graceful disconnect
pub const DISCONNECTED: &str = "Disconnected";
/// Announcement after a graceful disconnect whose close failed
pub const DISCONNECTED_UNCLEAN: &str = "Disconnected (connection was not closed cleanly)";
/// Announcement after a forced disconnect
pub const FORCED_DISCONNECT: &str =
    "Error encountered, disconnecting. Contact administrator if this keeps happening";

/// Connection lifecycle controller
pub struct LifecycleController {
    registry: Arc<ConnectionRegistry>,
    poller: Arc<dyn Poller>,
    connector: Arc<dyn AdminConnector>,
    chat: Arc<dyn ChatTransport>,
    router: Arc<EventRouter>,
    metrics: Arc<BridgeMetrics>,
    next_handle: AtomicU64,
    op_locks: DashMap<ServerId, Arc<Mutex<()>>>,
    closed: AtomicBool,
}

impl LifecycleController {
    /// Create a new lifecycle controller
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        poller: Arc<dyn Poller>,
        connector: Arc<dyn AdminConnector>,
        chat: Arc<dyn ChatTransport>,
        router: Arc<EventRouter>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            registry,
            poller,
            connector,
            chat,
            router,
            metrics,
            next_handle: AtomicU64::new(1),
            op_locks: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the next socket handle
    fn next_socket_handle(&self) -> SocketHandle {
        SocketHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    /// Acquire the operation lock for a server ID
    async fn lock(&self, id: &ServerId) -> OwnedMutexGuard<()> {
        let lock = self.op_locks.entry(id.clone()).or_default().clone();
        lock.lock_owned().await
    }

    /// Check if connects are being refused after shutdown
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Accept connects again after a shutdown
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    fn find(&self, id: &ServerId) -> Result<Arc<Connection>> {
        self.registry
            .find_by_id(id)
            .ok_or_else(|| BridgeError::ConnectionNotFound(id.clone()))
    }

    /// Register a new, disconnected connection for a server
    pub fn create(&self, config: ServerConfig) -> Result<Arc<Connection>> {
        let connection = Arc::new(Connection::new(
            Arc::new(config),
            self.next_socket_handle(),
        ));
        self.registry.add(connection.clone())?;
        info!(
            server_id = %connection.id(),
            channel = %connection.channel(),
            handle = %connection.handle(),
            "Connection created"
        );
        Ok(connection)
    }

    /// Connect a disconnected server
    ///
    /// Announcements go to the bound channel and, when it differs, to
    /// `reply_to`. A connection object that already carried a session is
    /// replaced with a fresh one first. Fails with
    /// [`BridgeError::ServiceNotRunning`] after shutdown.
    #[instrument(skip_all, fields(server_id = %id))]
    pub async fn connect(&self, id: &ServerId, reply_to: Option<&str>) -> Result<()> {
        let _guard = self.lock(id).await;
        if self.is_closed() {
            return Err(BridgeError::ServiceNotRunning);
        }
        let connection = self.find(id)?;
        if connection.status() != ConnectionStatus::Disconnected {
            return Err(BridgeError::AlreadyConnected(id.clone()));
        }
        let connection = if connection.is_spent() {
            self.replace_locked(&connection)?
        } else {
            connection
        };
        self.open_locked(&connection, reply_to).await
    }

    /// Gracefully disconnect a server
    ///
    /// Produces exactly one announcement. Fails with
    /// [`BridgeError::NotConnected`] if the server is already disconnected.
    #[instrument(skip_all, fields(server_id = %id))]
    pub async fn disconnect(&self, id: &ServerId, reply_to: Option<&str>) -> Result<()> {
        let _guard = self.lock(id).await;
        let connection = self.find(id)?;
        let status = connection.status();
        if status == ConnectionStatus::Disconnected {
            return Err(BridgeError::NotConnected(id.clone()));
        }

        let closed = self.teardown(&connection, CloseMode::Graceful).await;
        self.metrics
            .graceful_disconnect(status == ConnectionStatus::Connected);
        let text = match closed {
            Ok(()) => {
                info!(handle = %connection.handle(), "Disconnected");
                DISCONNECTED
            }
            Err(e) => {
                warn!(handle = %connection.handle(), error = %e, "Session did not close cleanly");
                DISCONNECTED_UNCLEAN
            }
        };
        self.announce(&connection, text, reply_to).await;
        Ok(())
    }

    /// Forcibly disconnect the connection owning `handle`
    ///
    /// Does nothing if `handle` no longer belongs to the server's current
    /// connection or the connection is already disconnected. Returns `true`
    /// if a disconnect happened.
    #[instrument(skip_all, fields(server_id = %id, handle = %handle))]
    pub async fn force_disconnect(&self, id: &ServerId, handle: SocketHandle) -> bool {
        let _guard = self.lock(id).await;
        let Some(connection) = self.registry.find_by_id(id) else {
            debug!("Connection no longer exists");
            return false;
        };
        let status = connection.status();
        if connection.handle() != handle || status == ConnectionStatus::Disconnected {
            debug!(
                current = %connection.handle(),
                status = %status,
                "Ignoring stale forced disconnect"
            );
            return false;
        }

        if let Err(e) = self.teardown(&connection, CloseMode::Forced).await {
            debug!(error = %e, "Forced close reported an error");
        }
        self.metrics
            .forced_disconnect(status == ConnectionStatus::Connected);
        warn!("Connection lost, disconnected");
        self.announce(&connection, FORCED_DISCONNECT, None).await;
        true
    }

    /// Reconnect a server that is not connected
    ///
    /// The current connection object is retired and replaced by a new one
    /// built from the same configuration, then connected.
    #[instrument(skip_all, fields(server_id = %id))]
    pub async fn reconnect(&self, id: &ServerId, reply_to: Option<&str>) -> Result<()> {
        let _guard = self.lock(id).await;
        if self.is_closed() {
            return Err(BridgeError::ServiceNotRunning);
        }
        let old = self.find(id)?;
        if old.status() == ConnectionStatus::Connected {
            return Err(BridgeError::AlreadyConnected(id.clone()));
        }

        if let Err(e) = self.teardown(&old, CloseMode::Forced).await {
            debug!(error = %e, "Closing retired session failed");
        }

        let fresh = self.replace_locked(&old)?;
        self.open_locked(&fresh, reply_to).await
    }

    /// Refuse further connects, close every connection and verify nothing
    /// stays registered
    ///
    /// A connect already holding a server's lock finishes first and is then
    /// torn down here.
    pub async fn shutdown_all(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let mut failures = Vec::new();
        for id in self.registry.all().iter().map(|c| c.id().clone()) {
            let _guard = self.lock(&id).await;
            // Re-read under the lock; a racing connect may have replaced it.
            let Some(connection) = self.registry.find_by_id(&id) else {
                continue;
            };
            if connection.status() == ConnectionStatus::Disconnected && !connection.is_registered()
            {
                continue;
            }
            if let Err(e) = self.teardown(&connection, CloseMode::Forced).await {
                error!(server_id = %connection.id(), error = %e, "Failed to close session");
                failures.push(format!("{}: {}", connection.id(), e));
            }
        }

        let leaked = self.poller.registered_count();
        if leaked > 0 {
            error!(count = leaked, "Sockets still registered after shutdown");
            failures.push(format!("{} sockets still registered", leaked));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::CleanupFailed(failures.join("; ")))
        }
    }

    /// Build a fresh connection from `old`'s configuration and swap it in
    fn replace_locked(&self, old: &Connection) -> Result<Arc<Connection>> {
        let fresh = Arc::new(Connection::new(
            old.shared_config(),
            self.next_socket_handle(),
        ));
        self.registry.replace(old.id(), fresh.clone())?;
        debug!(
            server_id = %old.id(),
            old = %old.handle(),
            new = %fresh.handle(),
            "Connection replaced"
        );
        Ok(fresh)
    }

    /// Open, register and handshake; the caller holds the operation lock
    async fn open_locked(
        &self,
        connection: &Arc<Connection>,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let id = connection.id().clone();
        let timeout = connection.config().timeout();
        self.metrics.connect_attempted();

        let params = connection.config().session_params();
        let session = match tokio::time::timeout(timeout, self.connector.open(&params)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!(
                    host = %params.host,
                    port = params.port,
                    error = %e,
                    "Failed to open session"
                );
                return self.fail_open(connection, reply_to, BridgeError::Admin(e)).await;
            }
            Err(_) => {
                warn!(host = %params.host, port = params.port, "Timed out opening session");
                let err = BridgeError::ConnectionFailed(id);
                return self.fail_open(connection, reply_to, err).await;
            }
        };

        let registered = connection.open(session.clone(), || {
            self.poller.register(connection.handle(), session.clone())
        });
        if let Err(e) = registered {
            if let Err(close) = session.close(CloseMode::Forced).await {
                debug!(error = %close, "Closing unregistered session failed");
            }
            return self.fail_open(connection, reply_to, e).await;
        }
        info!(handle = %connection.handle(), "Session opened");
        self.announce(connection, CONNECTING, reply_to).await;

        match self.await_welcome(connection, &session).await {
            Ok((info, pending)) => {
                connection.established();
                self.metrics.connection_established();
                info!(name = %info.name, version = %info.version, "Connected");
                let text = format!("Connected to {}({})", info.name, info.version);
                self.announce(connection, &text, reply_to).await;
                for event in pending {
                    self.router.route(connection, &session, event).await;
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Handshake failed");
                if let Err(close) = self.teardown(connection, CloseMode::Forced).await {
                    debug!(error = %close, "Closing failed session reported an error");
                }
                self.fail_open(connection, reply_to, e).await
            }
        }
    }

    async fn fail_open(
        &self,
        connection: &Connection,
        reply_to: Option<&str>,
        err: BridgeError,
    ) -> Result<()> {
        self.metrics.connect_failed();
        self.announce(connection, CONNECTION_FAILED, reply_to).await;
        Err(err)
    }

    /// Read units until the server welcome arrives, bounded by the timeout
    ///
    /// Events preceding the welcome are routed immediately. Events following
    /// it in the same unit are returned for routing after the announcement.
    async fn await_welcome(
        &self,
        connection: &Connection,
        session: &Arc<dyn AdminSession>,
    ) -> Result<(ServerInfo, Vec<AdminEvent>)> {
        let id = connection.id();
        let deadline = tokio::time::Instant::now() + connection.config().timeout();
        loop {
            let events = match tokio::time::timeout_at(deadline, session.receive()).await {
                Err(_) => return Err(BridgeError::HandshakeTimeout(id.clone())),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(None)) => return Err(BridgeError::ConnectionFailed(id.clone())),
                Ok(Ok(Some(events))) => events,
            };

            let mut events = events.into_iter();
            while let Some(event) = events.next() {
                match event {
                    AdminEvent::Welcome(info) => return Ok((info, events.collect())),
                    other => self.router.route(connection, session, other).await,
                }
            }
        }
    }

    /// Deregister and mark disconnected as one step, then close
    ///
    /// Readers of the connection never see a registered Disconnected
    /// connection or an unregistered live one.
    async fn teardown(&self, connection: &Connection, mode: CloseMode) -> Result<()> {
        let session = connection.close(|| self.poller.deregister(connection.handle()));
        match session {
            Some(session) => session.close(mode).await.map_err(BridgeError::from),
            None => Ok(()),
        }
    }

    /// Send a status line to the bound channel and to `reply_to`
    async fn announce(&self, connection: &Connection, text: &str, reply_to: Option<&str>) {
        let channel = connection.channel().as_str();
        self.chat.send_message(channel, text).await;
        if let Some(target) = reply_to {
            if !target.eq_ignore_ascii_case(channel) {
                self.chat.send_message(target, text).await;
            }
        }
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("connections", &self.registry.len())
            .field("registered", &self.poller.registered_count())
            .field("next_handle", &self.next_handle.load(Ordering::Relaxed))
            .finish()
    }
}
