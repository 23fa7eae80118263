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

//! Managed connection to one game server
//!
//! A [`Connection`] pairs an immutable [`ServerConfig`] with one socket
//! handle. It goes through at most one Disconnected → Connecting →
//! Connected → Disconnected cycle; reconnecting builds a new `Connection`
//! from the same configuration and swaps it into the registry.

use crate::{
    BridgeError, ChannelName, ConnectionInfo, ConnectionStatus, Result, ServerConfig, ServerId,
    SocketHandle,
};
use soapbridge_adminport::{AdminPacket, AdminSession};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{instrument, trace};

/// Mutable runtime state, guarded by one lock per connection
///
/// `registered` is true exactly when `status` is not Disconnected; both only
/// change together.
#[derive(Default)]
struct RuntimeState {
    status: ConnectionStatus,
    registered: bool,
    session: Option<Arc<dyn AdminSession>>,
    spent: bool,
    stalled_since: Option<tokio::time::Instant>,
}

/// A managed admin-port connection
pub struct Connection {
    config: Arc<ServerConfig>,
    handle: SocketHandle,
    created_at: Instant,
    state: Mutex<RuntimeState>,
}

impl Connection {
    /// Create a disconnected connection
    pub fn new(config: Arc<ServerConfig>, handle: SocketHandle) -> Self {
        Self {
            config,
            handle,
            created_at: Instant::now(),
            state: Mutex::new(RuntimeState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the logical server ID
    pub fn id(&self) -> &ServerId {
        self.config.id()
    }

    /// Get the bound channel
    pub fn channel(&self) -> &ChannelName {
        self.config.channel()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a shared handle to the server configuration
    pub fn shared_config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    /// Get the socket handle
    pub fn handle(&self) -> SocketHandle {
        self.handle
    }

    /// Get when the connection object was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Get the current status
    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    /// Check if the handle is registered with the poller
    pub fn is_registered(&self) -> bool {
        self.lock().registered
    }

    /// Check if the session is established
    pub fn is_connected(&self) -> bool {
        self.lock().status == ConnectionStatus::Connected
    }

    /// Check if the connection belongs in the multiplexer's active set
    pub fn is_active(&self) -> bool {
        let state = self.lock();
        state.status == ConnectionStatus::Connected && state.registered
    }

    /// Check if this object has already carried a session
    ///
    /// A spent connection must be replaced before it can connect again.
    pub fn is_spent(&self) -> bool {
        self.lock().spent
    }

    /// Get the open session, if any
    pub fn session(&self) -> Option<Arc<dyn AdminSession>> {
        self.lock().session.clone()
    }

    /// Get a snapshot of the connection
    pub fn info(&self) -> ConnectionInfo {
        let state = self.lock();
        ConnectionInfo {
            id: self.config.id().clone(),
            channel: self.config.channel().clone(),
            handle: self.handle,
            status: state.status,
            registered: state.registered,
        }
    }

    /// Attach a freshly opened session and register it
    ///
    /// `register` runs under the state lock; on success the connection
    /// becomes Connecting and registered in one step. The connection is spent
    /// either way.
    pub(crate) fn open<F>(&self, session: Arc<dyn AdminSession>, register: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut state = self.lock();
        state.spent = true;
        register()?;
        trace!(
            server_id = %self.id(),
            from = %state.status,
            to = %ConnectionStatus::Connecting,
            "Status change"
        );
        state.session = Some(session);
        state.status = ConnectionStatus::Connecting;
        state.registered = true;
        Ok(())
    }

    /// Promote a Connecting connection to Connected
    ///
    /// Does nothing if the connection was closed in the meantime.
    pub(crate) fn established(&self) -> bool {
        let mut state = self.lock();
        if state.status != ConnectionStatus::Connecting {
            return false;
        }
        trace!(
            server_id = %self.id(),
            from = %state.status,
            to = %ConnectionStatus::Connected,
            "Status change"
        );
        state.status = ConnectionStatus::Connected;
        true
    }

    /// Deregister, mark disconnected and take the session in one step
    ///
    /// `deregister` runs under the state lock. Returns the session, if one
    /// was attached, for the caller to close.
    pub(crate) fn close<F>(&self, deregister: F) -> Option<Arc<dyn AdminSession>>
    where
        F: FnOnce() -> bool,
    {
        let mut state = self.lock();
        if !deregister() {
            trace!(server_id = %self.id(), handle = %self.handle, "Socket was not registered");
        }
        state.status = ConnectionStatus::Disconnected;
        state.registered = false;
        state.stalled_since = None;
        state.session.take()
    }

    /// Record a read that ran out of budget before completing a unit
    ///
    /// Returns how long reads have been stalling, counted from the start of
    /// the first stalled read.
    pub(crate) fn note_stall(&self, budget: Duration) -> Duration {
        let now = tokio::time::Instant::now();
        let mut state = self.lock();
        let since = *state
            .stalled_since
            .get_or_insert_with(|| now.checked_sub(budget).unwrap_or(now));
        now.saturating_duration_since(since)
    }

    /// Forget any recorded read stall
    pub(crate) fn clear_stall(&self) {
        self.lock().stalled_since = None;
    }

    /// Send a packet over the established session
    #[instrument(skip(self, packet), fields(server_id = %self.id(), handle = %self.handle))]
    pub async fn send(&self, packet: AdminPacket) -> Result<()> {
        let session = {
            let state = self.lock();
            match (&state.session, state.status) {
                (Some(session), ConnectionStatus::Connected) => session.clone(),
                _ => return Err(BridgeError::NotConnected(self.id().clone())),
            }
        };
        session.send(packet).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Connection")
            .field("id", self.config.id())
            .field("channel", self.config.channel())
            .field("handle", &self.handle)
            .field("status", &state.status)
            .field("registered", &state.registered)
            .field("spent", &state.spent)
            .finish()
    }
}
