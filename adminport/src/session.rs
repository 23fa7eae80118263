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

//! Admin-port session traits

use crate::{AdminEvent, AdminPacket, AdminResult, CompanyId, CompanyInfo, Readiness, ServerInfo};
use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// How a session should be closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Send the protocol's quit packet before closing the socket
    Graceful,
    /// Drop the socket without further protocol traffic
    Forced,
}

/// Parameters used to open an admin-port session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Game server host
    pub host: String,
    /// Admin port
    pub port: u16,
    /// Admin password
    pub password: String,
    /// Client name announced to the server
    pub name: String,
    /// Socket timeout
    pub timeout: Duration,
}

/// An open admin-port session
///
/// A session owns one socket. The bridge waits on [`ready`](Self::ready) to
/// learn when the socket has pending data, then calls
/// [`receive`](Self::receive) to read exactly one protocol unit.
///
/// Implementations must be safe to share between the multiplexer and the
/// command handlers, so all methods take `&self`.
#[async_trait]
pub trait AdminSession: Send + Sync + 'static {
    /// Wait until the socket is readable or has failed
    ///
    /// Must never return [`Readiness::EMPTY`].
    async fn ready(&self) -> io::Result<Readiness>;

    /// Read and decode one protocol unit
    ///
    /// Returns `Ok(None)` when the server closed the session in an orderly
    /// fashion. A unit may decode into zero or more events.
    ///
    /// Must be cancel safe: when the future is dropped before a unit is
    /// complete, the bytes read so far stay buffered for the next call.
    async fn receive(&self) -> AdminResult<Option<Vec<AdminEvent>>>;

    /// Send a packet to the server
    async fn send(&self, packet: AdminPacket) -> AdminResult<()>;

    /// Close the session
    ///
    /// Closing an already closed session is not an error.
    async fn close(&self, mode: CloseMode) -> AdminResult<()>;

    /// Look up a company in the session's company table
    fn company(&self, id: CompanyId) -> Option<CompanyInfo>;

    /// Server information from the welcome, once received
    fn server_info(&self) -> Option<ServerInfo>;
}

/// Opens admin-port sessions
#[async_trait]
pub trait AdminConnector: Send + Sync + 'static {
    /// Open a socket and perform the protocol join
    ///
    /// The returned session has sent its join packet; the server's welcome
    /// arrives later through [`AdminSession::receive`].
    async fn open(&self, params: &SessionParams) -> AdminResult<Arc<dyn AdminSession>>;
}
