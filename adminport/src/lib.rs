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

//! # Soapbridge Admin Port
//!
//! Interfaces to a game server's remote administration port.
//!
//! This crate does not speak the admin protocol's byte format. It defines the
//! vocabulary the bridge core relies on:
//!
//! - **Domain values** - clients, companies, and server information as tracked
//!   by a protocol implementation
//! - **Events** - decoded [`AdminEvent`]s delivered one unit at a time
//! - **Packets** - outbound [`AdminPacket`]s (remote console and chat)
//! - **Sessions** - the [`AdminSession`] and [`AdminConnector`] traits that a
//!   protocol implementation provides
//! - **Readiness** - the [`Readiness`] mask reported by a session's socket
//!
//! ## Implementing a session
//!
//! ```no_run
//! use async_trait::async_trait;
//! use soapbridge_adminport::{
//!     AdminEvent, AdminPacket, AdminResult, AdminSession, CloseMode, CompanyId, CompanyInfo,
//!     Readiness, ServerInfo,
//! };
//!
//! struct MySession;
//!
//! #[async_trait]
//! impl AdminSession for MySession {
//!     async fn ready(&self) -> std::io::Result<Readiness> {
//!         Ok(Readiness::READABLE)
//!     }
//!     async fn receive(&self) -> AdminResult<Option<Vec<AdminEvent>>> {
//!         Ok(None)
//!     }
//!     async fn send(&self, _packet: AdminPacket) -> AdminResult<()> {
//!         Ok(())
//!     }
//!     async fn close(&self, _mode: CloseMode) -> AdminResult<()> {
//!         Ok(())
//!     }
//!     fn company(&self, _id: CompanyId) -> Option<CompanyInfo> {
//!         None
//!     }
//!     fn server_info(&self) -> Option<ServerInfo> {
//!         None
//!     }
//! }
//! ```

mod consts;
mod event;
mod packet;
mod readiness;
mod result;
mod session;
mod types;

pub use self::consts::{ADMIN_PORT, NETWORK_RCONCOMMAND_LENGTH};
pub use self::event::{AdminEvent, ClientField, ClientRef};
pub use self::packet::AdminPacket;
pub use self::readiness::{Readiness, stream_readiness};
pub use self::result::{AdminError, AdminResult};
pub use self::session::{AdminConnector, AdminSession, CloseMode, SessionParams};
pub use self::types::{
    ChatAction, ClientId, ClientInfo, CompanyId, CompanyInfo, DestType, ServerInfo,
};
