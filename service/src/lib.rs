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

//! Chat to Admin-Port Bridge
//!
//! This crate relays a chat channel to one or more game servers' remote
//! administration ports and back. It manages many independent,
//! intermittently connected admin sessions from one process:
//!
//! - One poll loop multiplexes every connected session
//! - A failing session is disconnected without affecting the others
//! - Reconnecting replaces the connection object instead of swapping sockets
//! - Command handlers run concurrently with the poll loop
//!
//! The chat protocol and the admin protocol's byte format are supplied by the
//! embedding application through [`ChatTransport`] and
//! [`AdminConnector`](soapbridge_adminport::AdminConnector).
//!
//! # Architecture
//!
//! ```text
//! BridgeService
//!     ↓
//! CommandHandler → LifecycleController → ConnectionRegistry
//!                          ↑                  ↓
//!                  PollMultiplexer → Poller → EventRouter → ChatTransport
//! ```

mod bridge;
mod chat;
mod commands;
mod config;
mod connection;
mod error;
mod lifecycle;
mod metrics;
mod multiplexer;
mod poller;
mod registry;
mod router;
mod types;

pub use bridge::BridgeService;
pub use chat::{Caller, ChatTransport, InboundMessage, MessageKind, Source};
pub use commands::{
    ALREADY_CONNECTED, Command, CommandContext, CommandHandler, CommandOutcome, NOT_CONNECTED,
};
pub use config::{BridgeConfig, ServerConfig, ServerConfigBuilder};
pub use connection::Connection;
pub use error::{BridgeError, Result};
pub use lifecycle::{
    CONNECTING, CONNECTION_FAILED, DISCONNECTED, DISCONNECTED_UNCLEAN, FORCED_DISCONNECT,
    LifecycleController,
};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use multiplexer::{CycleOutcome, PollMultiplexer};
pub use poller::{Poller, SessionPoller};
pub use registry::ConnectionRegistry;
pub use router::{
    EventRouter, RENAME_NOTICE, Rendered, relay_line, render, violates_name_policy,
};
pub use types::{ChannelName, ConnectionInfo, ConnectionStatus, ServerId, SocketHandle};
