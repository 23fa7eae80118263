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


//! Bridge wiring for tests

use crate::{CountingPoller, MemoryConnector, MemorySession, RecordingChat};
use soapbridge_service::{
    BridgeConfig, BridgeService, Caller, ChannelName, CommandContext, Connection, ServerConfig,
    ServerId, Source,
};
use std::sync::Arc;
use std::time::Duration;

/// Install a test-friendly subscriber once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

/// Server configuration with a short timeout
pub fn server(id: &str, channel: &str) -> ServerConfig {
    ServerConfig::builder(id, channel, "127.0.0.1")
        .with_password("secret")
        .with_timeout(Duration::from_secs(2))
        .build()
        .expect("valid test server")
}

/// Command issued by `nick` in `channel`
pub fn channel_context(nick: &str, channel: &str) -> CommandContext {
    CommandContext::new(
        Caller::new(nick, format!("{}!{}@example.org", nick, nick)),
        Source::Channel(ChannelName::new(channel)),
    )
}

/// Command issued by `nick` in a private message
pub fn private_context(nick: &str) -> CommandContext {
    CommandContext::new(
        Caller::new(nick, format!("{}!{}@example.org", nick, nick)),
        Source::Private(nick.to_string()),
    )
}

/// A bridge over in-memory sessions
pub struct Harness {
    /// Bridge under test
    pub bridge: BridgeService,
    /// Scripted connector
    pub connector: Arc<MemoryConnector>,
    /// Recording chat transport
    pub chat: Arc<RecordingChat>,
    /// Observing poller
    pub poller: Arc<CountingPoller>,
}

impl Harness {
    /// Build a bridge from `config`
    pub fn new(config: BridgeConfig) -> Self {
        init_tracing();
        let connector = Arc::new(MemoryConnector::new());
        let chat = Arc::new(RecordingChat::new());
        let poller = Arc::new(CountingPoller::new());
        let bridge = BridgeService::with_poller(
            config,
            connector.clone(),
            chat.clone(),
            poller.clone(),
        )
        .expect("valid bridge configuration");
        Self {
            bridge,
            connector,
            chat,
            poller,
        }
    }

    /// Build a bridge over the given servers with default settings
    pub fn with_servers(servers: impl IntoIterator<Item = ServerConfig>) -> Self {
        let config = servers
            .into_iter()
            .fold(BridgeConfig::default(), BridgeConfig::with_server);
        Self::new(config)
    }

    /// Queue a welcomed session for the next open
    pub fn accept(&self, name: &str) -> Arc<MemorySession> {
        let session = Arc::new(MemorySession::welcomed(name, "14.1"));
        self.connector.accept(session.clone());
        session
    }

    /// Current connection for a server
    pub fn connection(&self, id: &str) -> Arc<Connection> {
        self.bridge
            .registry()
            .find_by_id(&ServerId::new(id))
            .expect("configured server")
    }

    /// Check that exactly the non-disconnected connections are registered
    ///
    /// Also checks that no two connections share a socket handle.
    pub fn assert_consistent(&self) {
        let poller = self.bridge.poller();
        let connections = self.bridge.registry().all();
        let mut handles = std::collections::HashSet::new();
        for connection in &connections {
            assert!(
                handles.insert(connection.handle()),
                "handle {} is shared",
                connection.handle()
            );
            let live = connection.status().has_socket();
            assert_eq!(
                poller.is_registered(connection.handle()),
                live,
                "{} is {} but registration is {}",
                connection.id(),
                connection.status(),
                poller.is_registered(connection.handle())
            );
            assert_eq!(connection.is_registered(), live);
        }
        let live = connections
            .iter()
            .filter(|connection| connection.status().has_socket())
            .count();
        assert_eq!(poller.registered_count(), live);
    }
}
