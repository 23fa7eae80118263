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

//! Bridge configuration types and builders
//!
//! [`ServerConfig`] describes one bound game server. It is validated when it
//! is built and never changes afterwards; changing a server means building a
//! new configuration and reconnecting.
//!
//! # Examples
//!
//! ## Building in code
//!
//! ```
//! use soapbridge_service::{BridgeConfig, ServerConfig};
//! use std::time::Duration;
//!
//! let server = ServerConfig::builder("main", "#OpenTTD", "127.0.0.1")
//!     .with_password("secret")
//!     .with_timeout(Duration::from_secs(2))
//!     .with_auto_connect(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(server.channel().as_str(), "#openttd");
//!
//! let config = BridgeConfig::default().with_server(server);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Loading from TOML
//!
//! ```
//! use soapbridge_service::BridgeConfig;
//!
//! let config = BridgeConfig::from_toml_str(r##"
//!     command_prefixes = "!@"
//!
//!     [[server]]
//!     id = "main"
//!     channel = "#openttd"
//!     host = "127.0.0.1"
//!     password = "secret"
//! "##).unwrap();
//! assert_eq!(config.servers().len(), 1);
//! ```

use crate::{BridgeError, ChannelName, Result, ServerId};
use serde::Deserialize;
use soapbridge_adminport::{ADMIN_PORT, NETWORK_RCONCOMMAND_LENGTH, SessionParams};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CLIENT_NAME: &str = "Soap";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_COMMAND_PREFIXES: &str = "!";
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration of one bound game server
///
/// Instances are created through [`ServerConfig::builder`] and are immutable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ServerEntry")]
pub struct ServerConfig {
    id: ServerId,
    channel: ChannelName,
    host: String,
    port: u16,
    password: String,
    name: String,
    timeout: Duration,
    auto_connect: bool,
    allow_ops: bool,
    play_as_player: bool,
}

impl ServerConfig {
    /// Start building a server configuration
    pub fn builder(
        id: impl Into<String>,
        channel: impl AsRef<str>,
        host: impl Into<String>,
    ) -> ServerConfigBuilder {
        ServerConfigBuilder {
            id: id.into(),
            channel: channel.as_ref().to_string(),
            host: host.into(),
            port: ADMIN_PORT,
            password: String::new(),
            name: DEFAULT_CLIENT_NAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
            auto_connect: false,
            allow_ops: false,
            play_as_player: true,
        }
    }

    /// Logical server ID
    pub fn id(&self) -> &ServerId {
        &self.id
    }

    /// Bound channel (lower-cased)
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Game server host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Admin port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Admin password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Client name announced to the game server
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Socket and handshake timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connect automatically when the bound channel is joined
    pub fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    /// Allow channel operators to run commands
    pub fn allow_ops(&self) -> bool {
        self.allow_ops
    }

    /// Allow players whose name contains "player" to join companies
    pub fn play_as_player(&self) -> bool {
        self.play_as_player
    }

    /// Parameters for opening an admin session to this server
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
            name: self.name.clone(),
            timeout: self.timeout,
        }
    }
}

/// Builder for [`ServerConfig`]
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    id: String,
    channel: String,
    host: String,
    port: u16,
    password: String,
    name: String,
    timeout: Duration,
    auto_connect: bool,
    allow_ops: bool,
    play_as_player: bool,
}

impl ServerConfigBuilder {
    /// Set the admin port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the admin password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the client name announced to the game server
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the socket and handshake timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable auto-connect
    pub fn with_auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    /// Enable or disable operator access
    pub fn with_allow_ops(mut self, enabled: bool) -> Self {
        self.allow_ops = enabled;
        self
    }

    /// Enable or disable the player-name policy exemption
    pub fn with_play_as_player(mut self, enabled: bool) -> Self {
        self.play_as_player = enabled;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<ServerConfig> {
        if self.id.trim().is_empty() {
            return Err(BridgeError::InvalidConfig("server id is empty".into()));
        }
        let channel = ChannelName::new(self.channel.trim());
        if channel.as_str().is_empty() {
            return Err(BridgeError::InvalidConfig(format!(
                "server {} has no channel",
                self.id
            )));
        }
        if self.host.trim().is_empty() {
            return Err(BridgeError::InvalidConfig(format!(
                "server {} has no host",
                self.id
            )));
        }
        if self.port == 0 {
            return Err(BridgeError::InvalidConfig(format!(
                "server {} has port 0",
                self.id
            )));
        }
        if self.timeout.is_zero() {
            return Err(BridgeError::InvalidConfig(format!(
                "server {} has a zero timeout",
                self.id
            )));
        }
        Ok(ServerConfig {
            id: ServerId::new(self.id),
            channel,
            host: self.host,
            port: self.port,
            password: self.password,
            name: self.name,
            timeout: self.timeout,
            auto_connect: self.auto_connect,
            allow_ops: self.allow_ops,
            play_as_player: self.play_as_player,
        })
    }
}

/// `[[server]]` table as written in the configuration file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerEntry {
    id: String,
    channel: String,
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    password: String,
    #[serde(default = "default_client_name")]
    name: String,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default)]
    auto_connect: bool,
    #[serde(default)]
    allow_ops: bool,
    #[serde(default = "default_true")]
    play_as_player: bool,
}

impl TryFrom<ServerEntry> for ServerConfig {
    type Error = BridgeError;

    fn try_from(entry: ServerEntry) -> Result<Self> {
        ServerConfig::builder(entry.id, entry.channel, entry.host)
            .with_port(entry.port)
            .with_password(entry.password)
            .with_name(entry.name)
            .with_timeout(Duration::from_millis(entry.timeout_ms))
            .with_auto_connect(entry.auto_connect)
            .with_allow_ops(entry.allow_ops)
            .with_play_as_player(entry.play_as_player)
            .build()
    }
}

fn default_port() -> u16 {
    ADMIN_PORT
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_true() -> bool {
    true
}

/// Bridge-wide configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Characters that mark a chat line as a bot command
    pub command_prefixes: String,
    /// Remote console command length limit in bytes
    pub rcon_max_length: usize,
    /// Upper bound of one multiplexer wait
    pub poll_timeout: Duration,
    /// Sleep between multiplexer cycles when no connection is active
    pub idle_interval: Duration,
    /// Bound game servers
    pub servers: Vec<ServerConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command_prefixes: DEFAULT_COMMAND_PREFIXES.to_string(),
            rcon_max_length: NETWORK_RCONCOMMAND_LENGTH,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            servers: Vec::new(),
        }
    }
}

/// Top level of the configuration file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BridgeFile {
    #[serde(default = "default_command_prefixes")]
    command_prefixes: String,
    #[serde(default = "default_rcon_max_length")]
    rcon_max_length: usize,
    #[serde(default = "default_poll_timeout_ms")]
    poll_timeout_ms: u64,
    #[serde(default = "default_idle_interval_ms")]
    idle_interval_ms: u64,
    #[serde(default, rename = "server")]
    servers: Vec<ServerConfig>,
}

fn default_command_prefixes() -> String {
    DEFAULT_COMMAND_PREFIXES.to_string()
}

fn default_rcon_max_length() -> usize {
    NETWORK_RCONCOMMAND_LENGTH
}

fn default_poll_timeout_ms() -> u64 {
    DEFAULT_POLL_TIMEOUT.as_millis() as u64
}

fn default_idle_interval_ms() -> u64 {
    DEFAULT_IDLE_INTERVAL.as_millis() as u64
}

impl BridgeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: BridgeFile = toml::from_str(text)?;
        let config = Self {
            command_prefixes: file.command_prefixes,
            rcon_max_length: file.rcon_max_length,
            poll_timeout: Duration::from_millis(file.poll_timeout_ms),
            idle_interval: Duration::from_millis(file.idle_interval_ms),
            servers: file.servers,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Add a server
    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.servers.push(server);
        self
    }

    /// Set the command trigger characters
    pub fn with_command_prefixes(mut self, prefixes: impl Into<String>) -> Self {
        self.command_prefixes = prefixes.into();
        self
    }

    /// Set the remote console command length limit
    pub fn with_rcon_max_length(mut self, max: usize) -> Self {
        self.rcon_max_length = max;
        self
    }

    /// Set the multiplexer wait bound
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the idle sleep interval
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Configured servers
    pub fn servers(&self) -> &[ServerConfig] {
        &self.servers
    }

    /// Check whether a chat line starts with a command trigger character
    pub fn is_command(&self, text: &str) -> bool {
        text.chars()
            .next()
            .is_some_and(|first| self.command_prefixes.contains(first))
    }

    /// Check bridge-wide constraints
    ///
    /// Server IDs and channels must be unique.
    pub fn validate(&self) -> Result<()> {
        if self.rcon_max_length == 0 {
            return Err(BridgeError::InvalidConfig(
                "rcon_max_length must be positive".into(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(BridgeError::InvalidConfig(
                "poll timeout must be positive".into(),
            ));
        }
        if self.idle_interval.is_zero() {
            return Err(BridgeError::InvalidConfig(
                "idle interval must be positive".into(),
            ));
        }
        let mut ids = HashSet::new();
        let mut channels = HashSet::new();
        for server in &self.servers {
            if !ids.insert(server.id()) {
                return Err(BridgeError::DuplicateServer(server.id().clone()));
            }
            if !channels.insert(server.channel()) {
                return Err(BridgeError::DuplicateChannel(server.channel().clone()));
            }
        }
        Ok(())
    }
}
