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

//! Error types for the bridge

use crate::types::{ChannelName, ServerId, SocketHandle};
use soapbridge_adminport::AdminError;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Error reported by the admin session
    #[error("Admin port error: {0}")]
    Admin(#[from] AdminError),

    /// I/O error outside an admin session
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No connection exists for the given server ID
    #[error("Connection {0} not found")]
    ConnectionNotFound(ServerId),

    /// A connection with this server ID already exists
    #[error("Server {0} is already configured")]
    DuplicateServer(ServerId),

    /// A connection is already bound to this channel
    #[error("Channel {0} is already bound")]
    DuplicateChannel(ChannelName),

    /// Connection is already connected
    #[error("Server {0} is already connected")]
    AlreadyConnected(ServerId),

    /// Connection is not connected
    #[error("Server {0} is not connected")]
    NotConnected(ServerId),

    /// Opening the admin session failed
    #[error("Connection to {0} failed")]
    ConnectionFailed(ServerId),

    /// The server welcome did not arrive in time
    #[error("Handshake with {0} timed out")]
    HandshakeTimeout(ServerId),

    /// Remote console command exceeds the protocol limit
    #[error("RCON Command too long ({len}/{max})")]
    RconTooLong {
        /// Command length in bytes
        len: usize,
        /// Protocol limit
        max: usize,
    },

    /// Socket handle is already registered with the poller
    #[error("Socket {0} is already registered")]
    AlreadyRegistered(SocketHandle),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Service is not running
    #[error("Service not running")]
    ServiceNotRunning,

    /// Service is already running
    #[error("Service already running")]
    ServiceAlreadyRunning,

    /// Resource cleanup failed
    #[error("Resource cleanup failed: {0}")]
    CleanupFailed(String),
}

impl BridgeError {
    /// Check if the error is recoverable
    ///
    /// Recoverable errors leave the bridge in a consistent state, so the
    /// operation may be retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::Admin(_)
                | BridgeError::Io(_)
                | BridgeError::ConnectionFailed(_)
                | BridgeError::HandshakeTimeout(_)
        )
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            BridgeError::Admin(_)
                | BridgeError::Io(_)
                | BridgeError::ConnectionNotFound(_)
                | BridgeError::ConnectionFailed(_)
                | BridgeError::HandshakeTimeout(_)
        )
    }

    /// Check if the error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidConfig(_)
                | BridgeError::Config(_)
                | BridgeError::DuplicateServer(_)
                | BridgeError::DuplicateChannel(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_recoverable() {
        assert!(BridgeError::ConnectionFailed(ServerId::new("main")).is_recoverable());
        assert!(BridgeError::HandshakeTimeout(ServerId::new("main")).is_recoverable());
        assert!(!BridgeError::ServiceNotRunning.is_recoverable());
        assert!(!BridgeError::RconTooLong { len: 50, max: 50 }.is_recoverable());
    }

    #[test]
    fn test_error_is_connection_error() {
        assert!(BridgeError::ConnectionNotFound(ServerId::new("main")).is_connection_error());
        assert!(BridgeError::Admin(AdminError::Closed).is_connection_error());
        assert!(!BridgeError::InvalidConfig("x".into()).is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::RconTooLong { len: 50, max: 50 };
        assert_eq!(err.to_string(), "RCON Command too long (50/50)");

        let err = BridgeError::AlreadyRegistered(SocketHandle::new(7));
        assert_eq!(err.to_string(), "Socket sock-7 is already registered");
    }
}
