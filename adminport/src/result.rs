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

//! Error types for admin-port sessions

/// Result type for admin-port operations
pub type AdminResult<T> = Result<T, AdminError>;

/// Errors reported by an admin-port session or connector
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// An I/O error occurred on the session's socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent data that could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server rejected the session (e.g. wrong password)
    #[error("Session rejected: {0}")]
    Rejected(String),

    /// The session has already been closed
    #[error("Session closed")]
    Closed,
}

impl AdminError {
    /// Check if the error was caused by the transport rather than the protocol
    pub fn is_transport_error(&self) -> bool {
        matches!(self, AdminError::Io(_) | AdminError::Closed)
    }
}
