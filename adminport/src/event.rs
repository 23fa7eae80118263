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

//! Decoded admin-port events

use crate::{ChatAction, ClientId, ClientInfo, DestType, ServerInfo};

/// A client reference as resolved by the session's client table
///
/// Events about clients the session has not (yet) tracked carry only the ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRef {
    /// Client is present in the client table
    Known(ClientInfo),
    /// Client is not tracked; only the ID is available
    Unknown(ClientId),
}

impl ClientRef {
    /// Get the client ID
    pub fn id(&self) -> ClientId {
        match self {
            ClientRef::Known(info) => info.id,
            ClientRef::Unknown(id) => *id,
        }
    }

    /// Get the tracked client record, if any
    pub fn known(&self) -> Option<&ClientInfo> {
        match self {
            ClientRef::Known(info) => Some(info),
            ClientRef::Unknown(_) => None,
        }
    }
}

/// Client attributes reported as changed by a client update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientField {
    Name,
    PlayAs,
}

/// An event decoded from the admin port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminEvent {
    /// Server accepted the admin session and identified itself
    Welcome(ServerInfo),

    /// Chat or network action
    Chat {
        /// Action kind
        action: ChatAction,
        /// Destination class
        dest_type: DestType,
        /// Originating client
        client: ClientRef,
        /// Message text
        message: String,
        /// Action-specific data (e.g. money amount)
        data: u64,
    },

    /// A client joined the game
    ClientJoin(ClientRef),

    /// A client left the game
    ClientQuit(ClientRef),

    /// A tracked client changed
    ClientUpdate {
        /// Client record before the update
        old: ClientInfo,
        /// Client record after the update
        new: ClientInfo,
        /// Attributes that changed
        changed: Vec<ClientField>,
    },
}
