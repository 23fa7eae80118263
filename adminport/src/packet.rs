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

//! Outbound admin-port packets

use crate::{ChatAction, ClientId, DestType};

/// A packet sent to the game server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPacket {
    /// Execute a remote console command
    Rcon {
        /// Command text
        command: String,
    },

    /// Send a chat message
    Chat {
        /// Action kind
        action: ChatAction,
        /// Destination class
        dest_type: DestType,
        /// Destination client (or sender for broadcasts)
        destination: ClientId,
        /// Message text
        message: String,
    },
}

impl AdminPacket {
    /// Remote console command
    pub fn rcon(command: impl Into<String>) -> Self {
        AdminPacket::Rcon {
            command: command.into(),
        }
    }

    /// Public chat line sent on behalf of the server
    pub fn broadcast_chat(message: impl Into<String>) -> Self {
        AdminPacket::Chat {
            action: ChatAction::Chat,
            dest_type: DestType::Broadcast,
            destination: ClientId::SERVER,
            message: message.into(),
        }
    }

    /// Private chat line delivered to a single client
    pub fn private_chat(client: ClientId, message: impl Into<String>) -> Self {
        AdminPacket::Chat {
            action: ChatAction::ChatClient,
            dest_type: DestType::Client,
            destination: client,
            message: message.into(),
        }
    }
}
