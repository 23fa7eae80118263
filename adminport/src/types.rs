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

//! Domain values tracked by an admin-port session

use std::fmt;

/// Identifier of a client connected to the game server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u32);

impl ClientId {
    /// The game server itself, used as the sender of admin broadcasts
    pub const SERVER: ClientId = ClientId(1);

    /// Create a new client ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the underlying u32 value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a company (zero-based on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompanyId(u8);

impl CompanyId {
    /// Pseudo-company that spectating clients play as
    pub const SPECTATOR: CompanyId = CompanyId(255);

    /// Create a new company ID
    pub fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the underlying u8 value
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Company number as shown to players (one-based)
    pub fn display_number(&self) -> u16 {
        u16::from(self.0) + 1
    }

    /// Check if this is the spectator pseudo-company
    pub fn is_spectator(&self) -> bool {
        *self == Self::SPECTATOR
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A client as known to the session's client table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client ID
    pub id: ClientId,
    /// Player name
    pub name: String,
    /// Company the client plays as
    pub play_as: CompanyId,
}

impl ClientInfo {
    /// Create a new client record
    pub fn new(id: ClientId, name: impl Into<String>, play_as: CompanyId) -> Self {
        Self {
            id,
            name: name.into(),
            play_as,
        }
    }
}

/// A company as known to the session's company table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    /// Company ID
    pub id: CompanyId,
    /// Company name
    pub name: String,
}

impl CompanyInfo {
    /// Create a new company record
    pub fn new(id: CompanyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Server identification sent in the admin welcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server revision string
    pub version: String,
    /// Whether the server is dedicated
    pub dedicated: bool,
}

impl ServerInfo {
    /// Create a new server info record
    pub fn new(name: impl Into<String>, version: impl Into<String>, dedicated: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dedicated,
        }
    }
}

/// Kind of a chat or network action reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatAction {
    Join,
    Leave,
    ServerMessage,
    Chat,
    ChatCompany,
    ChatClient,
    GiveMoney,
    NameChange,
    CompanySpectator,
    CompanyJoin,
    CompanyNew,
    Kicked,
    ExternalChat,
}

/// Destination class of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestType {
    /// Everyone on the server
    Broadcast,
    /// Members of one company
    Team,
    /// A single client
    Client,
}
