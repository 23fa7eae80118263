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

//! Chat commands
//!
//! Commands resolve their target connection from an explicit server ID, the
//! channel they were issued in, or (in private) the only configured server.
//! Every command requires the trusted capability, or operator status in the
//! bound channel when the server allows operators.

use crate::{
    BridgeError, Caller, ChatTransport, Connection, ConnectionRegistry, LifecycleController,
    ServerId, Source,
};
use soapbridge_adminport::AdminPacket;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply when connecting an already connected server
pub const ALREADY_CONNECTED: &str = "Already connected!!";
/// Reply when a command needs a connected server
pub const NOT_CONNECTED: &str = "Not connected!!";

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect a server
    Connect {
        /// Explicit server ID
        server: Option<ServerId>,
    },
    /// Disconnect a server
    Disconnect {
        /// Explicit server ID
        server: Option<ServerId>,
    },
    /// Forward a remote console command
    Rcon {
        /// Command text
        command: String,
    },
    /// Pause the game
    Pause,
    /// Unpause the game
    Unpause,
}

impl Command {
    /// Parse a command line with its trigger character already removed
    ///
    /// Returns `None` for anything that is not a bridge command.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let server = || rest.split_whitespace().next().map(ServerId::from);

        match name.to_lowercase().as_str() {
            "connect" | "apconnect" => Some(Command::Connect { server: server() }),
            "disconnect" | "apdisconnect" => Some(Command::Disconnect { server: server() }),
            "rcon" if !rest.is_empty() => Some(Command::Rcon {
                command: rest.to_string(),
            }),
            "pause" => Some(Command::Pause),
            "unpause" => Some(Command::Unpause),
            _ => None,
        }
    }

    fn server(&self) -> Option<&ServerId> {
        match self {
            Command::Connect { server } | Command::Disconnect { server } => server.as_ref(),
            _ => None,
        }
    }
}

/// Who issued a command and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Issuing user
    pub caller: Caller,
    /// Where the command was issued
    pub source: Source,
}

impl CommandContext {
    /// Create a command context
    pub fn new(caller: Caller, source: Source) -> Self {
        Self { caller, source }
    }
}

/// What became of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command was carried out
    Executed,
    /// The command was refused with a reply to the caller
    Rejected,
    /// The caller lacks permission
    Denied,
    /// No connection matched; nothing was done
    Unresolved,
}

/// Executes chat commands against the connection set
pub struct CommandHandler {
    registry: Arc<ConnectionRegistry>,
    lifecycle: Arc<LifecycleController>,
    chat: Arc<dyn ChatTransport>,
    rcon_max_length: usize,
}

impl CommandHandler {
    /// Create a command handler
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        lifecycle: Arc<LifecycleController>,
        chat: Arc<dyn ChatTransport>,
        rcon_max_length: usize,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            chat,
            rcon_max_length,
        }
    }

    /// Find the connection a command applies to
    pub fn resolve(
        &self,
        context: &CommandContext,
        server: Option<&ServerId>,
    ) -> Option<Arc<Connection>> {
        if let Some(id) = server {
            return self.registry.find_by_id(id);
        }
        match &context.source {
            Source::Channel(channel) => self.registry.find_by_channel(channel),
            Source::Private(_) => {
                let all = self.registry.all();
                match all.as_slice() {
                    [only] => Some(only.clone()),
                    _ => None,
                }
            }
        }
    }

    /// Check whether the caller may control `connection`
    pub fn is_permitted(&self, caller: &Caller, connection: &Connection) -> bool {
        self.chat.is_trusted(caller)
            || (connection.config().allow_ops()
                && self.chat.is_operator(connection.channel(), &caller.nick))
    }

    /// Execute a command
    pub async fn execute(&self, context: &CommandContext, command: Command) -> CommandOutcome {
        let Some(connection) = self.resolve(context, command.server()) else {
            debug!(source = ?context.source, command = ?command, "No connection for command");
            return CommandOutcome::Unresolved;
        };

        if !self.is_permitted(&context.caller, &connection) {
            info!(
                server_id = %connection.id(),
                nick = %context.caller.nick,
                "Permission denied"
            );
            if matches!(command, Command::Rcon { .. }) {
                self.reply(context, NOT_CONNECTED).await;
            }
            return CommandOutcome::Denied;
        }

        let id = connection.id().clone();
        let reply_to = Some(context.source.reply_target());
        match command {
            Command::Connect { .. } => match self.lifecycle.connect(&id, reply_to).await {
                Ok(()) => CommandOutcome::Executed,
                Err(BridgeError::AlreadyConnected(_)) => {
                    self.reply(context, ALREADY_CONNECTED).await;
                    CommandOutcome::Rejected
                }
                Err(e) => {
                    debug!(server_id = %id, error = %e, "Connect failed");
                    CommandOutcome::Rejected
                }
            },
            Command::Disconnect { .. } => match self.lifecycle.disconnect(&id, reply_to).await {
                Ok(()) => CommandOutcome::Executed,
                Err(BridgeError::NotConnected(_)) => {
                    self.reply(context, NOT_CONNECTED).await;
                    CommandOutcome::Rejected
                }
                Err(e) => {
                    warn!(server_id = %id, error = %e, "Disconnect failed");
                    CommandOutcome::Rejected
                }
            },
            Command::Rcon { command } => {
                if !connection.is_connected() {
                    self.reply(context, NOT_CONNECTED).await;
                    return CommandOutcome::Rejected;
                }
                if command.len() >= self.rcon_max_length {
                    let err = BridgeError::RconTooLong {
                        len: command.len(),
                        max: self.rcon_max_length,
                    };
                    self.reply(context, &err.to_string()).await;
                    return CommandOutcome::Rejected;
                }
                self.send_rcon(context, &connection, command).await
            }
            Command::Pause => self.send_rcon(context, &connection, "pause".into()).await,
            Command::Unpause => self.send_rcon(context, &connection, "unpause".into()).await,
        }
    }

    async fn send_rcon(
        &self,
        context: &CommandContext,
        connection: &Connection,
        command: String,
    ) -> CommandOutcome {
        match connection.send(AdminPacket::rcon(command)).await {
            Ok(()) => CommandOutcome::Executed,
            Err(BridgeError::NotConnected(_)) => {
                self.reply(context, NOT_CONNECTED).await;
                CommandOutcome::Rejected
            }
            Err(e) => {
                warn!(server_id = %connection.id(), error = %e, "Failed to send rcon command");
                CommandOutcome::Rejected
            }
        }
    }

    async fn reply(&self, context: &CommandContext, text: &str) {
        self.chat
            .send_message(context.source.reply_target(), text)
            .await;
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("rcon_max_length", &self.rcon_max_length)
            .finish_non_exhaustive()
    }
}
