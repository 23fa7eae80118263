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

//! Chat transport interface
//!
//! The bridge does not speak any chat protocol itself. The embedding
//! application implements [`ChatTransport`] and feeds inbound traffic to
//! [`BridgeService`](crate::BridgeService).

use crate::ChannelName;
use async_trait::async_trait;

/// Chat transport used for outbound messages and permission lookups
///
/// # Example
///
/// ```no_run
/// use soapbridge_service::{Caller, ChannelName, ChatTransport};
/// use async_trait::async_trait;
///
/// struct StdoutChat;
///
/// #[async_trait]
/// impl ChatTransport for StdoutChat {
///     async fn send_message(&self, target: &str, text: &str) {
///         println!("{} :{}", target, text);
///     }
///
///     fn is_trusted(&self, caller: &Caller) -> bool {
///         caller.prefix.ends_with("@admin.example.org")
///     }
/// }
/// ```
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Send a message to a channel or a nick
    ///
    /// Delivery failures are the transport's concern.
    async fn send_message(&self, target: &str, text: &str);

    /// Check if the caller holds the trusted capability
    fn is_trusted(&self, _caller: &Caller) -> bool {
        false
    }

    /// Check if a nick is an operator in a channel
    fn is_operator(&self, _channel: &ChannelName, _nick: &str) -> bool {
        false
    }

    /// Check if the bot has joined a channel
    fn is_joined(&self, _channel: &ChannelName) -> bool {
        true
    }
}

/// Identity of a chat user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Nick
    pub nick: String,
    /// Full prefix (e.g. `nick!user@host`)
    pub prefix: String,
}

impl Caller {
    /// Create a caller
    pub fn new(nick: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            prefix: prefix.into(),
        }
    }
}

/// Where a command was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// In a channel
    Channel(ChannelName),
    /// In a private message from this nick
    Private(String),
}

impl Source {
    /// Target for replies to this source
    pub fn reply_target(&self) -> &str {
        match self {
            Source::Channel(channel) => channel.as_str(),
            Source::Private(nick) => nick,
        }
    }
}

/// Style of a chat line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    /// Plain text
    #[default]
    Normal,
    /// Action ("/me") text
    Action,
}

/// A chat line seen on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel the line was sent to
    pub channel: ChannelName,
    /// Sender nick
    pub nick: String,
    /// Text without any action framing
    pub text: String,
    /// Line style
    pub kind: MessageKind,
}

impl InboundMessage {
    /// Plain text line
    pub fn text(
        channel: impl AsRef<str>,
        nick: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: ChannelName::new(channel),
            nick: nick.into(),
            text: text.into(),
            kind: MessageKind::Normal,
        }
    }

    /// Action line
    pub fn action(
        channel: impl AsRef<str>,
        nick: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Action,
            ..Self::text(channel, nick, text)
        }
    }
}
