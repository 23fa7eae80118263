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


//! Recording chat transport

use async_trait::async_trait;
use soapbridge_service::{Caller, ChannelName, ChatTransport};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct ChatState {
    messages: Vec<(String, String)>,
    trusted: HashSet<String>,
    operators: HashSet<(ChannelName, String)>,
    joined: Option<HashSet<ChannelName>>,
}

/// Chat transport that records every outbound line
///
/// Trust is granted per nick. Until [`join`](Self::join) is called the bot
/// counts as joined to every channel.
#[derive(Debug, Default)]
pub struct RecordingChat {
    state: Mutex<ChatState>,
}

impl RecordingChat {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Grant the trusted capability to a nick
    pub fn trust(&self, nick: &str) {
        self.state().trusted.insert(nick.to_string());
    }

    /// Make a nick an operator in a channel
    pub fn op(&self, channel: &str, nick: &str) {
        self.state()
            .operators
            .insert((ChannelName::new(channel), nick.to_string()));
    }

    /// Mark a channel as joined
    ///
    /// From the first call on, only explicitly joined channels count.
    pub fn join(&self, channel: &str) {
        self.state()
            .joined
            .get_or_insert_with(HashSet::new)
            .insert(ChannelName::new(channel));
    }

    /// Restrict joined channels to those passed to [`join`](Self::join)
    pub fn join_none(&self) {
        self.state().joined.get_or_insert_with(HashSet::new);
    }

    /// Every (target, text) pair sent so far
    pub fn messages(&self) -> Vec<(String, String)> {
        self.state().messages.clone()
    }

    /// Lines sent to one target
    pub fn lines_to(&self, target: &str) -> Vec<String> {
        self.state()
            .messages
            .iter()
            .filter(|(to, _)| to.eq_ignore_ascii_case(target))
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Number of times `text` was sent to `target`
    pub fn count(&self, target: &str, text: &str) -> usize {
        self.lines_to(target)
            .iter()
            .filter(|line| line.as_str() == text)
            .count()
    }

    /// Forget recorded messages
    pub fn clear(&self) {
        self.state().messages.clear();
    }
}

#[async_trait]
impl ChatTransport for RecordingChat {
    async fn send_message(&self, target: &str, text: &str) {
        self.state()
            .messages
            .push((target.to_string(), text.to_string()));
    }

    fn is_trusted(&self, caller: &Caller) -> bool {
        self.state().trusted.contains(&caller.nick)
    }

    fn is_operator(&self, channel: &ChannelName, nick: &str) -> bool {
        self.state()
            .operators
            .contains(&(channel.clone(), nick.to_string()))
    }

    fn is_joined(&self, channel: &ChannelName) -> bool {
        match &self.state().joined {
            Some(joined) => joined.contains(channel),
            None => true,
        }
    }
}
