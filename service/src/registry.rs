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

//! Connection registry
//!
//! The registry is the only authority on which connections exist. Entries
//! are keyed by server ID, with secondary indexes by channel and by socket
//! handle. Lookups through an index always re-check the primary entry, so a
//! reader never observes a half-replaced connection.

use crate::{BridgeError, ChannelName, Connection, Result, ServerId, SocketHandle};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry entry
struct RegistryEntry {
    /// Insertion order, kept across replacement
    ordinal: u64,
    connection: Arc<Connection>,
}

/// Registry of managed connections
pub struct ConnectionRegistry {
    connections: DashMap<ServerId, RegistryEntry>,
    channels: DashMap<ChannelName, ServerId>,
    handles: DashMap<SocketHandle, ServerId>,
    next_ordinal: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            channels: DashMap::new(),
            handles: DashMap::new(),
            next_ordinal: AtomicU64::new(0),
        }
    }

    /// Add a connection
    ///
    /// Fails if the server ID or the channel is already taken.
    pub fn add(&self, connection: Arc<Connection>) -> Result<()> {
        // Lock order: connections, then channels, then handles.
        match self.connections.entry(connection.id().clone()) {
            Entry::Occupied(entry) => Err(BridgeError::DuplicateServer(entry.key().clone())),
            Entry::Vacant(slot) => {
                match self.channels.entry(connection.channel().clone()) {
                    Entry::Occupied(entry) => {
                        return Err(BridgeError::DuplicateChannel(entry.key().clone()));
                    }
                    Entry::Vacant(channel) => {
                        channel.insert(connection.id().clone());
                    }
                }
                self.handles
                    .insert(connection.handle(), connection.id().clone());
                slot.insert(RegistryEntry {
                    ordinal: self.next_ordinal.fetch_add(1, Ordering::SeqCst),
                    connection,
                });
                Ok(())
            }
        }
    }

    /// Atomically replace the connection registered under `id`
    ///
    /// The replacement must be bound to the same channel. Returns the retired
    /// connection.
    pub fn replace(&self, id: &ServerId, connection: Arc<Connection>) -> Result<Arc<Connection>> {
        if connection.id() != id {
            return Err(BridgeError::InvalidConfig(format!(
                "replacement for {} carries id {}",
                id,
                connection.id()
            )));
        }
        let mut entry = self
            .connections
            .get_mut(id)
            .ok_or_else(|| BridgeError::ConnectionNotFound(id.clone()))?;
        if entry.connection.channel() != connection.channel() {
            return Err(BridgeError::InvalidConfig(format!(
                "replacement for {} is bound to {} instead of {}",
                id,
                connection.channel(),
                entry.connection.channel()
            )));
        }
        self.handles.insert(connection.handle(), id.clone());
        let retired = std::mem::replace(&mut entry.connection, connection);
        drop(entry);
        self.handles.remove(&retired.handle());
        Ok(retired)
    }

    /// Remove a connection
    pub fn remove(&self, id: &ServerId) -> Option<Arc<Connection>> {
        let (_, entry) = self.connections.remove(id)?;
        self.channels.remove(entry.connection.channel());
        self.handles.remove(&entry.connection.handle());
        Some(entry.connection)
    }

    /// Find a connection by server ID
    pub fn find_by_id(&self, id: &ServerId) -> Option<Arc<Connection>> {
        self.connections
            .get(id)
            .map(|entry| entry.connection.clone())
    }

    /// Find a connection by bound channel
    pub fn find_by_channel(&self, channel: &ChannelName) -> Option<Arc<Connection>> {
        let id = self.channels.get(channel).map(|entry| entry.value().clone())?;
        self.find_by_id(&id)
            .filter(|connection| connection.channel() == channel)
    }

    /// Find a connection by socket handle
    ///
    /// Returns `None` for handles of retired connections.
    pub fn find_by_handle(&self, handle: SocketHandle) -> Option<Arc<Connection>> {
        let id = self.handles.get(&handle).map(|entry| entry.value().clone())?;
        self.find_by_id(&id)
            .filter(|connection| connection.handle() == handle)
    }

    /// Get all connections in insertion order
    pub fn all(&self) -> Vec<Arc<Connection>> {
        let mut entries: Vec<(u64, Arc<Connection>)> = self
            .connections
            .iter()
            .map(|entry| (entry.ordinal, entry.connection.clone()))
            .collect();
        entries.sort_by_key(|(ordinal, _)| *ordinal);
        entries
            .into_iter()
            .map(|(_, connection)| connection)
            .collect()
    }

    /// Get the number of connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connection_count", &self.len())
            .field("next_ordinal", &self.next_ordinal.load(Ordering::Relaxed))
            .finish()
    }
}
