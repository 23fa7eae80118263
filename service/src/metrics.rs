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

//! Lock-free metrics for the bridge

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free bridge metrics
///
/// Every recording method also forwards to the global `metrics` recorder,
/// so an exporter installed by the embedding application sees the same
/// numbers. Use [`snapshot`](Self::snapshot) for a point-in-time view.
#[derive(Debug)]
pub struct BridgeMetrics {
    // Lifecycle
    connect_attempts: AtomicU64,
    connect_failures: AtomicU64,
    connections_established: AtomicU64,
    graceful_disconnects: AtomicU64,
    forced_disconnects: AtomicU64,

    // Multiplexer
    poll_cycles: AtomicU64,
    idle_cycles: AtomicU64,
    stale_events: AtomicU64,

    // Routing
    events_routed: AtomicU64,
    moderation_actions: AtomicU64,
    messages_relayed: AtomicU64,

    started_at: Instant,
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            connect_attempts: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            connections_established: AtomicU64::new(0),
            graceful_disconnects: AtomicU64::new(0),
            forced_disconnects: AtomicU64::new(0),
            poll_cycles: AtomicU64::new(0),
            idle_cycles: AtomicU64::new(0),
            stale_events: AtomicU64::new(0),
            events_routed: AtomicU64::new(0),
            moderation_actions: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Lifecycle tracking

    /// Record a connect attempt
    pub fn connect_attempted(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.connect.attempts").increment(1);
    }

    /// Record a failed connect
    pub fn connect_failed(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.connect.failures").increment(1);
    }

    /// Record a completed handshake
    pub fn connection_established(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.connections.total").increment(1);
        gauge!("soapbridge.connections.active").increment(1.0);
    }

    /// Record a graceful disconnect
    pub fn graceful_disconnect(&self, was_connected: bool) {
        self.graceful_disconnects.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.disconnects.graceful").increment(1);
        if was_connected {
            gauge!("soapbridge.connections.active").decrement(1.0);
        }
    }

    /// Record a forced disconnect
    pub fn forced_disconnect(&self, was_connected: bool) {
        self.forced_disconnects.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.disconnects.forced").increment(1);
        if was_connected {
            gauge!("soapbridge.connections.active").decrement(1.0);
        }
    }

    // Multiplexer tracking

    /// Record one multiplexer wait
    pub fn poll_cycle(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.poll.cycles").increment(1);
    }

    /// Record one idle multiplexer cycle
    pub fn idle_cycle(&self) {
        self.idle_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a readiness event for a retired socket
    pub fn stale_event(&self) {
        self.stale_events.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.poll.stale").increment(1);
    }

    // Routing tracking

    /// Record a routed admin event
    pub fn event_routed(&self) {
        self.events_routed.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.events.routed").increment(1);
    }

    /// Record a moderation action
    pub fn moderation_action(&self) {
        self.moderation_actions.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.moderation.actions").increment(1);
    }

    /// Record a chat line relayed into a game
    pub fn message_relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        counter!("soapbridge.messages.relayed").increment(1);
    }

    /// Get a snapshot of all metrics
    ///
    /// Counters are read individually, so the snapshot is only approximately
    /// consistent while the bridge is running.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            graceful_disconnects: self.graceful_disconnects.load(Ordering::Relaxed),
            forced_disconnects: self.forced_disconnects.load(Ordering::Relaxed),
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
            idle_cycles: self.idle_cycles.load(Ordering::Relaxed),
            stale_events: self.stale_events.load(Ordering::Relaxed),
            events_routed: self.events_routed.load(Ordering::Relaxed),
            moderation_actions: self.moderation_actions.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// A snapshot of bridge metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Connect attempts
    pub connect_attempts: u64,
    /// Failed connects (open or handshake)
    pub connect_failures: u64,
    /// Completed handshakes
    pub connections_established: u64,
    /// Operator-requested disconnects
    pub graceful_disconnects: u64,
    /// Multiplexer-initiated disconnects
    pub forced_disconnects: u64,
    /// Multiplexer waits
    pub poll_cycles: u64,
    /// Multiplexer cycles with no active connection
    pub idle_cycles: u64,
    /// Discarded readiness events
    pub stale_events: u64,
    /// Admin events routed to chat
    pub events_routed: u64,
    /// Moderation actions taken
    pub moderation_actions: u64,
    /// Chat lines relayed into games
    pub messages_relayed: u64,
    /// Time since the metrics were created
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Connect success rate as a percentage
    pub fn connect_success_rate(&self) -> f64 {
        if self.connect_attempts == 0 {
            100.0
        } else {
            (self.connections_established as f64 / self.connect_attempts as f64) * 100.0
        }
    }
}
