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

//! Poll multiplexer
//!
//! The PollMultiplexer is the single background loop that:
//! - Builds the active set (connected and registered connections)
//! - Sleeps instead of polling when the active set is empty
//! - Waits on the poller for readiness
//! - Reads one unit per readable socket and routes its events in order
//! - Hands failed sockets to the forced-disconnect path
//!
//! Ready sockets are served concurrently within a cycle, and each read is
//! bounded by the poll timeout, so a slow connection cannot hold back the
//! others. A read that runs out of budget is retried on the next cycle; the
//! connection is only disconnected once its reads have stalled for as long
//! as its configured timeout. A failure on one connection never ends the
//! loop.

use crate::{
    BridgeMetrics, Connection, ConnectionRegistry, EventRouter, LifecycleController, Poller,
    SocketHandle,
};
use futures_util::stream::{FuturesUnordered, StreamExt};
use soapbridge_adminport::Readiness;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Result of one multiplexer cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No connection was active; the poller was not called
    Idle,
    /// The poller was called and this many readiness events were handled
    Polled(usize),
    /// The poller itself failed
    Failed,
}

/// Single-task readiness loop over all active connections
pub struct PollMultiplexer {
    registry: Arc<ConnectionRegistry>,
    poller: Arc<dyn Poller>,
    lifecycle: Arc<LifecycleController>,
    router: Arc<EventRouter>,
    metrics: Arc<BridgeMetrics>,
    poll_timeout: Duration,
    idle_interval: Duration,
}

impl PollMultiplexer {
    /// Create a new multiplexer
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        poller: Arc<dyn Poller>,
        lifecycle: Arc<LifecycleController>,
        router: Arc<EventRouter>,
        metrics: Arc<BridgeMetrics>,
        poll_timeout: Duration,
        idle_interval: Duration,
    ) -> Self {
        Self {
            registry,
            poller,
            lifecycle,
            router,
            metrics,
            poll_timeout,
            idle_interval,
        }
    }

    /// Spawn the loop on the runtime
    ///
    /// The loop stops after its current cycle once `token` is cancelled.
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }

    /// Run the loop until `token` is cancelled
    pub async fn run(&self, token: CancellationToken) {
        info!("Poll multiplexer started");
        while !token.is_cancelled() {
            match self.run_cycle().await {
                CycleOutcome::Polled(_) => {}
                CycleOutcome::Idle | CycleOutcome::Failed => {
                    select! {
                        _ = token.cancelled() => break,
                        _ = sleep(self.idle_interval) => {}
                    }
                }
            }
        }
        info!("Poll multiplexer stopped");
    }

    /// Run one cycle
    pub async fn run_cycle(&self) -> CycleOutcome {
        let active: Vec<Arc<Connection>> = self
            .registry
            .all()
            .into_iter()
            .filter(|connection| connection.is_active())
            .collect();
        if active.is_empty() {
            self.metrics.idle_cycle();
            trace!("No active connections");
            return CycleOutcome::Idle;
        }

        let handles: Vec<SocketHandle> = active.iter().map(|c| c.handle()).collect();
        self.metrics.poll_cycle();
        let ready = match self.poller.wait(&handles, self.poll_timeout).await {
            Ok(ready) => ready,
            Err(e) => {
                warn!(error = %e, "Poller wait failed");
                return CycleOutcome::Failed;
            }
        };

        let count = ready.len();
        let mut dispatches: FuturesUnordered<_> = ready
            .into_iter()
            .map(|(handle, readiness)| self.dispatch(handle, readiness))
            .collect();
        while dispatches.next().await.is_some() {}
        CycleOutcome::Polled(count)
    }

    async fn dispatch(&self, handle: SocketHandle, readiness: Readiness) {
        // The socket may have been retired between the wait and now.
        let Some(connection) = self
            .registry
            .find_by_handle(handle)
            .filter(|connection| connection.is_active())
        else {
            self.metrics.stale_event();
            debug!(handle = %handle, readiness = ?readiness, "Discarding stale readiness");
            return;
        };
        let Some(session) = connection.session() else {
            self.metrics.stale_event();
            return;
        };
        let id = connection.id();
        trace!(server_id = %id, handle = %handle, readiness = ?readiness, "Socket ready");

        if readiness.is_readable() {
            let budget = self.poll_timeout.min(connection.config().timeout());
            match timeout(budget, session.receive()).await {
                Ok(Ok(Some(events))) => {
                    connection.clear_stall();
                    for event in events {
                        self.router.route(&connection, &session, event).await;
                    }
                }
                Ok(Ok(None)) => {
                    info!(server_id = %id, handle = %handle, "Session closed by server");
                    self.lifecycle.force_disconnect(id, handle).await;
                    return;
                }
                Ok(Err(e)) => {
                    warn!(server_id = %id, handle = %handle, error = %e, "Receive failed");
                    self.lifecycle.force_disconnect(id, handle).await;
                    return;
                }
                Err(_) => {
                    let stalled = connection.note_stall(budget);
                    if stalled < connection.config().timeout() {
                        debug!(
                            server_id = %id,
                            handle = %handle,
                            stalled = ?stalled,
                            "Read incomplete, retrying next cycle"
                        );
                        return;
                    }
                    warn!(server_id = %id, handle = %handle, stalled = ?stalled, "Receive stalled");
                    self.lifecycle.force_disconnect(id, handle).await;
                    return;
                }
            }
        }

        if readiness.is_failure() && connection.is_active() {
            warn!(server_id = %id, handle = %handle, readiness = ?readiness, "Socket failed");
            self.lifecycle.force_disconnect(id, handle).await;
        }
    }
}

impl std::fmt::Debug for PollMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollMultiplexer")
            .field("poll_timeout", &self.poll_timeout)
            .field("idle_interval", &self.idle_interval)
            .finish()
    }
}
