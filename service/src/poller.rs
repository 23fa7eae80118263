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

//! Readiness polling
//!
//! The [`Poller`] trait is the readiness primitive the multiplexer blocks on.
//! [`SessionPoller`] implements it on top of [`AdminSession::ready`], fanning
//! in every registered session's readiness future and returning all results
//! available once the first one fires.

use crate::{BridgeError, Result, SocketHandle};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::stream::{FuturesUnordered, StreamExt};
use soapbridge_adminport::{AdminSession, Readiness};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Readiness multiplexing primitive
#[async_trait]
pub trait Poller: Send + Sync + 'static {
    /// Register a session under a socket handle
    ///
    /// A handle may be registered at most once.
    fn register(&self, handle: SocketHandle, session: Arc<dyn AdminSession>) -> Result<()>;

    /// Remove a registration
    ///
    /// Returns `false` if the handle was not registered; that is not an error.
    fn deregister(&self, handle: SocketHandle) -> bool;

    /// Check if a handle is registered
    fn is_registered(&self, handle: SocketHandle) -> bool;

    /// Get the number of registered handles
    fn registered_count(&self) -> usize;

    /// Wait up to `timeout` for any of `handles` to become ready
    ///
    /// Returns every (handle, readiness) pair available when the wait ends;
    /// an empty result means the timeout elapsed. Unregistered handles are
    /// ignored.
    async fn wait(
        &self,
        handles: &[SocketHandle],
        timeout: Duration,
    ) -> Result<Vec<(SocketHandle, Readiness)>>;
}

/// Poller over admin sessions
#[derive(Default)]
pub struct SessionPoller {
    sources: DashMap<SocketHandle, Arc<dyn AdminSession>>,
}

impl SessionPoller {
    /// Create an empty poller
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Poller for SessionPoller {
    fn register(&self, handle: SocketHandle, session: Arc<dyn AdminSession>) -> Result<()> {
        match self.sources.entry(handle) {
            Entry::Occupied(_) => Err(BridgeError::AlreadyRegistered(handle)),
            Entry::Vacant(slot) => {
                slot.insert(session);
                debug!(handle = %handle, "Registered socket");
                Ok(())
            }
        }
    }

    fn deregister(&self, handle: SocketHandle) -> bool {
        let removed = self.sources.remove(&handle).is_some();
        if removed {
            debug!(handle = %handle, "Deregistered socket");
        } else {
            trace!(handle = %handle, "Socket was not registered");
        }
        removed
    }

    fn is_registered(&self, handle: SocketHandle) -> bool {
        self.sources.contains_key(&handle)
    }

    fn registered_count(&self) -> usize {
        self.sources.len()
    }

    async fn wait(
        &self,
        handles: &[SocketHandle],
        timeout: Duration,
    ) -> Result<Vec<(SocketHandle, Readiness)>> {
        let mut pending = FuturesUnordered::new();
        for handle in handles {
            let Some(session) = self.sources.get(handle).map(|entry| entry.value().clone()) else {
                continue;
            };
            let handle = *handle;
            pending.push(async move {
                let readiness = match session.ready().await {
                    Ok(readiness) => readiness,
                    Err(e) => {
                        debug!(handle = %handle, error = %e, "Readiness check failed");
                        Readiness::ERROR
                    }
                };
                (handle, readiness)
            });
        }

        if pending.is_empty() {
            tokio::time::sleep(timeout).await;
            return Ok(Vec::new());
        }

        let mut ready = Vec::new();
        match tokio::time::timeout(timeout, pending.next()).await {
            Ok(Some(first)) => ready.push(first),
            Ok(None) | Err(_) => return Ok(ready),
        }
        while let Some(Some(next)) = pending.next().now_or_never() {
            ready.push(next);
        }
        ready.retain(|(_, readiness)| !readiness.is_empty());
        Ok(ready)
    }
}

impl std::fmt::Debug for SessionPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPoller")
            .field("registered", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soapbridge_adminport::{
        AdminEvent, AdminPacket, AdminResult, CloseMode, CompanyId, CompanyInfo, ServerInfo,
    };
    use tracing_test::traced_test;

    /// Session that reports a fixed readiness, or never becomes ready
    struct FixedSession(Option<Readiness>);

    #[async_trait]
    impl AdminSession for FixedSession {
        async fn ready(&self) -> std::io::Result<Readiness> {
            match self.0 {
                Some(readiness) => Ok(readiness),
                None => std::future::pending().await,
            }
        }
        async fn receive(&self) -> AdminResult<Option<Vec<AdminEvent>>> {
            Ok(None)
        }
        async fn send(&self, _packet: AdminPacket) -> AdminResult<()> {
            Ok(())
        }
        async fn close(&self, _mode: CloseMode) -> AdminResult<()> {
            Ok(())
        }
        fn company(&self, _id: CompanyId) -> Option<CompanyInfo> {
            None
        }
        fn server_info(&self) -> Option<ServerInfo> {
            None
        }
    }

    struct FailingSession;

    #[async_trait]
    impl AdminSession for FailingSession {
        async fn ready(&self) -> std::io::Result<Readiness> {
            Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
        }
        async fn receive(&self) -> AdminResult<Option<Vec<AdminEvent>>> {
            Ok(None)
        }
        async fn send(&self, _packet: AdminPacket) -> AdminResult<()> {
            Ok(())
        }
        async fn close(&self, _mode: CloseMode) -> AdminResult<()> {
            Ok(())
        }
        fn company(&self, _id: CompanyId) -> Option<CompanyInfo> {
            None
        }
        fn server_info(&self) -> Option<ServerInfo> {
            None
        }
    }

    #[test]
    fn test_register_once() {
        let poller = SessionPoller::new();
        let handle = SocketHandle::new(1);
        poller
            .register(handle, Arc::new(FixedSession(None)))
            .unwrap();

        assert!(matches!(
            poller.register(handle, Arc::new(FixedSession(None))),
            Err(BridgeError::AlreadyRegistered(_))
        ));
        assert_eq!(poller.registered_count(), 1);
    }

    #[test]
    fn test_deregister_tolerates_miss() {
        let poller = SessionPoller::new();
        let handle = SocketHandle::new(1);
        poller
            .register(handle, Arc::new(FixedSession(None)))
            .unwrap();

        assert!(poller.deregister(handle));
        assert!(!poller.deregister(handle));
        assert!(!poller.is_registered(handle));
    }

    #[tokio::test]
    async fn test_wait_collects_ready_sockets() {
        let poller = SessionPoller::new();
        let ready = SocketHandle::new(1);
        let idle = SocketHandle::new(2);
        let hung = SocketHandle::new(3);
        poller
            .register(ready, Arc::new(FixedSession(Some(Readiness::READABLE))))
            .unwrap();
        poller
            .register(idle, Arc::new(FixedSession(None)))
            .unwrap();
        poller
            .register(hung, Arc::new(FixedSession(Some(Readiness::HANGUP))))
            .unwrap();

        let mut result = poller
            .wait(&[ready, idle, hung], Duration::from_secs(1))
            .await
            .unwrap();
        result.sort_by_key(|(handle, _)| *handle);

        assert_eq!(
            result,
            vec![(ready, Readiness::READABLE), (hung, Readiness::HANGUP)]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_wait_maps_io_error() {
        let poller = SessionPoller::new();
        let handle = SocketHandle::new(1);
        poller.register(handle, Arc::new(FailingSession)).unwrap();

        let result = poller
            .wait(&[handle], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result, vec![(handle, Readiness::ERROR)]);
        assert!(logs_contain("Readiness check failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let poller = SessionPoller::new();
        let handle = SocketHandle::new(1);
        poller
            .register(handle, Arc::new(FixedSession(None)))
            .unwrap();

        let result = poller
            .wait(&[handle], Duration::from_millis(50))
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ignores_unregistered() {
        let poller = SessionPoller::new();
        let result = poller
            .wait(&[SocketHandle::new(9)], Duration::from_millis(50))
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
