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


//! Observing poller

use async_trait::async_trait;
use soapbridge_adminport::{AdminSession, Readiness};
use soapbridge_service::{Poller, Result, SessionPoller, SocketHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// [`SessionPoller`] wrapper that counts waits
#[derive(Debug, Default)]
pub struct CountingPoller {
    inner: SessionPoller,
    waits: AtomicUsize,
    last_wait: Mutex<Vec<SocketHandle>>,
}

impl CountingPoller {
    /// Create an empty poller
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wait calls so far
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }

    /// Handles passed to the most recent wait
    pub fn last_wait(&self) -> Vec<SocketHandle> {
        self.last_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Poller for CountingPoller {
    fn register(&self, handle: SocketHandle, session: Arc<dyn AdminSession>) -> Result<()> {
        self.inner.register(handle, session)
    }

    fn deregister(&self, handle: SocketHandle) -> bool {
        self.inner.deregister(handle)
    }

    fn is_registered(&self, handle: SocketHandle) -> bool {
        self.inner.is_registered(handle)
    }

    fn registered_count(&self) -> usize {
        self.inner.registered_count()
    }

    async fn wait(
        &self,
        handles: &[SocketHandle],
        timeout: Duration,
    ) -> Result<Vec<(SocketHandle, Readiness)>> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        *self
            .last_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = handles.to_vec();
        self.inner.wait(handles, timeout).await
    }
}
