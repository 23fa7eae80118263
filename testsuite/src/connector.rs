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


//! Scripted admin connector

use crate::MemorySession;
use async_trait::async_trait;
use soapbridge_adminport::{AdminConnector, AdminError, AdminResult, AdminSession, SessionParams};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
enum Script {
    Accept(Arc<MemorySession>),
    Refuse,
    Hang,
}

#[derive(Debug, Default)]
struct ConnectorState {
    script: VecDeque<Script>,
    opened: Vec<SessionParams>,
}

/// Connector answering open requests from a queue
///
/// An open request with nothing queued is refused.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    state: Mutex<ConnectorState>,
}

impl MemoryConnector {
    /// Create a connector with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer the next open with `session`
    pub fn accept(&self, session: Arc<MemorySession>) {
        self.state().script.push_back(Script::Accept(session));
    }

    /// Answer the next open with a refused connection
    pub fn refuse(&self) {
        self.state().script.push_back(Script::Refuse);
    }

    /// Never answer the next open
    pub fn hang(&self) {
        self.state().script.push_back(Script::Hang);
    }

    /// Parameters of every open request so far
    pub fn opened(&self) -> Vec<SessionParams> {
        self.state().opened.clone()
    }

    /// Number of open requests so far
    pub fn open_count(&self) -> usize {
        self.state().opened.len()
    }
}

#[async_trait]
impl AdminConnector for MemoryConnector {
    async fn open(&self, params: &SessionParams) -> AdminResult<Arc<dyn AdminSession>> {
        let next = {
            let mut state = self.state();
            state.opened.push(params.clone());
            state.script.pop_front()
        };
        match next {
            Some(Script::Accept(session)) => Ok(session as Arc<dyn AdminSession>),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Refuse) | None => Err(AdminError::Io(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            ))),
        }
    }
}
