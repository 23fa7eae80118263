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


//! Scripted admin session

use async_trait::async_trait;
use soapbridge_adminport::{
    AdminError, AdminEvent, AdminPacket, AdminResult, AdminSession, CloseMode, CompanyId,
    CompanyInfo, Readiness, ServerInfo,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// One scripted read from the server side
#[derive(Debug)]
enum Inbound {
    /// A protocol unit decoding into these events
    Unit(Vec<AdminEvent>),
    /// Orderly close by the server
    Eof,
    /// Peer hung up without data
    Hangup,
    /// Socket read failure
    ReadError,
    /// Start of a unit whose remainder never arrives
    Partial,
}

#[derive(Debug, Default)]
struct SessionState {
    inbound: VecDeque<Inbound>,
    sent: Vec<AdminPacket>,
    closed: Option<CloseMode>,
    close_count: usize,
    fail_close: bool,
    companies: HashMap<CompanyId, CompanyInfo>,
    server_info: Option<ServerInfo>,
}

/// Admin session backed by an in-memory script
///
/// Readiness follows the head of the inbound queue. With nothing queued,
/// [`ready`](AdminSession::ready) and [`receive`](AdminSession::receive)
/// block until something is pushed or the session is closed.
#[derive(Debug, Default)]
pub struct MemorySession {
    state: Mutex<SessionState>,
    notify: Notify,
}

impl MemorySession {
    /// Create a session with nothing queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session whose first unit is the server welcome
    pub fn welcomed(name: &str, version: &str) -> Self {
        let session = Self::new();
        session.push_events(vec![AdminEvent::Welcome(ServerInfo::new(
            name, version, true,
        ))]);
        session
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, inbound: Inbound) {
        self.state().inbound.push_back(inbound);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Queue one protocol unit
    pub fn push_events(&self, events: Vec<AdminEvent>) {
        self.push(Inbound::Unit(events));
    }

    /// Queue an orderly close
    pub fn push_eof(&self) {
        self.push(Inbound::Eof);
    }

    /// Queue a hangup
    pub fn push_hangup(&self) {
        self.push(Inbound::Hangup);
    }

    /// Queue a read failure
    pub fn push_read_error(&self) {
        self.push(Inbound::ReadError);
    }

    /// Queue an incomplete unit
    ///
    /// The socket reports readable from then on, but every read blocks.
    pub fn push_partial(&self) {
        self.push(Inbound::Partial);
    }

    /// Deliver the rest of a unit queued with [`push_partial`](Self::push_partial)
    pub fn complete_partial(&self, events: Vec<AdminEvent>) {
        {
            let mut state = self.state();
            if let Some(front) = state.inbound.front_mut() {
                if matches!(front, Inbound::Partial) {
                    *front = Inbound::Unit(events);
                }
            }
        }
        self.notify.notify_waiters();
    }

    /// Add a company to the company table
    pub fn add_company(&self, id: u8, name: &str) {
        let id = CompanyId::new(id);
        self.state()
            .companies
            .insert(id, CompanyInfo::new(id, name));
    }

    /// Make every close report an error
    pub fn fail_close(&self) {
        self.state().fail_close = true;
    }

    /// Packets sent so far
    pub fn sent(&self) -> Vec<AdminPacket> {
        self.state().sent.clone()
    }

    /// How the session was first closed
    pub fn closed(&self) -> Option<CloseMode> {
        self.state().closed
    }

    /// Number of close calls
    pub fn close_count(&self) -> usize {
        self.state().close_count
    }

    /// Number of queued reads
    pub fn pending(&self) -> usize {
        self.state().inbound.len()
    }

    fn readiness(&self) -> Option<Readiness> {
        let state = self.state();
        if state.closed.is_some() {
            return Some(Readiness::HANGUP);
        }
        match state.inbound.front() {
            None => None,
            Some(Inbound::Hangup) => Some(Readiness::HANGUP),
            Some(_) => Some(Readiness::READABLE),
        }
    }
}

#[async_trait]
impl AdminSession for MemorySession {
    async fn ready(&self) -> io::Result<Readiness> {
        loop {
            let notified = self.notify.notified();
            if let Some(readiness) = self.readiness() {
                return Ok(readiness);
            }
            notified.await;
        }
    }

    async fn receive(&self) -> AdminResult<Option<Vec<AdminEvent>>> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state();
                if state.closed.is_some() {
                    return Err(AdminError::Closed);
                }
                let next = match state.inbound.front() {
                    Some(Inbound::Partial) => None,
                    _ => state.inbound.pop_front(),
                };
                match next {
                    Some(Inbound::Unit(events)) => {
                        for event in &events {
                            if let AdminEvent::Welcome(info) = event {
                                state.server_info = Some(info.clone());
                            }
                        }
                        return Ok(Some(events));
                    }
                    Some(Inbound::Eof) | Some(Inbound::Hangup) => return Ok(None),
                    Some(Inbound::ReadError) => {
                        return Err(AdminError::Io(io::Error::from(
                            io::ErrorKind::ConnectionReset,
                        )));
                    }
                    Some(Inbound::Partial) | None => {}
                }
            }
            notified.await;
        }
    }

    async fn send(&self, packet: AdminPacket) -> AdminResult<()> {
        let mut state = self.state();
        if state.closed.is_some() {
            return Err(AdminError::Closed);
        }
        state.sent.push(packet);
        Ok(())
    }

    async fn close(&self, mode: CloseMode) -> AdminResult<()> {
        let failed = {
            let mut state = self.state();
            state.close_count += 1;
            state.closed.get_or_insert(mode);
            state.fail_close
        };
        self.notify.notify_waiters();
        if failed {
            Err(AdminError::Io(io::Error::from(io::ErrorKind::BrokenPipe)))
        } else {
            Ok(())
        }
    }

    fn company(&self, id: CompanyId) -> Option<CompanyInfo> {
        self.state().companies.get(&id).cloned()
    }

    fn server_info(&self) -> Option<ServerInfo> {
        self.state().server_info.clone()
    }
}
