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


//! In-memory test doubles for the bridge
//!
//! [`MemoryConnector`] hands out scripted [`MemorySession`]s, [`RecordingChat`]
//! captures every chat line, and [`CountingPoller`] observes how often the
//! multiplexer waits. [`Harness`] wires them into a [`BridgeService`].
//!
//! [`BridgeService`]: soapbridge_service::BridgeService

mod chat;
mod connector;
mod harness;
mod poller;
mod session;

pub use chat::RecordingChat;
pub use connector::MemoryConnector;
pub use harness::{Harness, channel_context, init_tracing, private_context, server};
pub use poller::CountingPoller;
pub use session::MemorySession;
