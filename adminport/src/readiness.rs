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

//! Socket readiness masks

use std::fmt;
use std::io;
use std::ops::{BitOr, BitOrAssign};
use tokio::io::Interest;
use tokio::net::TcpStream;

/// Readiness event mask reported for one socket
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Readiness(u8);

impl Readiness {
    /// No events
    pub const EMPTY: Readiness = Readiness(0);
    /// Data is available to read
    pub const READABLE: Readiness = Readiness(0b0001);
    /// Priority (out-of-band) data is available
    pub const PRIORITY: Readiness = Readiness(0b0010);
    /// The socket reported an error condition
    pub const ERROR: Readiness = Readiness(0b0100);
    /// The peer hung up
    pub const HANGUP: Readiness = Readiness(0b1000);

    /// Check whether every bit of `other` is set
    pub fn contains(self, other: Readiness) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no bits are set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Readable or priority data is pending
    pub fn is_readable(self) -> bool {
        self.0 & (Self::READABLE.0 | Self::PRIORITY.0) != 0
    }

    /// An error or hangup was reported
    pub fn is_failure(self) -> bool {
        self.0 & (Self::ERROR.0 | Self::HANGUP.0) != 0
    }
}

impl BitOr for Readiness {
    type Output = Readiness;

    fn bitor(self, rhs: Readiness) -> Readiness {
        Readiness(self.0 | rhs.0)
    }
}

impl BitOrAssign for Readiness {
    fn bitor_assign(&mut self, rhs: Readiness) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        for (flag, name) in [
            (Self::READABLE, "READABLE"),
            (Self::PRIORITY, "PRIORITY"),
            (Self::ERROR, "ERROR"),
            (Self::HANGUP, "HANGUP"),
        ] {
            if self.contains(flag) {
                names.push(name);
            }
        }
        if names.is_empty() {
            write!(f, "Readiness(EMPTY)")
        } else {
            write!(f, "Readiness({})", names.join(" | "))
        }
    }
}

/// Wait until a TCP stream becomes readable or is closed by the peer
///
/// Session implementations backed by a [`TcpStream`] can delegate
/// [`AdminSession::ready`](crate::AdminSession::ready) to this function.
/// A closed read half is reported as `READABLE | HANGUP` so that buffered
/// data is still drained before the session is torn down.
pub async fn stream_readiness(stream: &TcpStream) -> io::Result<Readiness> {
    let ready = stream.ready(Interest::READABLE).await?;
    let mut readiness = Readiness::EMPTY;
    if ready.is_readable() {
        readiness |= Readiness::READABLE;
    }
    if ready.is_read_closed() {
        readiness |= Readiness::HANGUP;
    }
    Ok(readiness)
}
