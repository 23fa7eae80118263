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


//! Connect, disconnect and reconnect behavior

use soapbridge_adminport::CloseMode;
use soapbridge_service::{
    ALREADY_CONNECTED, BridgeError, CONNECTING, CONNECTION_FAILED, Command, CommandOutcome,
    ConnectionStatus, CycleOutcome, DISCONNECTED, DISCONNECTED_UNCLEAN, FORCED_DISCONNECT,
    NOT_CONNECTED, ServerId, SocketHandle,
};
use soapbridge_testsuite::{Harness, MemorySession, channel_context, server};
use std::sync::Arc;

const CHANNEL: &str = "#openttd";

fn harness() -> Harness {
    let h = Harness::with_servers([server("main", CHANNEL)]);
    h.chat.trust("alice");
    h
}

async fn connect(h: &Harness) {
    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", CHANNEL),
            Command::Connect { server: None },
        )
        .await;
    assert_eq!(outcome, CommandOutcome::Executed);
}

async fn disconnect(h: &Harness) -> CommandOutcome {
    h.bridge
        .handle_command(
            &channel_context("alice", CHANNEL),
            Command::Disconnect { server: None },
        )
        .await
}

#[tokio::test(start_paused = true)]
async fn test_connect_announces_and_registers() {
    let h = harness();
    h.accept("Test Server");
    h.assert_consistent();

    connect(&h).await;

    assert_eq!(
        h.chat.lines_to(CHANNEL),
        vec![CONNECTING, "Connected to Test Server(14.1)"]
    );
    assert_eq!(h.connection("main").status(), ConnectionStatus::Connected);
    h.assert_consistent();

    let opened = h.connector.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].host, "127.0.0.1");
    assert_eq!(opened[0].port, 3977);
    assert_eq!(opened[0].password, "secret");
    assert_eq!(opened[0].name, "Soap");
}

#[tokio::test(start_paused = true)]
async fn test_connect_refused() {
    let h = harness();
    h.connector.refuse();

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", CHANNEL),
            Command::Connect { server: None },
        )
        .await;

    assert_eq!(outcome, CommandOutcome::Rejected);
    assert_eq!(h.chat.lines_to(CHANNEL), vec![CONNECTION_FAILED]);
    assert_eq!(h.connection("main").status(), ConnectionStatus::Disconnected);
    assert_eq!(h.bridge.poller().registered_count(), 0);
    h.assert_consistent();

    let metrics = h.bridge.metrics().snapshot();
    assert_eq!(metrics.connect_attempts, 1);
    assert_eq!(metrics.connect_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_open_times_out() {
    let h = harness();
    h.connector.hang();

    let result = h
        .bridge
        .lifecycle()
        .connect(&ServerId::new("main"), None)
        .await;

    assert!(matches!(result, Err(BridgeError::ConnectionFailed(_))));
    assert_eq!(h.chat.lines_to(CHANNEL), vec![CONNECTION_FAILED]);
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_handshake_timeout_cleans_up() {
    let h = harness();
    let silent = Arc::new(MemorySession::new());
    h.connector.accept(silent.clone());

    let result = h
        .bridge
        .lifecycle()
        .connect(&ServerId::new("main"), None)
        .await;

    assert!(matches!(result, Err(BridgeError::HandshakeTimeout(_))));
    assert_eq!(h.chat.lines_to(CHANNEL), vec![CONNECTING, CONNECTION_FAILED]);
    assert_eq!(silent.closed(), Some(CloseMode::Forced));
    assert_eq!(h.connection("main").status(), ConnectionStatus::Disconnected);
    h.assert_consistent();

    // The failed attempt spent the connection; the next one starts fresh.
    let spent = h.connection("main").handle();
    h.accept("Test Server");
    connect(&h).await;
    assert_ne!(h.connection("main").handle(), spent);
    assert!(!h.bridge.poller().is_registered(spent));
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_double_disconnect() {
    let h = harness();
    let session = h.accept("Test Server");
    connect(&h).await;
    h.chat.clear();

    assert_eq!(
        disconnect(&h).await,
        CommandOutcome::Executed
    );
    assert_eq!(session.closed(), Some(CloseMode::Graceful));
    h.assert_consistent();

    assert_eq!(
        disconnect(&h).await,
        CommandOutcome::Rejected
    );
    assert_eq!(h.chat.lines_to(CHANNEL), vec![DISCONNECTED, NOT_CONNECTED]);
    assert_eq!(session.close_count(), 1);
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_reports_unclean_close() {
    let h = harness();
    let session = h.accept("Test Server");
    connect(&h).await;
    session.fail_close();
    h.chat.clear();

    disconnect(&h).await;

    assert_eq!(h.chat.lines_to(CHANNEL), vec![DISCONNECTED_UNCLEAN]);
    assert_eq!(h.connection("main").status(), ConnectionStatus::Disconnected);
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_connect_when_connected() {
    let h = harness();
    h.accept("Test Server");
    connect(&h).await;
    h.chat.clear();

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", CHANNEL),
            Command::Connect { server: None },
        )
        .await;

    assert_eq!(outcome, CommandOutcome::Rejected);
    assert_eq!(h.chat.lines_to(CHANNEL), vec![ALREADY_CONNECTED]);
    assert_eq!(h.connector.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_replaces_connection() {
    let h = harness();
    let first = h.accept("Test Server");
    connect(&h).await;
    let old = h.connection("main");
    let old_handle = old.handle();

    assert!(matches!(
        h.bridge.reconnect(&ServerId::new("main")).await,
        Err(BridgeError::AlreadyConnected(_))
    ));

    first.push_hangup();
    assert_eq!(
        h.bridge.multiplexer().run_cycle().await,
        CycleOutcome::Polled(1)
    );
    assert_eq!(old.status(), ConnectionStatus::Disconnected);
    h.chat.clear();

    h.accept("Test Server");
    h.bridge.reconnect(&ServerId::new("main")).await.unwrap();

    let fresh = h.connection("main");
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert_ne!(fresh.handle(), old_handle);
    assert_eq!(fresh.status(), ConnectionStatus::Connected);
    assert_eq!(old.status(), ConnectionStatus::Disconnected);
    assert!(h.bridge.registry().find_by_handle(old_handle).is_none());
    assert!(!h.bridge.poller().is_registered(old_handle));
    assert_eq!(
        h.chat.lines_to(CHANNEL),
        vec![CONNECTING, "Connected to Test Server(14.1)"]
    );
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_disconnect_uses_new_handle() {
    let h = harness();
    h.accept("Test Server");
    connect(&h).await;
    let first = h.connection("main").handle();
    disconnect(&h).await;

    h.accept("Test Server");
    connect(&h).await;
    let second = h.connection("main").handle();

    assert_ne!(first, second);
    assert!(h.bridge.poller().is_registered(second));
    assert!(!h.bridge.poller().is_registered(first));
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_force_disconnect_ignores_stale_handle() {
    let h = harness();
    h.accept("Test Server");
    connect(&h).await;
    let id = ServerId::new("main");
    let handle = h.connection("main").handle();
    let lifecycle = h.bridge.lifecycle();

    assert!(!lifecycle.force_disconnect(&id, SocketHandle::new(999)).await);
    assert_eq!(h.connection("main").status(), ConnectionStatus::Connected);

    assert!(lifecycle.force_disconnect(&id, handle).await);
    assert!(!lifecycle.force_disconnect(&id, handle).await);

    assert_eq!(h.chat.count(CHANNEL, FORCED_DISCONNECT), 1);
    assert_eq!(h.bridge.metrics().snapshot().forced_disconnects, 1);
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_forced_and_graceful_disconnect_race() {
    let h = harness();
    h.accept("Test Server");
    connect(&h).await;
    let id = ServerId::new("main");
    let handle = h.connection("main").handle();
    let lifecycle = h.bridge.lifecycle();
    h.chat.clear();

    let (forced, graceful) = tokio::join!(
        lifecycle.force_disconnect(&id, handle),
        lifecycle.disconnect(&id, None),
    );

    // Whichever ran first wins; the other sees a disconnected server.
    let notices = h.chat.lines_to(CHANNEL);
    assert_eq!(notices.len(), 1);
    if forced {
        assert!(matches!(graceful, Err(BridgeError::NotConnected(_))));
        assert_eq!(notices, vec![FORCED_DISCONNECT]);
    } else {
        assert!(graceful.is_ok());
        assert_eq!(notices, vec![DISCONNECTED]);
    }
    h.assert_consistent();
}
