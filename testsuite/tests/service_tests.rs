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


//! Bridge service start, relay and shutdown

use soapbridge_adminport::{AdminPacket, CloseMode};
use soapbridge_service::{
    BridgeError, ChannelName, Command, CommandOutcome, ConnectionStatus, InboundMessage,
    ServerConfig, ServerId,
};
use soapbridge_testsuite::{Harness, channel_context, server};

fn auto(id: &str, channel: &str) -> ServerConfig {
    ServerConfig::builder(id, channel, "127.0.0.1")
        .with_auto_connect(true)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_relay_into_game() {
    let h = Harness::with_servers([server("main", "#openttd")]);
    h.chat.trust("alice");
    let session = h.accept("Test Server");
    h.bridge
        .handle_command(
            &channel_context("alice", "#openttd"),
            Command::Connect { server: None },
        )
        .await;

    assert!(
        h.bridge
            .handle_message(&InboundMessage::text("#OpenTTD", "dave", "hello"))
            .await
    );
    assert!(
        h.bridge
            .handle_message(&InboundMessage::action("#openttd", "dave", "waves"))
            .await
    );
    assert!(
        !h.bridge
            .handle_message(&InboundMessage::text("#openttd", "dave", "!connect"))
            .await
    );
    assert!(
        !h.bridge
            .handle_message(&InboundMessage::text("#elsewhere", "dave", "hello"))
            .await
    );

    assert_eq!(
        session.sent(),
        vec![
            AdminPacket::broadcast_chat("IRC <dave> hello"),
            AdminPacket::broadcast_chat("IRC * dave waves"),
        ]
    );
    assert_eq!(h.bridge.metrics().snapshot().messages_relayed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_relay_skips_disconnected_server() {
    let h = Harness::with_servers([server("main", "#openttd")]);

    assert!(
        !h.bridge
            .handle_message(&InboundMessage::text("#openttd", "dave", "hello"))
            .await
    );
    assert_eq!(h.bridge.metrics().snapshot().messages_relayed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_connect_on_start_and_join() {
    let h = Harness::with_servers([auto("a", "#a"), auto("b", "#b"), server("c", "#c")]);
    h.chat.join("#a");
    h.accept("A");

    h.bridge.start().await.unwrap();
    assert!(h.bridge.is_running());
    assert_eq!(h.connection("a").status(), ConnectionStatus::Connected);
    assert_eq!(h.connection("b").status(), ConnectionStatus::Disconnected);
    assert_eq!(h.connection("c").status(), ConnectionStatus::Disconnected);
    assert_eq!(h.connector.open_count(), 1);

    h.chat.join("#b");
    h.accept("B");
    assert!(h.bridge.on_channel_joined(&ChannelName::new("#b")).await);
    assert!(!h.bridge.on_channel_joined(&ChannelName::new("#c")).await);
    assert!(!h.bridge.on_channel_joined(&ChannelName::new("#a")).await);
    assert!(!h.bridge.on_channel_joined(&ChannelName::new("#nowhere")).await);
    assert_eq!(h.connection("b").status(), ConnectionStatus::Connected);
    assert_eq!(h.connector.open_count(), 2);
    h.assert_consistent();

    h.bridge.shutdown().await.unwrap();
    assert_eq!(h.bridge.poller().registered_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_connect_failure_does_not_stop_start() {
    let h = Harness::with_servers([auto("a", "#a"), auto("b", "#b")]);
    h.connector.refuse();
    h.accept("B");

    h.bridge.start().await.unwrap();

    assert_eq!(h.connection("a").status(), ConnectionStatus::Disconnected);
    assert_eq!(h.connection("b").status(), ConnectionStatus::Connected);
    assert_eq!(h.chat.lines_to("#a"), vec!["Connection failed."]);
    h.bridge.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_start_and_shutdown_state() {
    let h = Harness::with_servers([server("main", "#openttd")]);

    assert!(matches!(
        h.bridge.shutdown().await,
        Err(BridgeError::ServiceNotRunning)
    ));
    h.bridge.start().await.unwrap();
    assert!(matches!(
        h.bridge.start().await,
        Err(BridgeError::ServiceAlreadyRunning)
    ));
    h.bridge.shutdown().await.unwrap();
    assert!(!h.bridge.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_every_session() {
    let h = Harness::with_servers([auto("a", "#a"), auto("b", "#b")]);
    let a = h.accept("A");
    let b = h.accept("B");
    h.bridge.start().await.unwrap();

    h.bridge.shutdown().await.unwrap();

    assert_eq!(a.closed(), Some(CloseMode::Forced));
    assert_eq!(b.closed(), Some(CloseMode::Forced));
    assert_eq!(h.bridge.poller().registered_count(), 0);
    for info in h.bridge.connections() {
        assert_eq!(info.status, ConnectionStatus::Disconnected);
        assert!(!info.registered);
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_reports_close_failure() {
    let h = Harness::with_servers([auto("main", "#openttd")]);
    let session = h.accept("Test Server");
    h.bridge.start().await.unwrap();
    session.fail_close();

    let result = h.bridge.shutdown().await;

    assert!(matches!(result, Err(BridgeError::CleanupFailed(_))));
    assert_eq!(h.bridge.poller().registered_count(), 0);
    assert_eq!(h.connection("main").status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_connects_after_shutdown() {
    let h = Harness::with_servers([auto("main", "#openttd")]);
    h.chat.trust("alice");
    h.chat.join_none();
    h.bridge.start().await.unwrap();
    h.bridge.shutdown().await.unwrap();
    h.chat.join("#openttd");
    let session = h.accept("Test Server");
    let id = ServerId::new("main");

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", "#openttd"),
            Command::Connect { server: None },
        )
        .await;
    assert_eq!(outcome, CommandOutcome::Unresolved);
    assert!(matches!(
        h.bridge.reconnect(&id).await,
        Err(BridgeError::ServiceNotRunning)
    ));
    assert!(matches!(
        h.bridge.lifecycle().connect(&id, None).await,
        Err(BridgeError::ServiceNotRunning)
    ));
    assert!(!h.bridge.on_channel_joined(&ChannelName::new("#openttd")).await);

    assert_eq!(h.bridge.poller().registered_count(), 0);
    assert_eq!(h.connector.open_count(), 0);
    assert_eq!(h.connection("main").status(), ConnectionStatus::Disconnected);
    assert_eq!(session.closed(), None);
    h.assert_consistent();
}

#[tokio::test(start_paused = true)]
async fn test_restart_accepts_connects_again() {
    let h = Harness::with_servers([server("main", "#openttd")]);
    h.chat.trust("alice");
    h.bridge.start().await.unwrap();
    h.bridge.shutdown().await.unwrap();
    h.bridge.start().await.unwrap();
    h.accept("Test Server");

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", "#openttd"),
            Command::Connect { server: None },
        )
        .await;

    assert_eq!(outcome, CommandOutcome::Executed);
    assert_eq!(h.connection("main").status(), ConnectionStatus::Connected);
    assert_eq!(h.bridge.poller().registered_count(), 1);
    h.bridge.shutdown().await.unwrap();
}
