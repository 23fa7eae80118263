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


//! Command resolution, permissions and remote console forwarding

use soapbridge_adminport::AdminPacket;
use soapbridge_service::{
    BridgeConfig, CONNECTING, Command, CommandOutcome, ConnectionStatus, NOT_CONNECTED,
    ServerConfig, ServerId,
};
use soapbridge_testsuite::{Harness, channel_context, private_context, server};

fn connect_command() -> Command {
    Command::Connect { server: None }
}

#[tokio::test(start_paused = true)]
async fn test_untrusted_caller_is_denied() {
    let h = Harness::with_servers([server("main", "#openttd")]);

    let outcome = h
        .bridge
        .handle_command(&channel_context("mallory", "#openttd"), connect_command())
        .await;

    assert_eq!(outcome, CommandOutcome::Denied);
    assert_eq!(h.connector.open_count(), 0);
    assert!(h.chat.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_denied_rcon_looks_disconnected() {
    let h = Harness::with_servers([server("main", "#openttd")]);

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("mallory", "#openttd"),
            Command::parse("rcon say hi").unwrap(),
        )
        .await;

    assert_eq!(outcome, CommandOutcome::Denied);
    assert_eq!(h.chat.lines_to("#openttd"), vec![NOT_CONNECTED]);
}

#[tokio::test(start_paused = true)]
async fn test_operators_need_allow_ops() {
    let with_ops = ServerConfig::builder("ops", "#ops", "127.0.0.1")
        .with_allow_ops(true)
        .build()
        .unwrap();
    let h = Harness::with_servers([with_ops, server("plain", "#plain")]);
    h.chat.op("#ops", "bob");
    h.chat.op("#plain", "carol");
    h.accept("Ops Server");

    let outcome = h
        .bridge
        .handle_command(&channel_context("bob", "#ops"), connect_command())
        .await;
    assert_eq!(outcome, CommandOutcome::Executed);

    let outcome = h
        .bridge
        .handle_command(&channel_context("carol", "#plain"), connect_command())
        .await;
    assert_eq!(outcome, CommandOutcome::Denied);

    // Operator status in another channel does not count.
    let outcome = h
        .bridge
        .handle_command(
            &channel_context("carol", "#ops"),
            Command::Disconnect { server: None },
        )
        .await;
    assert_eq!(outcome, CommandOutcome::Denied);
    assert_eq!(h.connection("ops").status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_rcon_length_limit() {
    let h = Harness::new(
        BridgeConfig::default()
            .with_rcon_max_length(50)
            .with_server(server("main", "#openttd")),
    );
    h.chat.trust("alice");
    let session = h.accept("Test Server");
    let context = channel_context("alice", "#openttd");
    h.bridge.handle_command(&context, connect_command()).await;
    h.chat.clear();

    let outcome = h
        .bridge
        .handle_command(
            &context,
            Command::Rcon {
                command: "x".repeat(50),
            },
        )
        .await;
    assert_eq!(outcome, CommandOutcome::Rejected);
    assert_eq!(
        h.chat.lines_to("#openttd"),
        vec!["RCON Command too long (50/50)"]
    );
    assert!(session.sent().is_empty());

    let outcome = h
        .bridge
        .handle_command(
            &context,
            Command::Rcon {
                command: "x".repeat(49),
            },
        )
        .await;
    assert_eq!(outcome, CommandOutcome::Executed);
    assert_eq!(session.sent(), vec![AdminPacket::rcon("x".repeat(49))]);
}

#[tokio::test(start_paused = true)]
async fn test_rcon_requires_connection() {
    let h = Harness::with_servers([server("main", "#openttd")]);
    h.chat.trust("alice");

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", "#openttd"),
            Command::parse("rcon say hi").unwrap(),
        )
        .await;

    assert_eq!(outcome, CommandOutcome::Rejected);
    assert_eq!(h.chat.lines_to("#openttd"), vec![NOT_CONNECTED]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_unpause() {
    let h = Harness::with_servers([server("main", "#openttd")]);
    h.chat.trust("alice");
    let session = h.accept("Test Server");
    let context = channel_context("alice", "#openttd");
    h.bridge.handle_command(&context, connect_command()).await;

    h.bridge.handle_command(&context, Command::Pause).await;
    h.bridge.handle_command(&context, Command::Unpause).await;

    assert_eq!(
        session.sent(),
        vec![AdminPacket::rcon("pause"), AdminPacket::rcon("unpause")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_private_command_with_single_server() {
    let h = Harness::with_servers([server("main", "#openttd")]);
    h.chat.trust("alice");
    h.accept("Test Server");

    let outcome = h
        .bridge
        .handle_command(&private_context("alice"), connect_command())
        .await;

    assert_eq!(outcome, CommandOutcome::Executed);
    let expected = vec![CONNECTING, "Connected to Test Server(14.1)"];
    assert_eq!(h.chat.lines_to("#openttd"), expected);
    assert_eq!(h.chat.lines_to("alice"), expected);
}

#[tokio::test(start_paused = true)]
async fn test_private_command_needs_id_with_many_servers() {
    let h = Harness::with_servers([server("a", "#a"), server("b", "#b")]);
    h.chat.trust("alice");

    let outcome = h
        .bridge
        .handle_command(&private_context("alice"), connect_command())
        .await;
    assert_eq!(outcome, CommandOutcome::Unresolved);
    assert!(h.chat.messages().is_empty());

    h.accept("B");
    let outcome = h
        .bridge
        .handle_command(
            &private_context("alice"),
            Command::parse("connect b").unwrap(),
        )
        .await;
    assert_eq!(outcome, CommandOutcome::Executed);
    assert_eq!(h.connection("b").status(), ConnectionStatus::Connected);
    assert_eq!(h.connection("a").status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_server_id_is_ignored() {
    let h = Harness::with_servers([server("main", "#openttd")]);
    h.chat.trust("alice");

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", "#openttd"),
            Command::Connect {
                server: Some(ServerId::new("nope")),
            },
        )
        .await;

    assert_eq!(outcome, CommandOutcome::Unresolved);
    assert!(h.chat.messages().is_empty());
    assert_eq!(h.connector.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_id_from_other_channel() {
    let h = Harness::with_servers([server("a", "#a"), server("b", "#b")]);
    h.chat.trust("alice");
    h.accept("B");

    let outcome = h
        .bridge
        .handle_command(
            &channel_context("alice", "#a"),
            Command::parse("apconnect b").unwrap(),
        )
        .await;

    assert_eq!(outcome, CommandOutcome::Executed);
    assert_eq!(h.chat.lines_to("#b"), h.chat.lines_to("#a"));
    assert_eq!(h.chat.count("#b", "Connected to B(14.1)"), 1);
}
