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

//! Event routing
//!
//! Translates admin events into chat lines and applies the player-name
//! moderation policy. Rendering is pure ([`render`]); [`EventRouter::route`]
//! performs the resulting side effects in order.

use crate::{BridgeMetrics, ChatTransport, Connection, InboundMessage, MessageKind};
use soapbridge_adminport::{
    AdminEvent, AdminPacket, AdminSession, ChatAction, ClientField, ClientInfo, ClientRef,
    CompanyId, CompanyInfo,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Private notice sent to players caught by the name policy
pub const RENAME_NOTICE: &str = "Please change your name before joining/starting a company";

/// Result of rendering one admin event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Line for the bound channel
    pub line: Option<String>,
    /// Client to move to spectators
    pub moderate: Option<ClientInfo>,
}

/// Render an admin event
///
/// `companies` resolves company IDs through the session's company table.
pub fn render<F>(event: &AdminEvent, companies: F, play_as_player: bool) -> Rendered
where
    F: Fn(CompanyId) -> Option<CompanyInfo>,
{
    match event {
        AdminEvent::Chat {
            action,
            dest_type,
            client,
            message,
            data,
        } => {
            let (name, company) = match client {
                ClientRef::Known(info) => (info.name.clone(), companies(info.play_as)),
                ClientRef::Unknown(id) => (id.to_string(), None),
            };
            let (company_name, company_number) = match &company {
                Some(company) => (company.name.clone(), company.id.display_number().to_string()),
                None => ("Unknown".to_string(), "?".to_string()),
            };
            let moderate = || {
                client
                    .known()
                    .filter(|_| !play_as_player && violates_name_policy(&name))
                    .cloned()
            };

            match action {
                ChatAction::Chat => Rendered {
                    line: Some(format!("<{}> {}", name, message)),
                    moderate: None,
                },
                ChatAction::ChatCompany | ChatAction::ChatClient => Rendered::default(),
                ChatAction::CompanySpectator => Rendered {
                    line: Some(format!("*** {} has joined spectators", name)),
                    moderate: None,
                },
                ChatAction::CompanyJoin => Rendered {
                    line: Some(format!(
                        "*** {} has joined {} (Company #{})",
                        name, company_name, company_number
                    )),
                    moderate: moderate(),
                },
                ChatAction::CompanyNew => Rendered {
                    line: Some(format!(
                        "*** {} had created a new company: {}(Company #{})",
                        name, company_name, company_number
                    )),
                    moderate: moderate(),
                },
                _ => Rendered {
                    line: Some(format!(
                        "AdminChat: Action {:?}, DestType {:?}, name {}, companyname {}, message {:?}, data {}",
                        action, dest_type, name, company_name, message, data
                    )),
                    moderate: None,
                },
            }
        }
        AdminEvent::ClientJoin(ClientRef::Known(client)) => Rendered {
            line: Some(format!(
                "*** {} (Client #{}) has joined the game",
                client.name, client.id
            )),
            moderate: None,
        },
        AdminEvent::ClientQuit(ClientRef::Known(client)) => Rendered {
            line: Some(format!(
                "*** {} (Client #{}) has left the game (leaving)",
                client.name, client.id
            )),
            moderate: None,
        },
        AdminEvent::ClientUpdate { old, new, changed } if changed.contains(&ClientField::Name) => {
            Rendered {
                line: Some(format!("*** {} is now known as {}", old.name, new.name)),
                moderate: None,
            }
        }
        _ => Rendered::default(),
    }
}

/// Check a player name against the "no default names in companies" policy
pub fn violates_name_policy(name: &str) -> bool {
    name.to_lowercase().contains("player")
}

/// Format a chat line for relaying into the game
pub fn relay_line(message: &InboundMessage) -> String {
    match message.kind {
        MessageKind::Normal => format!("IRC <{}> {}", message.nick, message.text),
        MessageKind::Action => format!("IRC * {} {}", message.nick, message.text),
    }
}

/// Routes admin events to the chat transport
pub struct EventRouter {
    chat: Arc<dyn ChatTransport>,
    metrics: Arc<BridgeMetrics>,
}

impl EventRouter {
    /// Create a router
    pub fn new(chat: Arc<dyn ChatTransport>, metrics: Arc<BridgeMetrics>) -> Self {
        Self { chat, metrics }
    }

    /// Route one event from `connection`
    ///
    /// Emits the channel line first, then (if triggered) the moderation
    /// action: move to spectators, private notice, and the notice's echo.
    pub async fn route(
        &self,
        connection: &Connection,
        session: &Arc<dyn AdminSession>,
        event: AdminEvent,
    ) {
        let rendered = render(
            &event,
            |id| session.company(id),
            connection.config().play_as_player(),
        );
        self.metrics.event_routed();

        if let Some(line) = rendered.line {
            self.chat
                .send_message(connection.channel().as_str(), &line)
                .await;
        } else {
            debug!(server_id = %connection.id(), event = ?event, "Event produced no line");
        }

        if let Some(client) = rendered.moderate {
            self.moderate(connection, session, &client).await;
        }
    }

    async fn moderate(
        &self,
        connection: &Connection,
        session: &Arc<dyn AdminSession>,
        client: &ClientInfo,
    ) {
        info!(
            server_id = %connection.id(),
            client_id = %client.id,
            name = %client.name,
            "Moving player to spectators"
        );
        self.metrics.moderation_action();

        let command = format!("move {} {}", client.id, CompanyId::SPECTATOR);
        if let Err(e) = session.send(AdminPacket::rcon(command)).await {
            warn!(server_id = %connection.id(), error = %e, "Failed to move player");
        }
        if let Err(e) = session
            .send(AdminPacket::private_chat(client.id, RENAME_NOTICE))
            .await
        {
            warn!(server_id = %connection.id(), error = %e, "Failed to notify player");
        }
        let echo = format!("[private] -> {}: {}", client.name, RENAME_NOTICE);
        self.chat
            .send_message(connection.channel().as_str(), &echo)
            .await;
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter").finish_non_exhaustive()
    }
}
