//! Console messenger: prints replies to stdout and answers roster
//! questions from the `[console]` config section.

use std::collections::HashMap;

use async_trait::async_trait;
use tabled::{Table, Tabled};

use crate::config::ConsoleConfig;
use crate::domain::{ChannelId, EconomyError, ServerId, UserId};
use crate::port::{Messenger, RichMessage};

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Render a rich message as a title line followed by a table.
#[must_use]
pub fn render_rich(message: &RichMessage) -> String {
    let mut out = format!("== {} ==\n", message.title);
    if let Some(description) = &message.description {
        out.push_str(description);
        out.push('\n');
    }
    if !message.fields.is_empty() {
        let rows: Vec<FieldRow> = message
            .fields
            .iter()
            .map(|field| FieldRow {
                name: field.name.clone(),
                value: field.value.clone(),
            })
            .collect();
        out.push_str(&Table::new(rows).to_string());
        out.push('\n');
    }
    if let Some(footer) = &message.footer {
        out.push_str(footer);
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone)]
struct Member {
    display_name: String,
    account_name: String,
    privileged: bool,
}

/// A single simulated server whose members are listed in configuration.
pub struct ConsoleMessenger {
    server: ServerId,
    members: HashMap<UserId, Member>,
    channels: HashMap<ChannelId, String>,
}

impl ConsoleMessenger {
    #[must_use]
    pub fn new(config: &ConsoleConfig) -> Self {
        let members = config
            .members
            .iter()
            .map(|m| {
                (
                    UserId::new(m.id),
                    Member {
                        display_name: m.display_name.clone(),
                        account_name: m.account_name.clone(),
                        privileged: m.privileged,
                    },
                )
            })
            .collect();

        let mut channels: HashMap<ChannelId, String> = config
            .channels
            .iter()
            .map(|c| (ChannelId::new(c.id), c.name.clone()))
            .collect();
        channels
            .entry(ChannelId::new(config.channel_id))
            .or_insert_with(|| "console".to_string());

        Self {
            server: ServerId::new(config.server_id),
            members,
            channels,
        }
    }

    fn check_server(&self, server: ServerId) -> Result<(), EconomyError> {
        if server == self.server {
            Ok(())
        } else {
            Err(EconomyError::CollaboratorUnavailable(format!(
                "server {server} is not served by the console"
            )))
        }
    }

    fn channel_label(&self, channel: ChannelId) -> String {
        self.channels
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| channel.to_string())
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn deliver(
        &self,
        server: ServerId,
        channel: ChannelId,
        text: &str,
    ) -> Result<(), EconomyError> {
        self.check_server(server)?;
        println!("[#{}] {text}", self.channel_label(channel));
        Ok(())
    }

    async fn deliver_rich(
        &self,
        server: ServerId,
        channel: ChannelId,
        message: &RichMessage,
    ) -> Result<(), EconomyError> {
        self.check_server(server)?;
        println!("[#{}]\n{}", self.channel_label(channel), render_rich(message));
        Ok(())
    }

    async fn resolve_display_name(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<Option<String>, EconomyError> {
        self.check_server(server)?;
        Ok(self.members.get(&user).map(|m| m.display_name.clone()))
    }

    async fn resolve_user_id_by_name(
        &self,
        server: ServerId,
        name: &str,
    ) -> Result<Option<UserId>, EconomyError> {
        self.check_server(server)?;
        Ok(self
            .members
            .iter()
            .find(|(_, m)| {
                m.display_name.eq_ignore_ascii_case(name) || m.account_name.eq_ignore_ascii_case(name)
            })
            .map(|(id, _)| *id))
    }

    async fn has_privileged_permission(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<bool, EconomyError> {
        self.check_server(server)?;
        Ok(self.members.get(&user).is_some_and(|m| m.privileged))
    }

    async fn list_member_ids(&self, server: ServerId) -> Result<Vec<UserId>, EconomyError> {
        self.check_server(server)?;
        Ok(self.members.keys().copied().collect())
    }

    async fn channel_name(
        &self,
        server: ServerId,
        channel: ChannelId,
    ) -> Result<Option<String>, EconomyError> {
        self.check_server(server)?;
        Ok(self.channels.get(&channel).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConsoleChannel, ConsoleMember};

    fn config() -> ConsoleConfig {
        ConsoleConfig {
            server_id: 9,
            channel_id: 1,
            channels: vec![ConsoleChannel {
                id: 2,
                name: "market".into(),
            }],
            members: vec![
                ConsoleMember {
                    id: 10,
                    display_name: "Ada".into(),
                    account_name: "ada_l".into(),
                    privileged: true,
                },
                ConsoleMember {
                    id: 11,
                    display_name: "Bob".into(),
                    account_name: "bobby".into(),
                    privileged: false,
                },
            ],
        }
    }

    #[test]
    fn rich_messages_render_as_tables() {
        let message = RichMessage::new("Shop")
            .description("Items for sale")
            .field("Hat", "$100")
            .footer("Use !buy");
        let text = render_rich(&message);
        assert!(text.starts_with("== Shop =="));
        assert!(text.contains("Items for sale"));
        assert!(text.contains("Hat"));
        assert!(text.contains("$100"));
        assert!(text.trim_end().ends_with("Use !buy"));
    }

    #[tokio::test]
    async fn roster_comes_from_config() {
        let messenger = ConsoleMessenger::new(&config());
        let server = ServerId::new(9);

        assert_eq!(
            messenger.resolve_user_id_by_name(server, "BOBBY").await.unwrap(),
            Some(UserId::new(11))
        );
        assert!(messenger
            .has_privileged_permission(server, UserId::new(10))
            .await
            .unwrap());
        assert!(!messenger
            .has_privileged_permission(server, UserId::new(11))
            .await
            .unwrap());
        assert_eq!(
            messenger.channel_name(server, ChannelId::new(1)).await.unwrap(),
            Some("console".to_string())
        );
        assert_eq!(
            messenger.channel_name(server, ChannelId::new(5)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn other_servers_are_unavailable() {
        let messenger = ConsoleMessenger::new(&config());
        let err = messenger.list_member_ids(ServerId::new(1)).await.unwrap_err();
        assert!(matches!(err, EconomyError::CollaboratorUnavailable(_)));
    }
}
