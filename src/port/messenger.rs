//! Messenger port: the chat platform as seen by the economy.
//!
//! Implementations deliver replies and answer roster questions. Every
//! failure is reported as [`EconomyError::CollaboratorUnavailable`].

use async_trait::async_trait;

use crate::domain::{ChannelId, EconomyError, ServerId, UserId};

/// One labelled block of a rich message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A structured message: title, optional description, labelled fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichMessage {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<Field>,
    pub footer: Option<String>,
}

impl RichMessage {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    #[must_use]
    pub fn inline_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }

    #[must_use]
    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// What a command answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Rich(RichMessage),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl From<RichMessage> for Reply {
    fn from(message: RichMessage) -> Self {
        Self::Rich(message)
    }
}

/// Chat-platform collaborator.
///
/// Calls may be slow; the executor awaits them in line, so an
/// implementation that blocks stalls every server.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post plain text to a channel.
    async fn deliver(
        &self,
        server: ServerId,
        channel: ChannelId,
        text: &str,
    ) -> Result<(), EconomyError>;

    /// Post a structured message to a channel.
    async fn deliver_rich(
        &self,
        server: ServerId,
        channel: ChannelId,
        message: &RichMessage,
    ) -> Result<(), EconomyError>;

    /// Current display name of a member, if they are still present.
    async fn resolve_display_name(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<Option<String>, EconomyError>;

    /// Member whose display or account name matches `name`.
    async fn resolve_user_id_by_name(
        &self,
        server: ServerId,
        name: &str,
    ) -> Result<Option<UserId>, EconomyError>;

    /// Whether the member holds the moderator permission.
    async fn has_privileged_permission(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<bool, EconomyError>;

    /// Ids of everyone currently in the server.
    async fn list_member_ids(&self, server: ServerId) -> Result<Vec<UserId>, EconomyError>;

    /// Name of a channel, or `None` if the platform does not know it.
    async fn channel_name(
        &self,
        server: ServerId,
        channel: ChannelId,
    ) -> Result<Option<String>, EconomyError>;

    /// Deliver a [`Reply`] of either kind.
    async fn reply(
        &self,
        server: ServerId,
        channel: ChannelId,
        reply: &Reply,
    ) -> Result<(), EconomyError> {
        match reply {
            Reply::Text(text) => self.deliver(server, channel, text).await,
            Reply::Rich(message) => self.deliver_rich(server, channel, message).await,
        }
    }
}
