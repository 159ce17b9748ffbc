//! A [`Messenger`] that records deliveries and serves a scripted roster.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ChannelId, EconomyError, ServerId, UserId};
use crate::port::{Messenger, RichMessage};

/// One recorded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Text {
        server: ServerId,
        channel: ChannelId,
        text: String,
    },
    Rich {
        server: ServerId,
        channel: ChannelId,
        message: RichMessage,
    },
}

impl Delivery {
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        match self {
            Self::Text { channel, .. } | Self::Rich { channel, .. } => *channel,
        }
    }

    /// Text of the delivery; rich messages are flattened line by line.
    #[must_use]
    pub fn flatten(&self) -> String {
        match self {
            Self::Text { text, .. } => text.clone(),
            Self::Rich { message, .. } => {
                let mut lines = vec![message.title.clone()];
                lines.extend(message.description.clone());
                lines.extend(
                    message
                        .fields
                        .iter()
                        .map(|field| format!("{}: {}", field.name, field.value)),
                );
                lines.extend(message.footer.clone());
                lines.join("\n")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Member {
    display_name: String,
    account_name: String,
}

#[derive(Default)]
struct Roster {
    members: BTreeMap<(ServerId, UserId), Member>,
    privileged: BTreeSet<(ServerId, UserId)>,
    channels: BTreeMap<ChannelId, String>,
}

/// Thread-safe delivery collector with a mutable roster.
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    roster: Arc<Mutex<Roster>>,
    unavailable: Arc<AtomicBool>,
}

impl RecordingMessenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, server: ServerId, user: UserId, display_name: &str, account_name: &str) {
        self.roster.lock().members.insert(
            (server, user),
            Member {
                display_name: display_name.to_string(),
                account_name: account_name.to_string(),
            },
        );
    }

    pub fn remove_member(&self, server: ServerId, user: UserId) {
        let mut roster = self.roster.lock();
        roster.members.remove(&(server, user));
        roster.privileged.remove(&(server, user));
    }

    pub fn grant_privileged(&self, server: ServerId, user: UserId) {
        self.roster.lock().privileged.insert((server, user));
    }

    pub fn add_channel(&self, channel: ChannelId, name: &str) {
        self.roster.lock().channels.insert(channel, name.to_string());
    }

    /// Make every call fail with `CollaboratorUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deliveries.lock().is_empty()
    }

    /// Flattened text of the most recent delivery.
    #[must_use]
    pub fn last_text(&self) -> Option<String> {
        self.deliveries.lock().last().map(Delivery::flatten)
    }

    /// Remove and return everything delivered so far.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.deliveries.lock())
    }

    fn check(&self) -> Result<(), EconomyError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EconomyError::CollaboratorUnavailable(
                "recording messenger is offline".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver(
        &self,
        server: ServerId,
        channel: ChannelId,
        text: &str,
    ) -> Result<(), EconomyError> {
        self.check()?;
        self.deliveries.lock().push(Delivery::Text {
            server,
            channel,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn deliver_rich(
        &self,
        server: ServerId,
        channel: ChannelId,
        message: &RichMessage,
    ) -> Result<(), EconomyError> {
        self.check()?;
        self.deliveries.lock().push(Delivery::Rich {
            server,
            channel,
            message: message.clone(),
        });
        Ok(())
    }

    async fn resolve_display_name(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<Option<String>, EconomyError> {
        self.check()?;
        Ok(self
            .roster
            .lock()
            .members
            .get(&(server, user))
            .map(|m| m.display_name.clone()))
    }

    async fn resolve_user_id_by_name(
        &self,
        server: ServerId,
        name: &str,
    ) -> Result<Option<UserId>, EconomyError> {
        self.check()?;
        Ok(self
            .roster
            .lock()
            .members
            .iter()
            .find(|((s, _), m)| {
                *s == server
                    && (m.display_name.eq_ignore_ascii_case(name)
                        || m.account_name.eq_ignore_ascii_case(name))
            })
            .map(|((_, user), _)| *user))
    }

    async fn has_privileged_permission(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<bool, EconomyError> {
        self.check()?;
        Ok(self.roster.lock().privileged.contains(&(server, user)))
    }

    async fn list_member_ids(&self, server: ServerId) -> Result<Vec<UserId>, EconomyError> {
        self.check()?;
        Ok(self
            .roster
            .lock()
            .members
            .keys()
            .filter(|(s, _)| *s == server)
            .map(|(_, user)| *user)
            .collect())
    }

    async fn channel_name(
        &self,
        _server: ServerId,
        channel: ChannelId,
    ) -> Result<Option<String>, EconomyError> {
        self.check()?;
        Ok(self.roster.lock().channels.get(&channel).cloned())
    }
}
