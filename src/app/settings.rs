//! Per-server settings: partitions, commerce channel and command toggles.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    ChannelId, CommandAccess, EconomyError, Partitioned, ServerId, ServerPredictions,
    ServerSettings, ServerShop, ServerUsers, SettingsDoc, ToggleOutcome,
};
use crate::error::Result;
use crate::port::{Document, Messenger, Store};

/// Outcome of a `toggle_command` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleReport {
    pub updated: Vec<(String, bool)>,
    pub failed: Vec<ToggleOutcome>,
}

/// Commands a caller may run, by set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpListing {
    pub user: Vec<String>,
    /// Present only for privileged callers.
    pub privileged: Option<Vec<String>>,
}

pub struct SettingsService<S> {
    store: Arc<S>,
    messenger: Arc<dyn Messenger>,
}

impl<S: Store> SettingsService<S> {
    pub fn new(store: Arc<S>, messenger: Arc<dyn Messenger>) -> Self {
        Self { store, messenger }
    }

    async fn ensure_partition<T>(&self, server: ServerId) -> Result<bool>
    where
        T: Default + Send + Sync,
        Partitioned<T>: Document,
    {
        let mut doc: Partitioned<T> = self.store.load().await?;
        if !doc.ensure(server) {
            return Ok(false);
        }
        self.store.save(&doc).await?;
        Ok(true)
    }

    /// Create the server's partition in every domain that lacks one.
    pub async fn ensure_server(&self, server: ServerId) -> Result<()> {
        let created = [
            self.ensure_partition::<ServerSettings>(server).await?,
            self.ensure_partition::<ServerUsers>(server).await?,
            self.ensure_partition::<ServerShop>(server).await?,
            self.ensure_partition::<ServerPredictions>(server).await?,
        ];
        if created.iter().any(|c| *c) {
            info!(server = %server, "Server partitions created");
        }
        Ok(())
    }

    /// Current settings, defaults if the server was never seen.
    pub async fn settings(&self, server: ServerId) -> Result<ServerSettings> {
        let doc: SettingsDoc = self.store.load().await?;
        Ok(doc.get(server).cloned().unwrap_or_default())
    }

    /// Make `requested`, or the current channel, the commerce channel.
    ///
    /// Returns the chosen channel and its name.
    pub async fn set_default_channel(
        &self,
        server: ServerId,
        requested: Option<ChannelId>,
        current: ChannelId,
    ) -> Result<(ChannelId, String)> {
        let channel = requested.unwrap_or(current);
        let name = match self.messenger.channel_name(server, channel).await? {
            Some(name) => name,
            None if requested.is_some() => {
                return Err(EconomyError::not_found(format!("Channel {channel}")).into())
            }
            None => channel.to_string(),
        };

        let mut doc: SettingsDoc = self.store.load().await?;
        doc.server_mut(server).default_channel = Some(channel);
        self.store.save(&doc).await?;
        info!(server = %server, channel = %channel, "Default channel set");
        Ok((channel, name))
    }

    /// Apply each `(command, value)` pair on its own.
    pub async fn toggle(
        &self,
        server: ServerId,
        prefix: &str,
        toggles: &[(String, String)],
    ) -> Result<ToggleReport> {
        let mut doc: SettingsDoc = self.store.load().await?;
        let settings = doc.server_mut(server);

        let mut report = ToggleReport::default();
        for (command, value) in toggles {
            match settings.toggle(prefix, command, value) {
                ToggleOutcome::Updated { command, enabled } => {
                    report.updated.push((command, enabled));
                }
                failed => {
                    debug!(server = %server, outcome = ?failed, "Toggle rejected");
                    report.failed.push(failed);
                }
            }
        }

        if !report.updated.is_empty() {
            self.store.save(&doc).await?;
            info!(server = %server, updated = report.updated.len(), "Commands toggled");
        }
        Ok(report)
    }

    /// Enabled commands, including the privileged set for privileged callers.
    pub async fn help(&self, server: ServerId, privileged: bool) -> Result<HelpListing> {
        let settings = self.settings(server).await?;
        let owned = |access| {
            settings
                .enabled(access)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        Ok(HelpListing {
            user: owned(CommandAccess::User),
            privileged: privileged.then(|| owned(CommandAccess::Privileged)),
        })
    }
}
