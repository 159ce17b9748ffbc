//! Application wiring for the console front end.
//!
//! Standard input plays the chat platform: every line is a message in the
//! configured console channel. A line starting with `@name ` is spoken by
//! that configured member, any other line by the default speaker.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::executor::{ChatHandle, Executor, InboundMessage};
use crate::adapter::messenger::ConsoleMessenger;
use crate::adapter::store::{JsonFileStore, MemoryStore};
use crate::config::{Config, ConsoleConfig, ConsoleMember, StorageBackend};
use crate::domain::{ChannelId, ServerId, UserId};
use crate::error::{ConfigError, Result};
use crate::port::{Messenger, Store};

/// Main application entry point.
pub struct App;

impl App {
    /// Run until standard input closes.
    ///
    /// `speaker` names the member who says unaddressed lines; the first
    /// configured member is used otherwise.
    pub async fn run(config: Config, speaker: Option<String>) -> Result<()> {
        let messenger: Arc<dyn Messenger> = Arc::new(ConsoleMessenger::new(&config.console));
        match config.storage.backend {
            StorageBackend::Json => {
                info!(dir = %config.storage.data_dir.display(), "Using JSON file store");
                let store = Arc::new(JsonFileStore::new(config.storage.data_dir.clone()));
                Self::serve(store, messenger, &config, speaker.as_deref()).await
            }
            StorageBackend::Memory => {
                warn!("Using in-memory store, nothing will be persisted");
                Self::serve(Arc::new(MemoryStore::new()), messenger, &config, speaker.as_deref())
                    .await
            }
        }
    }

    async fn serve<S: Store>(
        store: Arc<S>,
        messenger: Arc<dyn Messenger>,
        config: &Config,
        speaker: Option<&str>,
    ) -> Result<()> {
        let default_speaker = default_speaker(&config.console, speaker)?.clone();
        let (executor, handle) = Executor::new(store, messenger, config);

        let restored = executor.restore_timers().await?;
        info!(restored, "Auctions rescheduled");
        let timers = executor.timers().clone();
        let worker = tokio::spawn(executor.run());

        info!(
            speaker = %default_speaker.display_name,
            prefix = %config.commands.prefix,
            "Console ready"
        );
        let result = read_console(&handle, &config.console, &default_speaker).await;

        timers.shutdown();
        worker.abort();
        info!("Console closed");
        result
    }
}

fn default_speaker<'a>(console: &'a ConsoleConfig, speaker: Option<&str>) -> Result<&'a ConsoleMember> {
    let found = match speaker {
        Some(name) => find_member(console, name),
        None => console.members.first(),
    };
    found.ok_or_else(|| {
        ConfigError::InvalidValue {
            field: "console.members",
            reason: match speaker {
                Some(name) => format!("no member named {name}"),
                None => "at least one member is required".to_string(),
            },
        }
        .into()
    })
}

fn find_member<'a>(console: &'a ConsoleConfig, name: &str) -> Option<&'a ConsoleMember> {
    console.members.iter().find(|member| {
        member.display_name.eq_ignore_ascii_case(name)
            || member.account_name.eq_ignore_ascii_case(name)
    })
}

/// Split a console line into its speaker and text.
fn attribute<'a>(
    console: &'a ConsoleConfig,
    fallback: &'a ConsoleMember,
    line: &'a str,
) -> (&'a ConsoleMember, &'a str) {
    if let Some(rest) = line.strip_prefix('@') {
        let (name, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if let Some(member) = find_member(console, name) {
            return (member, text.trim_start());
        }
    }
    (fallback, line)
}

async fn read_console(
    handle: &ChatHandle,
    console: &ConsoleConfig,
    speaker: &ConsoleMember,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (member, text) = attribute(console, speaker, line);
        handle
            .submit(InboundMessage {
                server: ServerId::new(console.server_id),
                channel: ChannelId::new(console.channel_id),
                author: UserId::new(member.id),
                display_name: member.display_name.clone(),
                account_name: member.account_name.clone(),
                text: text.to_string(),
            })
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console() -> ConsoleConfig {
        ConsoleConfig {
            members: vec![
                ConsoleMember {
                    id: 1,
                    display_name: "Mod".into(),
                    account_name: "moderator".into(),
                    privileged: true,
                },
                ConsoleMember {
                    id: 2,
                    display_name: "Ada".into(),
                    account_name: "ada".into(),
                    privileged: false,
                },
            ],
            ..ConsoleConfig::default()
        }
    }

    #[test]
    fn addressed_lines_switch_speaker() {
        let console = console();
        let fallback = &console.members[0];

        let (member, text) = attribute(&console, fallback, "@ada !wallet");
        assert_eq!(member.id, 2);
        assert_eq!(text, "!wallet");

        let (member, text) = attribute(&console, fallback, "@nobody !wallet");
        assert_eq!(member.id, 1);
        assert_eq!(text, "@nobody !wallet");
    }

    #[test]
    fn default_speaker_is_first_member_or_named() {
        let console = console();
        assert_eq!(default_speaker(&console, None).unwrap().id, 1);
        assert_eq!(default_speaker(&console, Some("ADA")).unwrap().id, 2);
        assert!(default_speaker(&console, Some("zed")).is_err());
        assert!(default_speaker(&ConsoleConfig { members: vec![], ..console }, None).is_err());
    }
}
