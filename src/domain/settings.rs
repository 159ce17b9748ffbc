//! Per-server settings: the commerce channel and enabled-command sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::ChannelId;

/// Commands any member may run.
pub const USER_COMMANDS: &[&str] = &[
    "bet",
    "shop",
    "wallet",
    "buy",
    "sell",
    "predictions",
    "auction_item",
    "auctions",
    "bid",
    "inventory",
    "my_bets",
];

/// Commands that need the privileged permission.
pub const PRIVILEGED_COMMANDS: &[&str] = &[
    "reward",
    "create_auction",
    "create_prediction",
    "close_prediction",
    "resolve_prediction",
    "create_shop_item",
    "delete_shop_item",
    "edit_shop_item",
    "reset_user_inventory",
    "reset_user",
    "purge_deprecated_users",
    "set_default_channel",
];

/// The command that edits the sets. It is always available to privileged
/// users and can never be switched off.
pub const TOGGLE_COMMAND: &str = "toggle_command";

/// Which set a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAccess {
    User,
    Privileged,
}

/// Result of applying one toggle pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Updated { command: String, enabled: bool },
    InvalidValue { command: String, value: String },
    UnknownCommand { command: String },
}

/// Settings for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub default_channel: Option<ChannelId>,
    #[serde(default)]
    pub user_commands: BTreeMap<String, bool>,
    #[serde(default)]
    pub privileged_commands: BTreeMap<String, bool>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let enable_all =
            |names: &[&str]| names.iter().map(|name| ((*name).to_string(), true)).collect();
        Self {
            default_channel: None,
            user_commands: enable_all(USER_COMMANDS),
            privileged_commands: enable_all(PRIVILEGED_COMMANDS),
        }
    }
}

impl ServerSettings {
    /// Which set a command is enabled in, if any.
    #[must_use]
    pub fn access(&self, command: &str) -> Option<CommandAccess> {
        if command == TOGGLE_COMMAND {
            return Some(CommandAccess::Privileged);
        }
        if self.user_commands.get(command).copied().unwrap_or(false) {
            return Some(CommandAccess::User);
        }
        if self.privileged_commands.get(command).copied().unwrap_or(false) {
            return Some(CommandAccess::Privileged);
        }
        None
    }

    /// Enabled commands of one set, in name order.
    #[must_use]
    pub fn enabled(&self, access: CommandAccess) -> Vec<&str> {
        let set = match access {
            CommandAccess::User => &self.user_commands,
            CommandAccess::Privileged => &self.privileged_commands,
        };
        set.iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Apply one `(command, value)` toggle.
    ///
    /// The command may carry a leading `prefix`; the value must be `true`
    /// or `false` in any case.
    pub fn toggle(&mut self, prefix: &str, command: &str, value: &str) -> ToggleOutcome {
        let name = command.trim();
        let name = name.strip_prefix(prefix).unwrap_or(name).to_lowercase();

        let set = if self.user_commands.contains_key(&name) {
            &mut self.user_commands
        } else if self.privileged_commands.contains_key(&name) {
            &mut self.privileged_commands
        } else {
            return ToggleOutcome::UnknownCommand { command: name };
        };

        let enabled = match value.trim().to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => {
                return ToggleOutcome::InvalidValue {
                    command: name,
                    value: other.to_string(),
                }
            }
        };
        set.insert(name.clone(), enabled);
        ToggleOutcome::Updated {
            command: name,
            enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_server_enables_everything() {
        let settings = ServerSettings::default();
        assert_eq!(settings.access("bet"), Some(CommandAccess::User));
        assert_eq!(settings.access("reward"), Some(CommandAccess::Privileged));
        assert_eq!(settings.access("toggle_command"), Some(CommandAccess::Privileged));
        assert_eq!(settings.access("dance"), None);
        assert_eq!(settings.enabled(CommandAccess::User).len(), USER_COMMANDS.len());
    }

    #[test]
    fn toggle_disables_a_command() {
        let mut settings = ServerSettings::default();
        let outcome = settings.toggle("!", "!Bet", "FALSE");
        assert_eq!(
            outcome,
            ToggleOutcome::Updated {
                command: "bet".into(),
                enabled: false
            }
        );
        assert_eq!(settings.access("bet"), None);
    }

    #[test]
    fn toggle_rejects_bad_values_and_unknown_commands() {
        let mut settings = ServerSettings::default();
        assert!(matches!(
            settings.toggle("!", "shop", "maybe"),
            ToggleOutcome::InvalidValue { .. }
        ));
        assert!(matches!(
            settings.toggle("!", "toggle_command", "false"),
            ToggleOutcome::UnknownCommand { .. }
        ));
        assert_eq!(settings.access("shop"), Some(CommandAccess::User));
    }
}
