//! Ledger service: wallets, inventories and user administration.
//!
//! Every mutation is one load of the Users document, a rule-checked
//! change, and one save. A rejected change saves nothing.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    Coins, EconomyError, EconomyRules, Inventory, ServerId, ServerUsers, User, UserId, UsersDoc,
};
use crate::error::Result;
use crate::port::{Messenger, Store};

/// A completed reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewarded {
    pub user: UserId,
    pub name: String,
    pub amount: Coins,
    pub wallet: Coins,
}

pub struct Ledger<S> {
    store: Arc<S>,
    messenger: Arc<dyn Messenger>,
    rules: EconomyRules,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: Arc<S>, messenger: Arc<dyn Messenger>, rules: EconomyRules) -> Self {
        Self {
            store,
            messenger,
            rules,
        }
    }

    /// Load the users of `server`, apply `change`, save.
    async fn update<T>(
        &self,
        server: ServerId,
        change: impl FnOnce(&mut ServerUsers) -> std::result::Result<T, EconomyError> + Send,
    ) -> Result<T> {
        let mut doc: UsersDoc = self.store.load().await?;
        let value = change(doc.server_mut(server))?;
        self.store.save(&doc).await?;
        Ok(value)
    }

    async fn read<T>(&self, server: ServerId, view: impl FnOnce(&ServerUsers) -> T + Send) -> Result<T> {
        let doc: UsersDoc = self.store.load().await?;
        let empty = ServerUsers::new();
        Ok(view(doc.get(server).unwrap_or(&empty)))
    }

    /// Create the user on first sight, or refresh a changed display name.
    ///
    /// Returns whether the user was created.
    pub async fn ensure_user(
        &self,
        server: ServerId,
        user: UserId,
        display_name: &str,
        account_name: &str,
    ) -> Result<bool> {
        let mut doc: UsersDoc = self.store.load().await?;
        let users = doc.server_mut(server);
        let created = match users.get_mut(&user) {
            Some(existing) if existing.display_name == display_name => return Ok(false),
            Some(existing) => {
                debug!(server = %server, user = %user, name = display_name, "Display name changed");
                existing.display_name = display_name.to_string();
                false
            }
            None => {
                users.insert(
                    user,
                    User::new(display_name, account_name, self.rules.starting_wallet),
                );
                info!(server = %server, user = %user, name = display_name, "User registered");
                true
            }
        };
        self.store.save(&doc).await?;
        Ok(created)
    }

    /// Take coins from a wallet. Returns the new balance.
    pub async fn debit(&self, server: ServerId, user: UserId, amount: Coins) -> Result<Coins> {
        self.update(server, |users| {
            let account = users.get_mut(&user).ok_or_else(|| user_not_found(user))?;
            account.debit(amount)?;
            Ok(account.wallet())
        })
        .await
    }

    /// Add coins to a wallet. Returns the new balance.
    pub async fn credit(&self, server: ServerId, user: UserId, amount: Coins) -> Result<Coins> {
        self.update(server, |users| {
            let account = users.get_mut(&user).ok_or_else(|| user_not_found(user))?;
            account.credit(amount);
            Ok(account.wallet())
        })
        .await
    }

    /// Move coins between two users in a single save.
    pub async fn transfer(
        &self,
        server: ServerId,
        from: UserId,
        to: UserId,
        amount: Coins,
    ) -> Result<()> {
        self.update(server, |users| {
            if !users.contains_key(&to) {
                return Err(user_not_found(to));
            }
            users
                .get_mut(&from)
                .ok_or_else(|| user_not_found(from))?
                .debit(amount)?;
            if let Some(recipient) = users.get_mut(&to) {
                recipient.credit(amount);
            }
            Ok(())
        })
        .await
    }

    pub async fn wallet(&self, server: ServerId, user: UserId) -> Result<Coins> {
        self.read(server, |users| users.get(&user).map(User::wallet))
            .await?
            .ok_or_else(|| user_not_found(user).into())
    }

    pub async fn inventory(&self, server: ServerId, user: UserId) -> Result<Inventory> {
        self.read(server, |users| users.get(&user).map(|u| u.inventory.clone()))
            .await?
            .ok_or_else(|| user_not_found(user).into())
    }

    /// Credit a user picked by id, or by a name the chat platform knows.
    pub async fn reward(&self, server: ServerId, target: &str, amount: Coins) -> Result<Rewarded> {
        if amount <= 0 {
            return Err(EconomyError::validation("The reward needs to be a positive amount.").into());
        }

        let known_id = self
            .read(server, |users| {
                target
                    .trim()
                    .parse::<UserId>()
                    .ok()
                    .filter(|id| users.contains_key(id))
            })
            .await?;
        let user = match known_id {
            Some(id) => id,
            None => self
                .messenger
                .resolve_user_id_by_name(server, target.trim())
                .await?
                .ok_or_else(|| EconomyError::not_found(format!("User {target}")))?,
        };

        let rewarded = self
            .update(server, |users| {
                let account = users
                    .get_mut(&user)
                    .ok_or_else(|| EconomyError::not_found(format!("User {target}")))?;
                account.credit(amount);
                Ok(Rewarded {
                    user,
                    name: account.display_name.clone(),
                    amount,
                    wallet: account.wallet(),
                })
            })
            .await?;
        info!(server = %server, user = %user, amount, "User rewarded");
        Ok(rewarded)
    }

    /// Replace a user with a fresh record, keeping their names.
    ///
    /// Positions on open predictions are left in place.
    pub async fn reset_user(&self, server: ServerId, target: &str) -> Result<String> {
        let starting_wallet = self.rules.starting_wallet;
        let name = self
            .update(server, |users| {
                let id = find_target(users, target)
                    .ok_or_else(|| EconomyError::not_found(format!("User {target}")))?;
                let old = users
                    .remove(&id)
                    .ok_or_else(|| EconomyError::not_found(format!("User {target}")))?;
                let name = old.display_name.clone();
                users.insert(
                    id,
                    User::new(old.display_name, old.account_name, starting_wallet),
                );
                Ok(name)
            })
            .await?;
        info!(server = %server, user = %name, "User reset");
        Ok(name)
    }

    /// Empty a user's inventory.
    pub async fn reset_inventory(&self, server: ServerId, target: &str) -> Result<String> {
        let name = self
            .update(server, |users| {
                let id = find_target(users, target)
                    .ok_or_else(|| EconomyError::not_found(format!("User {target}")))?;
                let user = users
                    .get_mut(&id)
                    .ok_or_else(|| EconomyError::not_found(format!("User {target}")))?;
                user.inventory.clear();
                Ok(user.display_name.clone())
            })
            .await?;
        info!(server = %server, user = %name, "Inventory reset");
        Ok(name)
    }

    /// Drop every stored user who has left the server.
    pub async fn purge_deprecated(&self, server: ServerId) -> Result<usize> {
        let members = self.messenger.list_member_ids(server).await?;
        let removed = self
            .update(server, |users| {
                let before = users.len();
                users.retain(|id, _| members.contains(id));
                Ok(before - users.len())
            })
            .await?;
        info!(server = %server, removed, "Purged departed users");
        Ok(removed)
    }
}

fn user_not_found(user: UserId) -> EconomyError {
    EconomyError::not_found(format!("User {user}"))
}

/// Find a stored user by numeric id or case-insensitive name.
pub(crate) fn find_target(users: &ServerUsers, target: &str) -> Option<UserId> {
    let target = target.trim();
    if let Ok(id) = target.parse::<UserId>() {
        if users.contains_key(&id) {
            return Some(id);
        }
    }
    users
        .iter()
        .find(|(_, user)| user.answers_to(target))
        .map(|(id, _)| *id)
}
