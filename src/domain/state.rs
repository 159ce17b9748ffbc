//! Whole-domain documents partitioned by server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{ServerId, UserId};
use super::prediction::ServerPredictions;
use super::settings::ServerSettings;
use super::shop::ServerShop;
use super::user::User;

/// Users of one server.
pub type ServerUsers = BTreeMap<UserId, User>;

/// A domain's per-server structures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partitioned<T>(BTreeMap<ServerId, T>);

impl<T> Default for Partitioned<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<T> Partitioned<T> {
    #[must_use]
    pub fn get(&self, server: ServerId) -> Option<&T> {
        self.0.get(&server)
    }

    pub fn get_mut(&mut self, server: ServerId) -> Option<&mut T> {
        self.0.get_mut(&server)
    }

    #[must_use]
    pub fn contains(&self, server: ServerId) -> bool {
        self.0.contains_key(&server)
    }

    pub fn servers(&self) -> impl Iterator<Item = (ServerId, &T)> {
        self.0.iter().map(|(id, value)| (*id, value))
    }
}

impl<T: Default> Partitioned<T> {
    /// The server's partition, created empty if missing.
    pub fn server_mut(&mut self, server: ServerId) -> &mut T {
        self.0.entry(server).or_default()
    }

    /// Create the server's partition. Returns whether it was missing.
    pub fn ensure(&mut self, server: ServerId) -> bool {
        if self.0.contains_key(&server) {
            return false;
        }
        self.0.insert(server, T::default());
        true
    }
}

pub type SettingsDoc = Partitioned<ServerSettings>;
pub type UsersDoc = Partitioned<ServerUsers>;
pub type ShopDoc = Partitioned<ServerShop>;
pub type PredictionsDoc = Partitioned<ServerPredictions>;
