//! Store port for persistence operations.
//!
//! State is kept as four whole-domain documents. Each maps a server id to
//! that server's structure for one domain. Operations load a document,
//! mutate it and save it back as a unit.

use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{PredictionsDoc, SettingsDoc, ShopDoc, UsersDoc};
use crate::error::Result;

/// The persisted domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Settings,
    Users,
    Shop,
    Predictions,
}

impl Domain {
    pub const ALL: [Self; 4] = [Self::Settings, Self::Users, Self::Shop, Self::Predictions];

    /// Stable key of the domain.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Users => "users",
            Self::Shop => "shop",
            Self::Predictions => "predictions",
        }
    }

    /// File name used by file-backed stores.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Settings => "settings.json",
            Self::Users => "users.json",
            Self::Shop => "shop.json",
            Self::Predictions => "predictions.json",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A whole-domain document.
pub trait Document: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    const DOMAIN: Domain;
}

impl Document for SettingsDoc {
    const DOMAIN: Domain = Domain::Settings;
}

impl Document for UsersDoc {
    const DOMAIN: Domain = Domain::Users;
}

impl Document for ShopDoc {
    const DOMAIN: Domain = Domain::Shop;
}

impl Document for PredictionsDoc {
    const DOMAIN: Domain = Domain::Predictions;
}

/// Durable storage of domain documents.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - `load` of a domain that was never saved returns an empty document
/// - `save` replaces the whole document; partial writes must not be visible
pub trait Store: Send + Sync + 'static {
    /// Load a whole domain.
    fn load<D: Document>(&self) -> impl Future<Output = Result<D>> + Send;

    /// Replace a whole domain.
    fn save<D: Document>(&self, document: &D) -> impl Future<Output = Result<()>> + Send;
}
