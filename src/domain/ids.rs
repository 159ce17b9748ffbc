//! Domain identifier types with proper encapsulation.
//!
//! Every identifier is a numeric newtype. Chat-platform ids (servers,
//! users, channels) arrive from the messaging layer; catalog, auction and
//! prediction ids are allocated from per-server counters. All of them
//! serialize transparently, so they become string keys inside JSON maps.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new identifier from a raw value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying value.
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self::new(id)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// A tenant partition: one chat community.
    ServerId
);

numeric_id!(
    /// A chat-platform user.
    UserId
);

numeric_id!(
    /// A chat-platform channel.
    ChannelId
);

numeric_id!(
    /// A shop catalog entry. Also used as the inventory key.
    ItemId
);

numeric_id!(
    /// An auction within one server.
    AuctionId
);

numeric_id!(
    /// A prediction within one server.
    PredictionId
);

impl ItemId {
    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl AuctionId {
    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl PredictionId {
    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Reference to a record by numeric id or by case-insensitive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(u64),
    Name(String),
}

impl Selector {
    /// All-digit input is an id, anything else a name.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse() {
            Ok(id) if raw.bytes().all(|b| b.is_ascii_digit()) => Self::Id(id),
            _ => Self::Name(raw.to_string()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn user_id_parses_from_digits() {
        let id: UserId = " 4242 ".parse().unwrap();
        assert_eq!(id.value(), 4242);
    }

    #[test]
    fn user_id_rejects_names() {
        assert!("alice".parse::<UserId>().is_err());
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(AuctionId::new(7).to_string(), "7");
        assert_eq!(format!("{}", ServerId::new(1)), "1");
    }

    #[test]
    fn ids_become_string_keys_in_json_maps() {
        let mut map = BTreeMap::new();
        map.insert(ItemId::new(3), "hat");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"3":"hat"}"#);

        let back: BTreeMap<ItemId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&ItemId::new(3)).map(String::as_str), Some("hat"));
    }

    #[test]
    fn selector_splits_ids_from_names() {
        assert_eq!(Selector::parse("12"), Selector::Id(12));
        assert_eq!(Selector::parse(" Big Game "), Selector::Name("Big Game".into()));
        assert_eq!(Selector::parse("+12"), Selector::Name("+12".into()));
    }

    #[test]
    fn next_increments() {
        assert_eq!(PredictionId::new(1).next(), PredictionId::new(2));
        assert_eq!(ItemId::new(9).next(), ItemId::new(10));
    }
}
