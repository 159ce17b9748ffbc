#![allow(dead_code)]

use std::sync::Arc;

use bazaar::adapter::store::MemoryStore;
use bazaar::app::{Executor, InboundMessage, Job};
use bazaar::config::Config;
use bazaar::domain::{
    ChannelId, Coins, PredictionsDoc, ServerId, ServerPredictions, ServerSettings, ServerShop,
    SettingsDoc, ShopDoc, User, UserId, UsersDoc,
};
use bazaar::port::Store;
use bazaar::testkit::{Delivery, RecordingMessenger};

pub const SERVER: ServerId = ServerId::new(1);
pub const GENERAL: ChannelId = ChannelId::new(10);
pub const MARKET: ChannelId = ChannelId::new(20);

pub const MODERATOR: UserId = UserId::new(1);
pub const ALICE: UserId = UserId::new(2);
pub const BOB: UserId = UserId::new(3);

const MEMBERS: &[(UserId, &str, &str)] = &[
    (MODERATOR, "Moderator", "mod"),
    (ALICE, "Alice", "alice"),
    (BOB, "Bob", "bob"),
];

/// One server driven through the executor, with an in-memory store and a
/// recording messenger.
pub struct World {
    pub executor: Executor<MemoryStore>,
    pub store: Arc<MemoryStore>,
    pub messenger: RecordingMessenger,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let messenger = RecordingMessenger::new();
        for (id, display, account) in MEMBERS {
            messenger.add_member(SERVER, *id, display, account);
        }
        messenger.grant_privileged(SERVER, MODERATOR);
        messenger.add_channel(GENERAL, "general");
        messenger.add_channel(MARKET, "market");

        let (executor, _handle) =
            Executor::new(Arc::clone(&store), Arc::new(messenger.clone()), config);
        Self {
            executor,
            store,
            messenger,
        }
    }

    /// Send `text` as `user` in the general channel and return what was
    /// delivered while it ran.
    pub async fn say(&self, user: UserId, text: &str) -> Vec<Delivery> {
        self.say_in(GENERAL, user, text).await
    }

    pub async fn say_in(&self, channel: ChannelId, user: UserId, text: &str) -> Vec<Delivery> {
        self.messenger.take();
        self.executor
            .process(Job::Command(message(channel, user, text)))
            .await;
        self.messenger.take()
    }

    /// Like [`World::say`], flattened to text.
    pub async fn reply(&self, user: UserId, text: &str) -> String {
        self.say(user, text)
            .await
            .iter()
            .map(Delivery::flatten)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn users(&self) -> UsersDoc {
        self.store.load().await.expect("load users")
    }

    pub async fn user(&self, id: UserId) -> User {
        self.users()
            .await
            .get(SERVER)
            .and_then(|users| users.get(&id))
            .cloned()
            .expect("user exists")
    }

    pub async fn wallet(&self, id: UserId) -> Coins {
        self.user(id).await.wallet()
    }

    pub async fn shop(&self) -> ServerShop {
        let doc: ShopDoc = self.store.load().await.expect("load shop");
        doc.get(SERVER).cloned().unwrap_or_default()
    }

    pub async fn predictions(&self) -> ServerPredictions {
        let doc: PredictionsDoc = self.store.load().await.expect("load predictions");
        doc.get(SERVER).cloned().unwrap_or_default()
    }

    pub async fn settings(&self) -> ServerSettings {
        let doc: SettingsDoc = self.store.load().await.expect("load settings");
        doc.get(SERVER).cloned().unwrap_or_default()
    }

    /// Make every member known to the economy.
    pub async fn register_all(&self) {
        for (id, _, _) in MEMBERS {
            self.say(*id, "!wallet").await;
        }
    }
}

pub fn message(channel: ChannelId, user: UserId, text: &str) -> InboundMessage {
    let (display, account) = MEMBERS
        .iter()
        .find(|(id, _, _)| *id == user)
        .map_or(("Stranger", "stranger"), |(_, d, a)| (*d, *a));
    InboundMessage {
        server: SERVER,
        channel,
        author: user,
        display_name: display.to_string(),
        account_name: account.to_string(),
        text: text.to_string(),
    }
}
