//! The single command executor.
//!
//! Chat messages and auction deadlines both arrive as [`Job`]s on one
//! bounded queue. The executor drains it one job at a time and is the
//! only task that touches the store, so operations never interleave.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::auction::{AuctionService, Terms};
use super::command::{split_command, Command};
use super::ledger::Ledger;
use super::market::Market;
use super::render;
use super::settings::SettingsService;
use super::shop::ShopService;
use super::timer::AuctionTimers;
use crate::config::Config;
use crate::domain::{AuctionId, ChannelId, CommandAccess, EconomyError, ServerId, UserId};
use crate::error::{Error, Result};
use crate::port::{Messenger, Reply, Store};

/// A chat message as the platform delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub server: ServerId,
    pub channel: ChannelId,
    pub author: UserId,
    pub display_name: String,
    pub account_name: String,
    pub text: String,
}

/// Unit of work for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Command(InboundMessage),
    ResolveAuction { server: ServerId, auction: AuctionId },
}

/// Submission side of the job queue, handed to the chat platform.
#[derive(Clone)]
pub struct ChatHandle {
    jobs: mpsc::Sender<Job>,
}

impl ChatHandle {
    /// Queue a message. Waits while the queue is full.
    pub async fn submit(&self, message: InboundMessage) -> Result<()> {
        self.jobs
            .send(Job::Command(message))
            .await
            .map_err(|_| Error::QueueClosed)
    }
}

pub struct Executor<S> {
    jobs: mpsc::Receiver<Job>,
    settings: SettingsService<S>,
    ledger: Ledger<S>,
    market: Market<S>,
    shop: ShopService<S>,
    auctions: AuctionService<S>,
    messenger: Arc<dyn Messenger>,
    prefix: String,
}

impl<S: Store> Executor<S> {
    /// Wire every service onto one store and one queue.
    pub fn new(store: Arc<S>, messenger: Arc<dyn Messenger>, config: &Config) -> (Self, ChatHandle) {
        let (tx, rx) = mpsc::channel(config.commands.queue_capacity);
        let rules = config.rules();
        let timers = AuctionTimers::new(tx.clone());

        let executor = Self {
            jobs: rx,
            settings: SettingsService::new(Arc::clone(&store), Arc::clone(&messenger)),
            ledger: Ledger::new(Arc::clone(&store), Arc::clone(&messenger), rules.clone()),
            market: Market::new(Arc::clone(&store), rules.clone()),
            shop: ShopService::new(Arc::clone(&store), rules.clone()),
            auctions: AuctionService::new(store, Arc::clone(&messenger), timers, rules),
            messenger,
            prefix: config.commands.prefix.clone(),
        };
        (executor, ChatHandle { jobs: tx })
    }

    #[must_use]
    pub fn timers(&self) -> &AuctionTimers {
        self.auctions.timers()
    }

    /// Schedule every persisted auction. Call once before [`Self::run`].
    pub async fn restore_timers(&self) -> Result<usize> {
        self.auctions.restore_timers().await
    }

    /// Process jobs until every sender is gone.
    pub async fn run(mut self) {
        info!("Executor started");
        while let Some(job) = self.jobs.recv().await {
            self.process(job).await;
        }
        info!("Executor stopped");
    }

    /// Wait for the next queued job.
    pub async fn next_job(&mut self) -> Option<Job> {
        self.jobs.recv().await
    }

    /// Run one job to completion. Failures are reported, never returned.
    pub async fn process(&self, job: Job) {
        match job {
            Job::Command(message) => match self.handle(&message).await {
                Ok(Some(reply)) => {
                    if let Err(e) = self
                        .messenger
                        .reply(message.server, message.channel, &reply)
                        .await
                    {
                        error!(server = %message.server, channel = %message.channel, error = %e, "Reply not delivered");
                    }
                }
                Ok(None) => {}
                Err(e) => self.report_failure(&message, e).await,
            },
            Job::ResolveAuction { server, auction } => {
                if let Err(e) = self.auctions.resolve(server, auction).await {
                    error!(server = %server, auction = %auction, error = %e, "Auction resolution failed");
                }
            }
        }
    }

    /// Returns `None` for messages that are not commands, or that the
    /// caller may not run.
    async fn handle(&self, message: &InboundMessage) -> Result<Option<Reply>> {
        let server = message.server;
        self.settings.ensure_server(server).await?;

        let Some((name, args)) = split_command(&self.prefix, &message.text) else {
            return Ok(None);
        };
        self.ledger
            .ensure_user(
                server,
                message.author,
                &message.display_name,
                &message.account_name,
            )
            .await?;

        if !matches!(name.as_str(), "help" | "commands") {
            let settings = self.settings.settings(server).await?;
            match settings.access(&name) {
                None => {
                    debug!(server = %server, command = %name, "Unknown or disabled command ignored");
                    return Ok(None);
                }
                Some(CommandAccess::User) => {}
                Some(CommandAccess::Privileged) => {
                    if !self
                        .messenger
                        .has_privileged_permission(server, message.author)
                        .await?
                    {
                        debug!(server = %server, user = %message.author, command = %name, "Unauthorized command ignored");
                        return Ok(None);
                    }
                }
            }
        }

        let command =
            Command::parse(&name, args).map_err(|e| e.into_economy(&self.prefix))?;
        debug!(server = %server, user = %message.author, command = command.name(), "Dispatching");
        self.dispatch(message, command).await.map(Some)
    }

    async fn dispatch(&self, message: &InboundMessage, command: Command) -> Result<Reply> {
        let server = message.server;
        let author = message.author;
        let prefix = self.prefix.as_str();

        let reply = match command {
            Command::Help => {
                let privileged = match self
                    .messenger
                    .has_privileged_permission(server, author)
                    .await
                {
                    Ok(privileged) => privileged,
                    Err(e) => {
                        warn!(server = %server, error = %e, "Permission check failed, listing user commands only");
                        false
                    }
                };
                render::help(&self.settings.help(server, privileged).await?, prefix)
            }
            Command::Wallet => render::wallet(self.ledger.wallet(server, author).await?),
            Command::Shop => render::shop(&self.shop.list_active(server).await?, prefix),
            Command::Predictions => render::predictions(&self.market.list(server).await?),
            Command::Auctions => {
                render::auctions(&self.auctions.list(server, Utc::now()).await?)
            }
            Command::Inventory => render::inventory(
                &message.display_name,
                &self.ledger.inventory(server, author).await?,
            ),
            Command::MyBets => render::positions(&self.market.positions(server, author).await?),
            Command::Bet {
                prediction,
                amount,
                option,
            } => render::bet(
                &self
                    .market
                    .place_bet(server, author, &prediction, &option, amount)
                    .await?,
            ),
            Command::Buy { item, quantity } => {
                render::purchase(&self.shop.buy(server, author, &item, quantity).await?)
            }
            Command::Sell { item, quantity } => {
                render::sale(&self.shop.sell(server, author, &item, quantity).await?)
            }
            Command::AuctionItem {
                item,
                quantity,
                starting_bid,
                minutes,
            } => {
                let terms = Terms {
                    quantity,
                    starting_bid,
                    minutes,
                };
                let (id, auction) = self
                    .auctions
                    .create_from_inventory(server, author, &item, terms, Utc::now())
                    .await?;
                render::auction_opened(id, &auction, minutes, prefix)
            }
            Command::CreateAuction {
                item,
                quantity,
                starting_bid,
                minutes,
            } => {
                let terms = Terms {
                    quantity,
                    starting_bid,
                    minutes,
                };
                let (id, auction) = self
                    .auctions
                    .create_moderated(server, &item, terms, Utc::now())
                    .await?;
                render::auction_opened(id, &auction, minutes, prefix)
            }
            Command::Bid { auction, amount } => {
                let snapshot = self
                    .auctions
                    .bid(server, author, auction, amount, Utc::now())
                    .await?;
                render::bid_accepted(auction, &snapshot)
            }
            Command::Reward { amount, target } => {
                render::reward(&self.ledger.reward(server, &target, amount).await?)
            }
            Command::CreatePrediction {
                title,
                declared,
                options,
            } => {
                let id = self.market.create(server, &title, declared, options).await?;
                render::prediction_created(id, title.trim())
            }
            Command::ClosePrediction { prediction } => {
                render::closed(&self.market.close(server, &prediction).await?)
            }
            Command::ResolvePrediction { prediction, option } => {
                render::payout(&self.market.resolve(server, &prediction, &option).await?)
            }
            Command::CreateShopItem {
                name,
                price,
                quantity,
                refresh_days,
            } => {
                self.shop
                    .create_item(server, &name, price, quantity, refresh_days)
                    .await?;
                render::item_created(name.trim())
            }
            Command::DeleteShopItem { name } => {
                render::item_deleted(&self.shop.delete_item(server, &name).await?)
            }
            Command::EditShopItem { name, edits } => {
                let report = self.shop.edit_item(server, &name, &edits).await?;
                render::item_edited(name.trim(), &report)
            }
            Command::ResetUserInventory { target } => {
                render::inventory_reset(&self.ledger.reset_inventory(server, &target).await?)
            }
            Command::ResetUser { target } => {
                render::user_reset(&self.ledger.reset_user(server, &target).await?)
            }
            Command::PurgeDeprecatedUsers => {
                render::purged(self.ledger.purge_deprecated(server).await?)
            }
            Command::SetDefaultChannel { channel } => {
                let (id, name) = self
                    .settings
                    .set_default_channel(server, channel, message.channel)
                    .await?;
                render::default_channel(id, &name)
            }
            Command::ToggleCommand { toggles } => {
                render::toggles(&self.settings.toggle(server, prefix, &toggles).await?)
            }
        };
        Ok(reply)
    }

    async fn report_failure(&self, message: &InboundMessage, failure: Error) {
        let text = match failure.as_economy() {
            Some(e @ EconomyError::CollaboratorUnavailable(_)) => {
                error!(server = %message.server, error = %e, "Chat platform unavailable");
                e.to_string()
            }
            Some(e) => {
                debug!(server = %message.server, user = %message.author, error = %e, "Command rejected");
                e.to_string()
            }
            None => {
                error!(server = %message.server, error = %failure, "Command failed");
                "Something went wrong while running that command. Please try again later."
                    .to_string()
            }
        };
        if let Err(e) = self
            .messenger
            .deliver(message.server, message.channel, &text)
            .await
        {
            warn!(server = %message.server, channel = %message.channel, error = %e, "Failure notice not delivered");
        }
    }
}
