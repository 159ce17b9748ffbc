//! Reply rendering: service results to chat replies.

use super::auction::{AuctionView, Resolution};
use super::ledger::Rewarded;
use super::market::{BetReceipt, Closed, Position};
use super::settings::{HelpListing, ToggleReport};
use super::shop::{Receipt, Sale};
use crate::domain::{
    Auction, AuctionId, ChannelId, Coins, EditReport, Inventory, ItemId, PayoutReport, Prediction,
    PredictionId, Settlement, ShopItem, StockStatus, ToggleOutcome, UnsoldReason,
};
use crate::port::{Reply, RichMessage};

fn plural(quantity: u64) -> &'static str {
    if quantity == 1 {
        ""
    } else {
        "s"
    }
}

pub fn wallet(balance: Coins) -> Reply {
    Reply::text(format!("Your wallet balance is `${balance}`."))
}

pub fn shop(items: &[(ItemId, ShopItem)], prefix: &str) -> Reply {
    if items.is_empty() {
        return Reply::text("The shop is currently empty.");
    }
    let mut message =
        RichMessage::new("Shop Items").description("Here are the available items in the shop:");
    for (id, item) in items {
        let stock = match item.stock_status() {
            StockStatus::Unlimited => "Unlimited stock".to_string(),
            StockStatus::Available(n) => format!("{n} in stock"),
            StockStatus::Restocks { days } => format!("Sold out, restocks every {days} day(s)"),
            StockStatus::OutOfStock => "Out of stock".to_string(),
        };
        message = message.field(
            format!("#{id} {}", item.name),
            format!("Price: {} | {stock}", item.price),
        );
    }
    message.footer(format!("Use {prefix}buy (<item>) [quantity] to purchase.")).into()
}

pub fn inventory(owner: &str, inventory: &Inventory) -> Reply {
    if inventory.is_empty() {
        return Reply::text("Your inventory is empty.");
    }
    let mut message = RichMessage::new(format!("{owner}'s Inventory"));
    let mut total: Coins = 0;
    for entry in inventory.values() {
        total = total.saturating_add(entry.total_value());
        message = message.field(
            entry.name.clone(),
            format!(
                "Quantity: {} | Value: ${} each, ${} total",
                entry.quantity,
                entry.value,
                entry.total_value()
            ),
        );
    }
    message.footer(format!("Total value: ${total}")).into()
}

pub fn predictions(list: &[(PredictionId, Prediction)]) -> Reply {
    if list.is_empty() {
        return Reply::text("There are currently no predictions.");
    }
    let mut message = RichMessage::new("Predictions");
    for (id, prediction) in list {
        let status = if prediction.open { "Open" } else { "Closed" };
        let options = prediction
            .option_summaries()
            .iter()
            .map(|o| format!("{}. {}: ${} ({}%)", o.number, o.text, o.staked, o.percent))
            .collect::<Vec<_>>()
            .join("\n");
        message = message.field(
            format!("#{id} {} [{status}]", prediction.title),
            format!("{options}\nTotal bets: ${}", prediction.total_bets),
        );
    }
    message.into()
}

pub fn positions(list: &[Position]) -> Reply {
    if list.is_empty() {
        return Reply::text("You have no bets on open predictions.");
    }
    let mut message = RichMessage::new("Your Current Bets");
    for position in list {
        message = message.field(
            position.title.clone(),
            format!("${} on {}", position.amount, position.option),
        );
    }
    message.into()
}

pub fn auctions(views: &[AuctionView]) -> Reply {
    if views.is_empty() {
        return Reply::text("There are no auctions running.");
    }
    let mut message = RichMessage::new("Current Auctions");
    for view in views {
        let auction = &view.auction;
        let seller = view.owner_name.as_deref().unwrap_or("Shop");
        let leader = auction
            .bids
            .last()
            .map_or_else(|| "No bids yet".to_string(), |bid| bid.name.clone());
        message = message.field(
            format!("#{} {} x{}", view.id, auction.item, auction.quantity),
            format!(
                "Seller: {seller} | Current bid: ${} | Leader: {leader} | Bids: {} | Time left: {}",
                auction.current_bid, auction.number_of_bids, view.time_left
            ),
        );
    }
    message.into()
}

pub fn bet(receipt: &BetReceipt) -> Reply {
    Reply::text(format!(
        "Bet of ${} on {} placed for {}. Your position is ${}; wallet ${}.",
        receipt.amount, receipt.option, receipt.title, receipt.position, receipt.wallet
    ))
}

pub fn purchase(receipt: &Receipt) -> Reply {
    let p = &receipt.purchase;
    Reply::text(format!(
        "{} {}{} purchased for ${}. Wallet: ${}.",
        p.quantity,
        p.name,
        plural(p.quantity),
        p.cost,
        receipt.wallet
    ))
}

pub fn sale(sale: &Sale) -> Reply {
    Reply::text(format!(
        "Sold {} {}{} for a total of ${}. Wallet: ${}.",
        sale.quantity,
        sale.name,
        plural(sale.quantity),
        sale.proceeds,
        sale.wallet
    ))
}

pub fn auction_opened(id: AuctionId, auction: &Auction, minutes: u64, prefix: &str) -> Reply {
    let duration = if minutes < 60 {
        format!("{minutes} minute(s)")
    } else {
        format!("{:.1} hour(s)", minutes as f64 / 60.0)
    };
    Reply::text(format!(
        "Auction #{id} created for {} {}{} with a starting bid of ${}. It ends in {duration}. Use {prefix}bid {id} <amount> to bid.",
        auction.quantity,
        auction.item,
        plural(auction.quantity),
        auction.current_bid
    ))
}

pub fn bid_accepted(id: AuctionId, auction: &Auction) -> Reply {
    Reply::text(format!(
        "Bid of ${} on auction #{id} ({}) accepted.",
        auction.current_bid, auction.item
    ))
}

pub fn reward(rewarded: &Rewarded) -> Reply {
    Reply::text(format!(
        "${} added to {}'s wallet.",
        rewarded.amount, rewarded.name
    ))
}

pub fn prediction_created(id: PredictionId, title: &str) -> Reply {
    Reply::text(format!("Prediction #{id} \"{title}\" was created."))
}

pub fn closed(closed: &Closed) -> Reply {
    if closed.was_open {
        Reply::text(format!("Betting on {} is now closed.", closed.title))
    } else {
        Reply::text(format!("Betting on {} was already closed.", closed.title))
    }
}

pub fn payout(report: &PayoutReport) -> Reply {
    let mut message = RichMessage::new(format!("{} Results", report.title))
        .description(format!("Winning option: {}", report.winning_option))
        .inline_field("Total pool", format!("${}", report.total_pool))
        .inline_field("Bonus pool", format!("${}", report.bonus_pool));

    if report.is_no_winner() {
        return message
            .footer("Nobody bet on the winning option. No payouts were made.")
            .into();
    }

    let winners = report
        .winners
        .iter()
        .map(|w| format!("{}: +${} (stake ${})", w.name, w.winnings, w.stake))
        .collect::<Vec<_>>()
        .join("\n");
    message = message.field("Winners", winners);
    if !report.losers.is_empty() {
        let losers = report
            .losers
            .iter()
            .map(|l| format!("{}: -${}", l.name, l.stake))
            .collect::<Vec<_>>()
            .join("\n");
        message = message.field("Losers", losers);
    }
    message
        .footer(format!("${} paid out.", report.total_paid()))
        .into()
}

pub fn item_created(name: &str) -> Reply {
    Reply::text(format!("{name} has been added to the shop."))
}

pub fn item_edited(name: &str, report: &EditReport) -> Reply {
    let text = match (report.applied.is_empty(), report.skipped.is_empty()) {
        (false, true) => format!("{name} successfully edited."),
        (false, false) => format!(
            "{name} successfully edited. Skipped unknown attributes: {}.",
            report.skipped.join(", ")
        ),
        (true, _) => format!("There were no valid attributes to change. {name} is back on sale."),
    };
    Reply::text(text)
}

pub fn item_deleted(name: &str) -> Reply {
    Reply::text(format!("{name} successfully removed from the shop."))
}

pub fn user_reset(name: &str) -> Reply {
    Reply::text(format!("{name} has been reset."))
}

pub fn inventory_reset(name: &str) -> Reply {
    Reply::text(format!("{name}'s inventory has been cleared."))
}

pub fn purged(removed: usize) -> Reply {
    let s = if removed == 1 { "" } else { "s" };
    Reply::text(format!("Removed {removed} user{s} no longer in the server."))
}

pub fn default_channel(channel: ChannelId, name: &str) -> Reply {
    Reply::text(format!("{name} ({channel}) has been set as the default channel."))
}

pub fn toggles(report: &ToggleReport) -> Reply {
    let mut lines = Vec::new();
    if !report.updated.is_empty() {
        lines.push("Updated:".to_string());
        lines.extend(
            report
                .updated
                .iter()
                .map(|(command, enabled)| format!("`{command}` set to {enabled}")),
        );
    }
    if !report.failed.is_empty() {
        lines.push("Failed:".to_string());
        lines.extend(report.failed.iter().map(|outcome| match outcome {
            ToggleOutcome::InvalidValue { command, value } => {
                format!("`{command}` can not be set to {value}")
            }
            ToggleOutcome::UnknownCommand { command } => format!("`{command}` not found in settings"),
            ToggleOutcome::Updated { command, .. } => format!("`{command}` updated"),
        }));
    }
    Reply::text(lines.join("\n"))
}

pub fn help(listing: &HelpListing, prefix: &str) -> Reply {
    let list = |names: &[String]| {
        if names.is_empty() {
            "None".to_string()
        } else {
            names
                .iter()
                .map(|n| format!("{prefix}{n}"))
                .collect::<Vec<_>>()
                .join(", ")
        }
    };
    let mut message = RichMessage::new("Commands").field("User commands", list(&listing.user));
    if let Some(privileged) = &listing.privileged {
        message = message.field("Moderator commands", list(privileged));
    }
    message.into()
}

/// Text announcing how an auction ended.
pub fn auction_notice(resolution: &Resolution) -> String {
    let id = resolution.auction_id;
    let auction = &resolution.auction;
    let lot = format!(
        "{} {}{}",
        auction.quantity,
        auction.item,
        plural(auction.quantity)
    );
    match &resolution.settlement {
        Settlement::Sold {
            winner_name, price, ..
        } => format!("Auction #{id} for {lot} has ended. {winner_name} won with a bid of ${price}!"),
        Settlement::Unsold { reason, returned } => {
            let why = match reason {
                UnsoldReason::NoBids => "There were no bids",
                UnsoldReason::HighestBidderShort => {
                    "The highest bidder could not afford their bid"
                }
                UnsoldReason::NoAffordableBidder => "None of the bidders could afford their bids",
            };
            let fate = if *returned {
                "The items were returned to the seller."
            } else {
                "The items were not sold."
            };
            format!("Auction #{id} for {lot} has ended. {why}. {fate}")
        }
    }
}
