//! Chat command parsing.
//!
//! A command is `<prefix><name> <args...>`. Arguments are separated by
//! whitespace; an argument wrapped in parentheses may contain spaces.

use std::fmt;
use std::str::FromStr;

use crate::domain::{AuctionId, ChannelId, Coins, EconomyError, Selector};

/// Parsed chat commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Wallet,
    Shop,
    Predictions,
    Auctions,
    Inventory,
    MyBets,
    Bet {
        prediction: Selector,
        amount: Coins,
        option: Selector,
    },
    Buy {
        item: String,
        quantity: u64,
    },
    Sell {
        item: String,
        quantity: u64,
    },
    AuctionItem {
        item: String,
        quantity: u64,
        starting_bid: Coins,
        minutes: u64,
    },
    Bid {
        auction: AuctionId,
        amount: Coins,
    },
    Reward {
        amount: Coins,
        target: String,
    },
    CreateAuction {
        item: String,
        quantity: u64,
        starting_bid: Coins,
        minutes: u64,
    },
    CreatePrediction {
        title: String,
        declared: usize,
        options: Vec<String>,
    },
    ClosePrediction {
        prediction: Selector,
    },
    ResolvePrediction {
        prediction: Selector,
        option: Selector,
    },
    CreateShopItem {
        name: String,
        price: Coins,
        quantity: Option<u64>,
        refresh_days: Option<u64>,
    },
    DeleteShopItem {
        name: String,
    },
    EditShopItem {
        name: String,
        edits: Vec<(String, String)>,
    },
    ResetUserInventory {
        target: String,
    },
    ResetUser {
        target: String,
    },
    PurgeDeprecatedUsers,
    SetDefaultChannel {
        channel: Option<ChannelId>,
    },
    ToggleCommand {
        toggles: Vec<(String, String)>,
    },
}

/// Parse error for command messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    UnknownCommand(String),
    /// Arguments do not fit the command's syntax.
    Malformed(&'static str),
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
            Self::Malformed(cmd) => write!(f, "malformed arguments for `{cmd}`"),
        }
    }
}

impl std::error::Error for CommandParseError {}

impl CommandParseError {
    /// The user-facing error, carrying the usage line when there is one.
    #[must_use]
    pub fn into_economy(self, prefix: &str) -> EconomyError {
        match self {
            Self::Malformed(name) => match usage(name) {
                Some(syntax) => {
                    EconomyError::syntax(format_args!("Usage: {prefix}{name}{syntax}"))
                }
                None => EconomyError::syntax(format_args!("Usage: {prefix}{name}")),
            },
            Self::UnknownCommand(name) => {
                EconomyError::syntax(format_args!("{prefix}{name} is not a command."))
            }
        }
    }
}

/// Argument syntax of each command, without the command name.
#[must_use]
pub fn usage(name: &str) -> Option<&'static str> {
    let syntax = match name {
        "help" | "commands" | "wallet" | "shop" | "predictions" | "auctions" | "inventory"
        | "my_bets" | "purge_deprecated_users" => "",
        "bet" => " <prediction id or (title)> <amount> <option number or (option)>",
        "buy" | "sell" => " (<item>) [quantity]",
        "auction_item" | "create_auction" => " (<item>) <quantity> <starting_bid> <minutes>",
        "bid" => " <auction_id> <amount>",
        "reward" => " <amount> <user id or name>",
        "create_prediction" => " (<title>) <number_of_options> (<option 1>) (<option 2>) ...",
        "close_prediction" => " <prediction id or (title)>",
        "resolve_prediction" => " <prediction id or (title)> <option number or (option)>",
        "create_shop_item" => " (<item>) <price> [quantity] [refresh_days]",
        "delete_shop_item" => " (<item>)",
        "edit_shop_item" => " (<item>) (<name|price|quantity|refresh_time>) (<value>) ...",
        "reset_user_inventory" | "reset_user" => " (<user id or name>)",
        "set_default_channel" => " [channel_id]",
        "toggle_command" => " (<command>) (<true|false>) ...",
        _ => return None,
    };
    Some(syntax)
}

/// Split a message into a lowercased command name and its argument text.
///
/// Returns `None` when the message does not start with `prefix`.
#[must_use]
pub fn split_command<'a>(prefix: &str, text: &'a str) -> Option<(String, &'a str)> {
    let body = text.trim_start().strip_prefix(prefix)?;
    let end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = body[..end].to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, &body[end..]))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Arg {
    text: String,
    grouped: bool,
}

impl Arg {
    /// Grouped text is always a name; bare digits are an id.
    fn selector(&self) -> Selector {
        if self.grouped {
            Selector::Name(self.text.clone())
        } else {
            Selector::parse(&self.text)
        }
    }
}

fn tokenize(input: &str) -> Option<Vec<Arg>> {
    let mut args = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix('(') {
            let end = inner.find(')')?;
            args.push(Arg {
                text: inner[..end].trim().to_string(),
                grouped: true,
            });
            rest = inner[end + 1..].trim_start();
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '(')
                .unwrap_or(rest.len());
            args.push(Arg {
                text: rest[..end].to_string(),
                grouped: false,
            });
            rest = rest[end..].trim_start();
        }
    }
    Some(args)
}

struct Args {
    name: &'static str,
    items: std::vec::IntoIter<Arg>,
}

impl Args {
    fn malformed(&self) -> CommandParseError {
        CommandParseError::Malformed(self.name)
    }

    fn next(&mut self) -> Result<Arg, CommandParseError> {
        self.items.next().ok_or(CommandParseError::Malformed(self.name))
    }

    fn text(&mut self) -> Result<String, CommandParseError> {
        let arg = self.next()?;
        if arg.text.is_empty() {
            return Err(self.malformed());
        }
        Ok(arg.text)
    }

    fn number<T: FromStr>(&mut self) -> Result<T, CommandParseError> {
        let arg = self.next()?;
        arg.text.parse().map_err(|_| self.malformed())
    }

    fn positive(&mut self) -> Result<u64, CommandParseError> {
        match self.number::<u64>()? {
            0 => Err(self.malformed()),
            n => Ok(n),
        }
    }

    fn amount(&mut self) -> Result<Coins, CommandParseError> {
        let n = self.positive()?;
        Coins::try_from(n).map_err(|_| self.malformed())
    }

    /// A non-negative amount; zero is allowed.
    fn coins(&mut self) -> Result<Coins, CommandParseError> {
        let n = self.number::<u64>()?;
        Coins::try_from(n).map_err(|_| self.malformed())
    }

    fn optional_number<T: FromStr>(&mut self) -> Result<Option<T>, CommandParseError> {
        match self.items.next() {
            Some(arg) => arg.text.parse().map(Some).map_err(|_| self.malformed()),
            None => Ok(None),
        }
    }

    /// The remaining arguments as one name.
    fn rest_joined(&mut self) -> Result<String, CommandParseError> {
        let joined = self
            .items
            .by_ref()
            .map(|arg| arg.text)
            .collect::<Vec<_>>()
            .join(" ");
        if joined.trim().is_empty() {
            return Err(self.malformed());
        }
        Ok(joined)
    }

    /// The remaining arguments as a selector; a single argument keeps its
    /// grouping.
    fn rest_selector(&mut self) -> Result<Selector, CommandParseError> {
        if self.items.len() == 1 {
            return Ok(self.next()?.selector());
        }
        self.rest_joined().map(Selector::Name)
    }

    fn pairs(&mut self) -> Result<Vec<(String, String)>, CommandParseError> {
        if self.items.len() == 0 || self.items.len() % 2 != 0 {
            return Err(self.malformed());
        }
        let mut pairs = Vec::with_capacity(self.items.len() / 2);
        while let Some(key) = self.items.next() {
            let value = self.next()?;
            pairs.push((key.text, value.text));
        }
        Ok(pairs)
    }

    fn finish(&self) -> Result<(), CommandParseError> {
        if self.items.len() == 0 {
            Ok(())
        } else {
            Err(self.malformed())
        }
    }
}

fn static_name(name: &str) -> Option<&'static str> {
    const NAMES: &[&str] = &[
        "help",
        "commands",
        "wallet",
        "shop",
        "predictions",
        "auctions",
        "inventory",
        "my_bets",
        "bet",
        "buy",
        "sell",
        "auction_item",
        "bid",
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
        "toggle_command",
    ];
    NAMES.iter().copied().find(|known| *known == name)
}

impl Command {
    /// Parse the arguments of the command called `name`.
    pub fn parse(name: &str, args: &str) -> Result<Self, CommandParseError> {
        let Some(name) = static_name(name) else {
            return Err(CommandParseError::UnknownCommand(name.to_string()));
        };
        let items = tokenize(args).ok_or(CommandParseError::Malformed(name))?;
        let mut args = Args {
            name,
            items: items.into_iter(),
        };

        let command = match name {
            "help" | "commands" => return Ok(Self::Help),
            "wallet" => return Ok(Self::Wallet),
            "shop" => return Ok(Self::Shop),
            "predictions" => return Ok(Self::Predictions),
            "auctions" => return Ok(Self::Auctions),
            "inventory" => return Ok(Self::Inventory),
            "my_bets" => return Ok(Self::MyBets),
            "purge_deprecated_users" => return Ok(Self::PurgeDeprecatedUsers),
            "bet" => Self::Bet {
                prediction: args.next()?.selector(),
                amount: args.amount()?,
                option: args.next()?.selector(),
            },
            "buy" | "sell" => {
                let item = args.text()?;
                let quantity = match args.optional_number::<u64>()? {
                    Some(0) => return Err(args.malformed()),
                    Some(n) => n,
                    None => 1,
                };
                if name == "buy" {
                    Self::Buy { item, quantity }
                } else {
                    Self::Sell { item, quantity }
                }
            }
            "auction_item" | "create_auction" => {
                let item = args.text()?;
                let quantity = args.positive()?;
                let starting_bid = args.amount()?;
                let minutes = args.positive()?;
                if name == "auction_item" {
                    Self::AuctionItem {
                        item,
                        quantity,
                        starting_bid,
                        minutes,
                    }
                } else {
                    Self::CreateAuction {
                        item,
                        quantity,
                        starting_bid,
                        minutes,
                    }
                }
            }
            "bid" => Self::Bid {
                auction: args.number()?,
                amount: args.amount()?,
            },
            "reward" => {
                let amount = args.amount()?;
                return Ok(Self::Reward {
                    amount,
                    target: args.rest_joined()?,
                });
            }
            "create_prediction" => {
                let title = args.text()?;
                let declared = args.number()?;
                let mut options = Vec::new();
                while let Ok(option) = args.text() {
                    options.push(option);
                }
                Self::CreatePrediction {
                    title,
                    declared,
                    options,
                }
            }
            "close_prediction" => {
                return Ok(Self::ClosePrediction {
                    prediction: args.rest_selector()?,
                })
            }
            "resolve_prediction" => Self::ResolvePrediction {
                prediction: args.next()?.selector(),
                option: args.next()?.selector(),
            },
            "create_shop_item" => Self::CreateShopItem {
                name: args.text()?,
                price: args.coins()?,
                quantity: args.optional_number()?,
                refresh_days: args.optional_number()?,
            },
            "delete_shop_item" => {
                return Ok(Self::DeleteShopItem {
                    name: args.rest_joined()?,
                })
            }
            "edit_shop_item" => Self::EditShopItem {
                name: args.text()?,
                edits: args.pairs()?,
            },
            "reset_user_inventory" => {
                return Ok(Self::ResetUserInventory {
                    target: args.rest_joined()?,
                })
            }
            "reset_user" => {
                return Ok(Self::ResetUser {
                    target: args.rest_joined()?,
                })
            }
            "set_default_channel" => Self::SetDefaultChannel {
                channel: args.optional_number()?,
            },
            "toggle_command" => Self::ToggleCommand {
                toggles: args.pairs()?,
            },
            other => return Err(CommandParseError::UnknownCommand(other.to_string())),
        };

        args.finish()?;
        Ok(command)
    }

    /// Settings key of the command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Wallet => "wallet",
            Self::Shop => "shop",
            Self::Predictions => "predictions",
            Self::Auctions => "auctions",
            Self::Inventory => "inventory",
            Self::MyBets => "my_bets",
            Self::Bet { .. } => "bet",
            Self::Buy { .. } => "buy",
            Self::Sell { .. } => "sell",
            Self::AuctionItem { .. } => "auction_item",
            Self::Bid { .. } => "bid",
            Self::Reward { .. } => "reward",
            Self::CreateAuction { .. } => "create_auction",
            Self::CreatePrediction { .. } => "create_prediction",
            Self::ClosePrediction { .. } => "close_prediction",
            Self::ResolvePrediction { .. } => "resolve_prediction",
            Self::CreateShopItem { .. } => "create_shop_item",
            Self::DeleteShopItem { .. } => "delete_shop_item",
            Self::EditShopItem { .. } => "edit_shop_item",
            Self::ResetUserInventory { .. } => "reset_user_inventory",
            Self::ResetUser { .. } => "reset_user",
            Self::PurgeDeprecatedUsers => "purge_deprecated_users",
            Self::SetDefaultChannel { .. } => "set_default_channel",
            Self::ToggleCommand { .. } => "toggle_command",
        }
    }
}
