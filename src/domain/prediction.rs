//! Predictions and the pari-mutuel payout.
//!
//! A prediction is open, then optionally closed, then resolved. Resolving
//! pays winners out of a pool made of every stake plus a fixed bonus per
//! option, in proportion to what each winner staked.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::EconomyError;
use super::ids::{PredictionId, Selector, UserId};
use super::money::{round_coins, Coins};
use super::user::User;

/// Option numbers start at 1.
pub type OptionNumber = u32;

/// A user's position on one prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBet {
    /// Display name when the first bet was placed.
    pub name: String,
    pub option: OptionNumber,
    pub amount: Coins,
}

/// A wagering market with enumerated options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub title: String,
    pub options: BTreeMap<OptionNumber, String>,
    pub open: bool,
    #[serde(default)]
    pub user_bets: BTreeMap<UserId, UserBet>,
    #[serde(default)]
    pub total_bets: Coins,
}

/// Stake total for one option, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSummary {
    pub number: OptionNumber,
    pub text: String,
    pub staked: Coins,
    /// Share of all stakes, in percent.
    pub percent: Decimal,
}

impl Prediction {
    #[must_use]
    pub fn new(title: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            title: title.into(),
            options: (1..).zip(options).collect(),
            open: true,
            user_bets: BTreeMap::new(),
            total_bets: 0,
        }
    }

    /// Resolve an option by number or case-insensitive text.
    #[must_use]
    pub fn option_number(&self, selector: &Selector) -> Option<OptionNumber> {
        match selector {
            Selector::Id(n) => {
                let n = OptionNumber::try_from(*n).ok()?;
                self.options.contains_key(&n).then_some(n)
            }
            Selector::Name(text) => self
                .options
                .iter()
                .find(|(_, option)| option.eq_ignore_ascii_case(text))
                .map(|(n, _)| *n),
        }
    }

    /// Total staked on `option`.
    #[must_use]
    pub fn staked_on(&self, option: OptionNumber) -> Coins {
        self.user_bets
            .values()
            .filter(|bet| bet.option == option)
            .map(|bet| bet.amount)
            .sum()
    }

    #[must_use]
    pub fn option_summaries(&self) -> Vec<OptionSummary> {
        self.options
            .iter()
            .map(|(number, text)| {
                let staked = self.staked_on(*number);
                let percent = if self.total_bets > 0 {
                    (Decimal::from(staked) * Decimal::ONE_HUNDRED / Decimal::from(self.total_bets))
                        .round_dp(1)
                } else {
                    Decimal::ZERO
                };
                OptionSummary {
                    number: *number,
                    text: text.clone(),
                    staked,
                    percent,
                }
            })
            .collect()
    }

    /// Place or top up a position, debiting `bettor`.
    pub fn place_bet(
        &mut self,
        user_id: UserId,
        bettor: &mut User,
        option: OptionNumber,
        amount: Coins,
    ) -> Result<(), EconomyError> {
        if !self.open {
            return Err(EconomyError::PredictionClosed {
                title: self.title.clone(),
            });
        }
        if let Some(existing) = self.user_bets.get(&user_id) {
            if existing.option != option {
                return Err(EconomyError::OptionConflict);
            }
        }

        bettor.debit(amount)?;
        bettor.record_stake(amount);

        self.user_bets
            .entry(user_id)
            .and_modify(|bet| bet.amount += amount)
            .or_insert_with(|| UserBet {
                name: bettor.display_name.clone(),
                option,
                amount,
            });
        self.total_bets += amount;
        Ok(())
    }

    /// Compute the payout for `winning` without touching any wallet.
    #[must_use]
    pub fn payout(&self, winning: OptionNumber, bonus_per_option: Coins) -> PayoutReport {
        let bonus_pool = bonus_per_option * self.options.len() as Coins;
        let total_pool = self.total_bets + bonus_pool;
        let winning_stake = self.staked_on(winning);

        let mut report = PayoutReport {
            title: self.title.clone(),
            winning_option: self.options.get(&winning).cloned().unwrap_or_default(),
            bonus_pool,
            total_pool,
            winning_stake,
            winners: Vec::new(),
            losers: Vec::new(),
        };
        if winning_stake == 0 {
            return report;
        }

        let pot = Decimal::from(total_pool - winning_stake);
        let stake_total = Decimal::from(winning_stake);
        for (user_id, bet) in &self.user_bets {
            if bet.option != winning {
                report.losers.push(Loser {
                    user_id: *user_id,
                    name: bet.name.clone(),
                    stake: bet.amount,
                });
                continue;
            }
            let stake = Decimal::from(bet.amount);
            report.winners.push(Winner {
                user_id: *user_id,
                name: bet.name.clone(),
                stake: bet.amount,
                share: stake / stake_total,
                winnings: bet.amount + round_coins(stake * pot / stake_total),
            });
        }
        report
    }
}

/// A winning bettor's payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub user_id: UserId,
    pub name: String,
    pub stake: Coins,
    /// Fraction of the winning stakes, 0..=1.
    pub share: Decimal,
    /// Stake plus the bettor's slice of the pool.
    pub winnings: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loser {
    pub user_id: UserId,
    pub name: String,
    pub stake: Coins,
}

/// Result of resolving a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReport {
    pub title: String,
    pub winning_option: String,
    pub bonus_pool: Coins,
    pub total_pool: Coins,
    /// Sum of stakes on the winning option.
    pub winning_stake: Coins,
    pub winners: Vec<Winner>,
    pub losers: Vec<Loser>,
}

impl PayoutReport {
    /// Nobody staked on the winning option.
    #[must_use]
    pub const fn is_no_winner(&self) -> bool {
        self.winning_stake == 0
    }

    #[must_use]
    pub fn total_paid(&self) -> Coins {
        self.winners.iter().map(|w| w.winnings).sum()
    }

    /// Credit winners and record losses. Bettors no longer present are
    /// skipped.
    pub fn apply(&self, users: &mut BTreeMap<UserId, User>) {
        for loser in &self.losers {
            match users.get_mut(&loser.user_id) {
                Some(user) => user.record_loss(loser.stake),
                None => warn!(user = %loser.user_id, "Losing bettor no longer exists"),
            }
        }
        for winner in &self.winners {
            match users.get_mut(&winner.user_id) {
                Some(user) => user.record_win(winner.winnings),
                None => warn!(user = %winner.user_id, "Winning bettor no longer exists"),
            }
        }
    }
}

/// Predictions and the id counter for one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPredictions {
    pub next_prediction_id: PredictionId,
    #[serde(default)]
    pub predictions: BTreeMap<PredictionId, Prediction>,
}

impl Default for ServerPredictions {
    fn default() -> Self {
        Self {
            next_prediction_id: PredictionId::new(1),
            predictions: BTreeMap::new(),
        }
    }
}

impl ServerPredictions {
    /// Open a new prediction.
    pub fn create(
        &mut self,
        title: &str,
        options: Vec<String>,
    ) -> Result<PredictionId, EconomyError> {
        if self
            .predictions
            .values()
            .any(|p| p.title.eq_ignore_ascii_case(title))
        {
            return Err(EconomyError::DuplicateTitle {
                title: title.to_string(),
            });
        }

        let id = self.next_prediction_id;
        self.next_prediction_id = id.next();
        self.predictions.insert(id, Prediction::new(title, options));
        Ok(id)
    }

    /// Resolve a prediction by id or case-insensitive title.
    #[must_use]
    pub fn find(&self, selector: &Selector) -> Option<PredictionId> {
        match selector {
            Selector::Id(id) => {
                let id = PredictionId::new(*id);
                self.predictions.contains_key(&id).then_some(id)
            }
            Selector::Name(title) => self
                .predictions
                .iter()
                .find(|(_, p)| p.title.eq_ignore_ascii_case(title))
                .map(|(id, _)| *id),
        }
    }

    /// Look a prediction up, failing with `NotFound`.
    pub fn get_mut(
        &mut self,
        selector: &Selector,
    ) -> Result<(PredictionId, &mut Prediction), EconomyError> {
        let id = self
            .find(selector)
            .ok_or_else(|| EconomyError::not_found(format!("Prediction {selector}")))?;
        let prediction = self
            .predictions
            .get_mut(&id)
            .ok_or_else(|| EconomyError::not_found(format!("Prediction {selector}")))?;
        Ok((id, prediction))
    }

    /// Stop accepting bets. Returns whether the prediction was open.
    pub fn close(&mut self, selector: &Selector) -> Result<(PredictionId, bool), EconomyError> {
        let (id, prediction) = self.get_mut(selector)?;
        let was_open = prediction.open;
        prediction.open = false;
        Ok((id, was_open))
    }

    /// Pay out and delete a prediction.
    pub fn resolve(
        &mut self,
        selector: &Selector,
        winning: &Selector,
        bonus_per_option: Coins,
        users: &mut BTreeMap<UserId, User>,
    ) -> Result<PayoutReport, EconomyError> {
        let (id, prediction) = self.get_mut(selector)?;
        let option = prediction
            .option_number(winning)
            .ok_or_else(|| EconomyError::not_found(format!("Option {winning}")))?;

        let report = prediction.payout(option, bonus_per_option);
        if !report.is_no_winner() {
            report.apply(users);
        }
        self.predictions.remove(&id);
        Ok(report)
    }

    /// A user's positions on open predictions.
    #[must_use]
    pub fn positions(&self, user_id: UserId) -> Vec<(&Prediction, &UserBet)> {
        self.predictions
            .values()
            .filter(|p| p.open)
            .filter_map(|p| p.user_bets.get(&user_id).map(|bet| (p, bet)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const A: UserId = UserId::new(10);
    const B: UserId = UserId::new(20);
    const C: UserId = UserId::new(30);

    fn users() -> BTreeMap<UserId, User> {
        [(A, "A"), (B, "B"), (C, "C")]
            .into_iter()
            .map(|(id, name)| (id, User::new(name, name.to_lowercase(), 500)))
            .collect()
    }

    fn book() -> (ServerPredictions, PredictionId) {
        let mut book = ServerPredictions::default();
        let id = book
            .create("Who wins?", vec!["Red".into(), "Blue".into()])
            .unwrap();
        (book, id)
    }

    fn bet(
        book: &mut ServerPredictions,
        users: &mut BTreeMap<UserId, User>,
        user: UserId,
        option: OptionNumber,
        amount: Coins,
    ) -> Result<(), EconomyError> {
        let (_, prediction) = book.get_mut(&Selector::Id(1))?;
        let bettor = users.get_mut(&user).unwrap();
        prediction.place_bet(user, bettor, option, amount)
    }

    #[test]
    fn duplicate_titles_are_case_insensitive() {
        let (mut book, _) = book();
        let err = book
            .create("WHO WINS?", vec!["x".into(), "y".into()])
            .unwrap_err();
        assert!(matches!(err, EconomyError::DuplicateTitle { .. }));
    }

    #[test]
    fn options_resolve_by_number_or_text() {
        let (book, id) = book();
        let prediction = &book.predictions[&id];
        assert_eq!(prediction.option_number(&Selector::Id(2)), Some(2));
        assert_eq!(prediction.option_number(&Selector::Id(3)), None);
        assert_eq!(prediction.option_number(&Selector::parse("red")), Some(1));
        assert_eq!(book.find(&Selector::parse("who wins?")), Some(id));
    }

    #[test]
    fn bets_accumulate_on_the_same_option() {
        let (mut book, id) = book();
        let mut users = users();
        bet(&mut book, &mut users, A, 1, 100).unwrap();
        bet(&mut book, &mut users, A, 1, 50).unwrap();

        let prediction = &book.predictions[&id];
        assert_eq!(prediction.user_bets[&A].amount, 150);
        assert_eq!(prediction.total_bets, 150);
        assert_eq!(users[&A].wallet(), 350);
        assert_eq!(users[&A].stats().total_currency_bet, 150);
    }

    #[test]
    fn switching_sides_is_rejected() {
        let (mut book, _) = book();
        let mut users = users();
        bet(&mut book, &mut users, A, 1, 100).unwrap();

        let err = bet(&mut book, &mut users, A, 2, 10).unwrap_err();
        assert_eq!(err, EconomyError::OptionConflict);
        assert_eq!(users[&A].wallet(), 400);
    }

    #[test]
    fn closed_prediction_rejects_bets_and_close_is_idempotent() {
        let (mut book, id) = book();
        let mut users = users();

        assert_eq!(book.close(&Selector::Id(1)).unwrap(), (id, true));
        let snapshot = book.clone();
        assert_eq!(book.close(&Selector::Id(1)).unwrap(), (id, false));
        assert_eq!(book, snapshot);

        let err = bet(&mut book, &mut users, A, 1, 10).unwrap_err();
        assert!(matches!(err, EconomyError::PredictionClosed { .. }));
    }

    #[test]
    fn overdrawn_bet_is_rejected() {
        let (mut book, id) = book();
        let mut users = users();
        let err = bet(&mut book, &mut users, A, 1, 501).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));
        assert!(book.predictions[&id].user_bets.is_empty());
    }

    #[test]
    fn pari_mutuel_payout_matches_the_worked_example() {
        let (mut book, _) = book();
        let mut users = users();
        bet(&mut book, &mut users, A, 1, 100).unwrap();
        bet(&mut book, &mut users, B, 2, 200).unwrap();

        let report = book
            .resolve(&Selector::Id(1), &Selector::Id(1), 100, &mut users)
            .unwrap();

        assert_eq!(report.bonus_pool, 200);
        assert_eq!(report.total_pool, 500);
        assert_eq!(report.winning_stake, 100);
        assert_eq!(report.winners.len(), 1);
        assert_eq!(report.winners[0].share, dec!(1));
        assert_eq!(report.winners[0].winnings, 500);

        assert_eq!(users[&A].wallet(), 900);
        assert_eq!(users[&A].stats().total_currency_won, 500);
        assert_eq!(users[&A].stats().profit(), 500);
        assert_eq!(users[&B].wallet(), 300);
        assert_eq!(users[&B].stats().total_currency_lost, 200);
        assert_eq!(users[&B].stats().bets_lost, 1);
        assert_eq!(users[&B].stats().profit(), -200);
        assert!(book.predictions.is_empty());
    }

    #[test]
    fn winners_split_proportionally_with_half_even_rounding() {
        let (mut book, _) = book();
        let mut users = users();
        bet(&mut book, &mut users, A, 1, 100).unwrap();
        bet(&mut book, &mut users, B, 1, 300).unwrap();
        bet(&mut book, &mut users, C, 2, 50).unwrap();

        // pool = 450 + 200 = 650, W = 400, remainder 250
        let report = book
            .resolve(&Selector::Id(1), &Selector::parse("red"), 100, &mut users)
            .unwrap();
        let winnings: BTreeMap<_, _> = report
            .winners
            .iter()
            .map(|w| (w.user_id, w.winnings))
            .collect();

        // 62.5 -> 62, 187.5 -> 188
        assert_eq!(winnings[&A], 162);
        assert_eq!(winnings[&B], 488);
        assert_eq!(report.total_paid(), 650);
    }

    #[test]
    fn nobody_on_the_winner_pays_nothing() {
        let (mut book, _) = book();
        let mut users = users();
        bet(&mut book, &mut users, A, 1, 100).unwrap();
        let before = users.clone();

        let report = book
            .resolve(&Selector::Id(1), &Selector::Id(2), 100, &mut users)
            .unwrap();

        assert!(report.is_no_winner());
        assert!(report.winners.is_empty());
        assert_eq!(users, before);
        assert!(book.predictions.is_empty());
    }

    #[test]
    fn unknown_option_leaves_prediction_in_place() {
        let (mut book, id) = book();
        let mut users = users();
        let err = book
            .resolve(&Selector::Id(1), &Selector::Id(7), 100, &mut users)
            .unwrap_err();
        assert!(matches!(err, EconomyError::NotFound { .. }));
        assert!(book.predictions.contains_key(&id));
    }

    #[test]
    fn positions_only_cover_open_predictions() {
        let (mut book, _) = book();
        let mut users = users();
        bet(&mut book, &mut users, A, 2, 40).unwrap();
        assert_eq!(book.positions(A).len(), 1);

        book.close(&Selector::Id(1)).unwrap();
        assert!(book.positions(A).is_empty());
    }

    #[test]
    fn summaries_report_share_of_stakes() {
        let (mut book, id) = book();
        let mut users = users();
        bet(&mut book, &mut users, A, 1, 100).unwrap();
        bet(&mut book, &mut users, B, 2, 300).unwrap();

        let summaries = book.predictions[&id].option_summaries();
        assert_eq!(summaries[0].staked, 100);
        assert_eq!(summaries[0].percent, dec!(25.0));
        assert_eq!(summaries[1].percent, dec!(75.0));
    }
}
