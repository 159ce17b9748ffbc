//! Prediction market service.
//!
//! Lifecycle is `Open -> Closed -> Resolved`; a resolved prediction is
//! deleted. Operations that move coins save Users before Predictions.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    Coins, EconomyError, EconomyRules, PayoutReport, Prediction, PredictionId, PredictionsDoc,
    Selector, ServerId, UserId, UsersDoc,
};
use crate::error::Result;
use crate::port::Store;

/// An accepted bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetReceipt {
    pub prediction: PredictionId,
    pub title: String,
    pub option: String,
    pub amount: Coins,
    /// The caller's whole stake on this prediction after the bet.
    pub position: Coins,
    pub wallet: Coins,
}

/// Result of a close request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closed {
    pub prediction: PredictionId,
    pub title: String,
    pub was_open: bool,
}

/// A user's stake on one open prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub title: String,
    pub option: String,
    pub amount: Coins,
}

pub struct Market<S> {
    store: Arc<S>,
    rules: EconomyRules,
}

impl<S: Store> Market<S> {
    pub fn new(store: Arc<S>, rules: EconomyRules) -> Self {
        Self { store, rules }
    }

    /// Open a prediction with `declared` options.
    pub async fn create(
        &self,
        server: ServerId,
        title: &str,
        declared: usize,
        options: Vec<String>,
    ) -> Result<PredictionId> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EconomyError::validation("A prediction needs a title.").into());
        }
        if options.len() < 2 {
            return Err(EconomyError::validation("A prediction needs at least two options.").into());
        }
        if options.len() != declared {
            return Err(EconomyError::validation(format!(
                "You declared {declared} options but listed {}.",
                options.len()
            ))
            .into());
        }

        let mut doc: PredictionsDoc = self.store.load().await?;
        let id = doc.server_mut(server).create(title, options)?;
        self.store.save(&doc).await?;
        info!(server = %server, prediction = %id, title, "Prediction opened");
        Ok(id)
    }

    /// Stake `amount` on an option, topping up an existing position.
    pub async fn place_bet(
        &self,
        server: ServerId,
        user: UserId,
        prediction: &Selector,
        option: &Selector,
        amount: Coins,
    ) -> Result<BetReceipt> {
        if amount <= 0 {
            return Err(EconomyError::validation("The bet needs to be a positive amount.").into());
        }

        let mut predictions: PredictionsDoc = self.store.load().await?;
        let mut users: UsersDoc = self.store.load().await?;

        let (id, target) = predictions.server_mut(server).get_mut(prediction)?;
        let number = target
            .option_number(option)
            .ok_or_else(|| EconomyError::not_found(format!("Option {option}")))?;
        let bettor = users
            .server_mut(server)
            .get_mut(&user)
            .ok_or_else(|| EconomyError::not_found(format!("User {user}")))?;

        target.place_bet(user, bettor, number, amount)?;

        let receipt = BetReceipt {
            prediction: id,
            title: target.title.clone(),
            option: target.options.get(&number).cloned().unwrap_or_default(),
            amount,
            position: target.user_bets.get(&user).map_or(amount, |bet| bet.amount),
            wallet: bettor.wallet(),
        };

        self.store.save(&users).await?;
        self.store.save(&predictions).await?;
        info!(
            server = %server,
            prediction = %id,
            user = %user,
            option = number,
            amount,
            "Bet placed"
        );
        Ok(receipt)
    }

    /// Stop accepting bets. Closing a closed prediction changes nothing.
    pub async fn close(&self, server: ServerId, prediction: &Selector) -> Result<Closed> {
        let mut doc: PredictionsDoc = self.store.load().await?;
        let predictions = doc.server_mut(server);
        let (id, was_open) = predictions.close(prediction)?;
        let title = predictions
            .predictions
            .get(&id)
            .map(|p| p.title.clone())
            .unwrap_or_default();

        if was_open {
            self.store.save(&doc).await?;
            info!(server = %server, prediction = %id, "Prediction closed");
        }
        Ok(Closed {
            prediction: id,
            title,
            was_open,
        })
    }

    /// Pay out the winners and delete the prediction.
    pub async fn resolve(
        &self,
        server: ServerId,
        prediction: &Selector,
        winning: &Selector,
    ) -> Result<PayoutReport> {
        let mut predictions: PredictionsDoc = self.store.load().await?;
        let mut users: UsersDoc = self.store.load().await?;

        let report = predictions.server_mut(server).resolve(
            prediction,
            winning,
            self.rules.bonus_per_option,
            users.server_mut(server),
        )?;

        self.store.save(&users).await?;
        self.store.save(&predictions).await?;
        info!(
            server = %server,
            title = %report.title,
            winners = report.winners.len(),
            losers = report.losers.len(),
            paid = report.total_paid(),
            "Prediction resolved"
        );
        Ok(report)
    }

    /// Every prediction of the server in id order.
    pub async fn list(&self, server: ServerId) -> Result<Vec<(PredictionId, Prediction)>> {
        let doc: PredictionsDoc = self.store.load().await?;
        Ok(doc
            .get(server)
            .map(|p| {
                p.predictions
                    .iter()
                    .map(|(id, prediction)| (*id, prediction.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// The user's positions on open predictions.
    pub async fn positions(&self, server: ServerId, user: UserId) -> Result<Vec<Position>> {
        let doc: PredictionsDoc = self.store.load().await?;
        let Some(predictions) = doc.get(server) else {
            return Ok(Vec::new());
        };
        Ok(predictions
            .positions(user)
            .into_iter()
            .map(|(prediction, bet)| Position {
                title: prediction.title.clone(),
                option: prediction
                    .options
                    .get(&bet.option)
                    .cloned()
                    .unwrap_or_default(),
                amount: bet.amount,
            })
            .collect())
    }
}
