//! Auction timers.
//!
//! One task per auction sleeps until the auction's deadline, then queues a
//! resolution job for the executor. Timers never touch the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::executor::Job;
use crate::domain::{AuctionId, ServerId};

type TimerKey = (ServerId, AuctionId);

/// Registry of pending auction timers.
#[derive(Clone)]
pub struct AuctionTimers {
    jobs: mpsc::Sender<Job>,
    pending: Arc<DashMap<TimerKey, JoinHandle<()>>>,
}

impl AuctionTimers {
    #[must_use]
    pub fn new(jobs: mpsc::Sender<Job>) -> Self {
        Self {
            jobs,
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Schedule resolution at `deadline`. A past deadline fires at once.
    ///
    /// Returns `false` if the auction already has a timer.
    pub fn schedule(&self, server: ServerId, auction: AuctionId, deadline: DateTime<Utc>) -> bool {
        match self.pending.entry((server, auction)) {
            Entry::Occupied(_) => {
                debug!(server = %server, auction = %auction, "Timer already scheduled");
                false
            }
            Entry::Vacant(slot) => {
                let delay = (deadline - Utc::now()).to_std().unwrap_or_default();
                let jobs = self.jobs.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if jobs
                        .send(Job::ResolveAuction { server, auction })
                        .await
                        .is_err()
                    {
                        warn!(server = %server, auction = %auction, "Job queue closed before auction resolved");
                    }
                });
                slot.insert(handle);
                debug!(server = %server, auction = %auction, delay_secs = delay.as_secs(), "Timer scheduled");
                true
            }
        }
    }

    /// Forget a timer once its auction is resolved, cancelling it if it has
    /// not fired yet.
    pub fn complete(&self, server: ServerId, auction: AuctionId) {
        if let Some((_, handle)) = self.pending.remove(&(server, auction)) {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_scheduled(&self, server: ServerId, auction: AuctionId) -> bool {
        self.pending.contains_key(&(server, auction))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Abort every pending timer.
    pub fn shutdown(&self) {
        for entry in self.pending.iter() {
            entry.value().abort();
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_the_deadline() {
        let (tx, mut rx) = mpsc::channel(4);
        let timers = AuctionTimers::new(tx);
        let deadline = Utc::now() + chrono::Duration::minutes(5);

        assert!(timers.schedule(ServerId::new(1), AuctionId::new(3), deadline));
        assert!(!timers.schedule(ServerId::new(1), AuctionId::new(3), deadline));
        assert!(timers.is_scheduled(ServerId::new(1), AuctionId::new(3)));

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert!(rx.try_recv().is_err());

        let job = rx.recv().await.unwrap();
        assert_eq!(
            job,
            Job::ResolveAuction {
                server: ServerId::new(1),
                auction: AuctionId::new(3)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadlines_fire_immediately() {
        let (tx, mut rx) = mpsc::channel(4);
        let timers = AuctionTimers::new(tx);
        timers.schedule(
            ServerId::new(2),
            AuctionId::new(1),
            Utc::now() - chrono::Duration::hours(1),
        );

        let job = rx.recv().await.unwrap();
        assert!(matches!(job, Job::ResolveAuction { .. }));

        timers.complete(ServerId::new(2), AuctionId::new(1));
        assert!(timers.is_empty());
    }
}
