//! Selection and pacing shared by every pass.
//!
//! The engine walks a candidate list without replacement until the quota of
//! successful actions is met or every candidate has been tried, running one
//! action at a time and pausing for the throttle after each attempt.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Result of acting on one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Nothing was acknowledged. The candidate counts as tried, not processed.
    SoftFail,
}

#[async_trait]
pub trait CandidateAction<T: Sync + ?Sized>: Send + Sync {
    async fn act(&self, candidate: &T) -> Outcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrder {
    Random,
    Sequential,
}

impl SelectionOrder {
    pub fn from_flag(random: bool) -> Self {
        if random {
            Self::Random
        } else {
            Self::Sequential
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Successful actions.
    pub processed: usize,
    /// Actions run, successful or not.
    pub attempted: usize,
    /// Candidate indices in the order they were picked.
    pub selected: Vec<usize>,
    /// Indices whose action succeeded.
    pub succeeded: Vec<usize>,
}

pub struct SelectionEngine<R = StdRng> {
    rng: R,
    throttle: Duration,
}

impl SelectionEngine<StdRng> {
    pub fn new(throttle: Duration) -> Self {
        Self::with_rng(StdRng::from_entropy(), throttle)
    }
}

impl<R: Rng + Send> SelectionEngine<R> {
    pub fn with_rng(rng: R, throttle: Duration) -> Self {
        Self { rng, throttle }
    }

    /// Act on up to `quota` candidates (`quota <= 0` is unbounded).
    pub async fn run<T, A>(
        &mut self,
        candidates: &[T],
        quota: i64,
        order: SelectionOrder,
        action: &A,
    ) -> PassReport
    where
        T: Sync,
        A: CandidateAction<T> + ?Sized,
    {
        let mut report = PassReport::default();
        let mut used = HashSet::with_capacity(candidates.len());

        loop {
            if quota > 0 && report.processed as i64 >= quota {
                info!("Reached quota of {}", quota);
                break;
            }
            let Some(idx) = self.select(candidates.len(), &used, order) else {
                debug!("All {} candidate(s) tried", candidates.len());
                break;
            };
            used.insert(idx);
            report.selected.push(idx);
            report.attempted += 1;

            if action.act(&candidates[idx]).await == Outcome::Success {
                report.processed += 1;
                report.succeeded.push(idx);
            }

            info!("Sleeping {}s...", self.throttle.as_secs());
            tokio::time::sleep(self.throttle).await;
        }
        report
    }

    /// Next unused index, or `None` once every index is used.
    fn select(&mut self, len: usize, used: &HashSet<usize>, order: SelectionOrder) -> Option<usize> {
        let remaining = len.saturating_sub(used.len());
        if remaining == 0 {
            return None;
        }
        if order == SelectionOrder::Random && remaining > 1 {
            loop {
                let idx = self.rng.gen_range(0..len);
                if !used.contains(&idx) {
                    return Some(idx);
                }
            }
        }
        (0..len).find(|i| !used.contains(i))
    }
}
