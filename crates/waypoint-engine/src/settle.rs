//! Settle-all fan-out: run a batch of independent fallible futures to
//! completion and decide afterwards what to do with the failures.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use tracing::warn;

/// Outcomes of a settled batch, in input order.
#[derive(Debug)]
pub struct Settled<T, E> {
    outcomes: Vec<Result<T, E>>,
}

/// Await every future in `futures`. Failures never short-circuit the batch.
pub async fn settle_all<I, F, T, E>(futures: I) -> Settled<T, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    Settled {
        outcomes: join_all(futures).await,
    }
}

impl<T, E: Display> Settled<T, E> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_err()).count()
    }

    /// Successful values in input order with failed slots removed.
    pub fn successes(self, stage: &str) -> Vec<T> {
        self.outcomes
            .into_iter()
            .enumerate()
            .filter_map(|(index, outcome)| match outcome {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(stage, index, error = %e, "dropping failed batch item");
                    None
                }
            })
            .collect()
    }

    /// One value per input; failed slots become `T::default()`.
    pub fn or_default(self, stage: &str) -> Vec<T>
    where
        T: Default,
    {
        self.outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|e| {
                    warn!(stage, index, error = %e, "batch item failed, using empty result");
                    T::default()
                })
            })
            .collect()
    }
}
