//! Bounded fan-out over a list of items with results kept in input order.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),
    #[error("no result recorded for item {index}")]
    MissingResult { index: usize },
}

/// Apply `op` to every item with at most `limit` operations in flight.
///
/// Workers pull the next unclaimed index until the list is exhausted, so a
/// slow item never holds back the rest of the queue. Outputs come back in
/// the order of `items` whatever order they completed in, and an `Err`
/// produced by `op` is returned like any other output without stopping
/// sibling workers.
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    limit: usize,
    op: F,
) -> Result<Vec<R>, SchedulerError>
where
    T: Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(&T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let total = items.len();
    let workers = limit.clamp(1, total);
    let items = Arc::new(items);
    let op = Arc::new(op);
    let next = Arc::new(AtomicUsize::new(0));

    debug!(
        target = "application::scheduler",
        items = total,
        workers,
        "Starting bounded fan-out"
    );

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let items = Arc::clone(&items);
        let op = Arc::clone(&op);
        let next = Arc::clone(&next);
        set.spawn(async move {
            let mut produced = Vec::new();
            loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    break;
                };
                produced.push((index, op(item).await));
            }
            produced
        });
    }

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some(joined) = set.join_next().await {
        let produced = joined.map_err(|err| SchedulerError::WorkerPanicked(err.to_string()))?;
        for (index, output) in produced {
            slots[index] = Some(output);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.ok_or(SchedulerError::MissingResult { index }))
        .collect()
}
