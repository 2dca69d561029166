use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

/// Run `run_fn` for every id with at most `max_concurrency` in flight.
///
/// Results come back in the order of `ids`, whatever order they finished in.
/// Every id runs to its own conclusion; one failure does not cancel siblings.
pub async fn run_bounded<T, F, Fut>(ids: &[String], max_concurrency: usize, run_fn: F) -> Vec<(String, T)>
where
    F: Fn(String) -> Fut + Clone,
    Fut: Future<Output = T>,
{
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs = FuturesUnordered::new();

    for (index, id) in ids.iter().enumerate() {
        let sem = sem.clone();
        let run = run_fn.clone();
        let id = id.clone();

        futs.push(async move {
            // the semaphore is never closed, so acquiring only fails if it is dropped
            let _permit = sem.acquire_owned().await.ok();
            let out = run(id.clone()).await;
            (index, id, out)
        });
    }

    let mut results = Vec::with_capacity(ids.len());
    while let Some(res) = futs.next().await {
        results.push(res);
    }
    results.sort_by_key(|(index, _, _)| *index);
    results.into_iter().map(|(_, id, out)| (id, out)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrency_is_bounded_and_order_kept() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ids: Vec<String> = (0..6).map(|i| format!("T{i}")).collect();

        let results = run_bounded(&ids, 2, {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            move |id: String| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    id.len()
                }
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        let order: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, ["T0", "T1", "T2", "T3", "T4", "T5"]);
    }
}
