//! Concurrent fetch-all engine.
//!
//! [`run_for_all`] spawns one task per item before awaiting any of them and
//! joins every task, successful or not, before returning. A failure in any
//! task fails the whole call and the partial results are dropped.
//!
//! When several tasks fail, the reported error is whichever was queued
//! first. That depends on scheduling and is not stable across runs.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::SyncError;

/// Run `f(index, item)` for every item concurrently.
///
/// Returns the results in input order, regardless of completion order, or
/// the first error drained from the error queue.
pub async fn run_for_all<T, R, F, Fut>(items: Vec<T>, f: F) -> Result<Vec<R>, SyncError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<R, SyncError>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    // One slot per task, so reporting a failure never waits on the reader.
    let (err_tx, mut err_rx) = mpsc::channel::<SyncError>(total);

    let handles: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let task = f(index, item);
            let err_tx = err_tx.clone();
            tokio::spawn(async move {
                match task.await {
                    Ok(result) => Some(result),
                    Err(err) => {
                        tracing::debug!(index, error = %err, "fan-out task failed");
                        let _ = err_tx.send(err).await;
                        None
                    }
                }
            })
        })
        .collect();
    drop(err_tx);

    let mut results = Vec::with_capacity(total);
    let mut join_failure = None;
    for handle in handles {
        match handle.await {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(err) => {
                join_failure.get_or_insert(err);
            }
        }
    }

    if let Ok(err) = err_rx.try_recv() {
        return Err(err);
    }
    if let Some(err) = join_failure {
        return Err(err.into());
    }
    tracing::debug!(tasks = total, "fan-out complete");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use pipesync_remote::RemoteError;

    use super::*;

    fn boom(what: &str) -> SyncError {
        SyncError::Remote(RemoteError::Transport {
            target: "https://ci.example.com".into(),
            message: what.into(),
        })
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let out = run_for_all(Vec::<u32>::new(), |_, n| async move { Ok::<_, SyncError>(n) })
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn results_follow_input_order_not_completion_order() {
        let delays = vec![30u64, 0, 15, 5];
        let out = run_for_all(delays, |index, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, SyncError>((index, delay))
        })
        .await
        .unwrap();
        assert_eq!(out, vec![(0, 30), (1, 0), (2, 15), (3, 5)]);
    }

    #[tokio::test]
    async fn one_failure_fails_the_whole_fan_out_after_all_tasks_ran() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let err = run_for_all(vec![1, 2, 3, 4], move |_, n| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5 * n)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                if n == 1 {
                    return Err(boom("first item failed"));
                }
                Ok(n)
            }
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("first item failed"));
        assert_eq!(finished.load(Ordering::SeqCst), 4, "no task is cancelled");
    }

    #[tokio::test]
    async fn many_failures_report_exactly_one() {
        let err = run_for_all(vec!["a", "b", "c"], |_, name| async move {
            Err::<(), _>(boom(name))
        })
        .await
        .unwrap_err();
        let message = err.to_string();
        assert!(["a", "b", "c"].iter().any(|n| message.ends_with(n)), "{message}");
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let err = run_for_all(vec![0, 1], |_, n| async move {
            if n == 1 {
                panic!("task blew up");
            }
            Ok::<_, SyncError>(n)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, SyncError::TaskFailed(_)));
    }
}
