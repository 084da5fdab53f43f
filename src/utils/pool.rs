use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

/// Run `task` over `inputs` with at most `workers` tasks in flight.
///
/// Workers pull from a shared queue. Result `i` belongs to input `i`; a task
/// that panics leaves `None` in its slot and the rest carry on.
pub async fn run_bounded<I, T, F, Fut>(inputs: Vec<I>, workers: usize, task: F) -> Vec<Option<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let n = inputs.len();
    let mut slots: Vec<Option<T>> = Vec::with_capacity(n);
    slots.resize_with(n, || None);

    if n == 0 {
        return slots;
    }

    let queue = Arc::new(Mutex::new(inputs.into_iter().enumerate().collect::<VecDeque<_>>()));
    let task = Arc::new(task);
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, T)>();

    let n_workers = workers.clamp(1, n);
    let mut handles = Vec::with_capacity(n_workers);

    for _ in 0..n_workers {
        let queue = Arc::clone(&queue);
        let task = Arc::clone(&task);
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let next = queue.lock().await.pop_front();
                let Some((idx, input)) = next else {
                    break;
                };

                match tokio::spawn((*task)(input)).await {
                    Ok(value) => {
                        // Receiver lives until every worker is done
                        let _ = tx.send((idx, value));
                    }
                    Err(e) => {
                        warn!(index = idx, error = %e, "Worker task failed, slot left empty");
                    }
                }
            }
        }));
    }
    drop(tx);

    while let Some((idx, value)) = rx.recv().await {
        slots[idx] = Some(value);
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Worker exited abnormally");
        }
    }

    slots
}
