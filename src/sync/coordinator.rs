//! Single-flight coordination for scoped loads.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

use crate::error::FetchError;

type SharedLoad<R> = Shared<BoxFuture<'static, Result<Arc<R>, FetchError>>>;

/// Deduplicates concurrent loads per scope key.
///
/// While a load for a key is outstanding, every further [`request_load`] for
/// the same key attaches to the pending future and observes its outcome,
/// success or failure alike. The registry entry is dropped as soon as the
/// load settles, so a failed load can be retried by the next call; outcomes
/// are never cached here - persisting results is the store's and the status
/// tracker's job.
///
/// [`request_load`]: FetchCoordinator::request_load
pub struct FetchCoordinator<R> {
    in_flight: Arc<Mutex<HashMap<String, SharedLoad<R>>>>,
}

impl<R> FetchCoordinator<R>
where
    R: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `loader` under single-flight semantics for `key`.
    ///
    /// Returns the shared outcome: the value produced by the one underlying
    /// loader invocation, behind an `Arc` so every attached caller receives
    /// the identical result.
    pub async fn request_load<F, Fut>(&self, key: &str, loader: F) -> Result<Arc<R>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let load = {
            let mut in_flight = self.in_flight.lock().expect("in-flight registry poisoned");
            if let Some(pending) = in_flight.get(key) {
                debug!(key, "attaching to in-flight load");
                pending.clone()
            } else {
                let registry = Arc::clone(&self.in_flight);
                let owned_key = key.to_string();
                let fut = loader();
                let load = async move {
                    let result = fut.await.map(Arc::new).map_err(FetchError::from);
                    // Deregister before surfacing the outcome, so the next
                    // request after a failure issues a fresh load.
                    registry
                        .lock()
                        .expect("in-flight registry poisoned")
                        .remove(&owned_key);
                    result
                }
                .boxed()
                .shared();
                in_flight.insert(key.to_string(), load.clone());
                load
            }
        };
        load.await
    }

    /// Number of loads currently outstanding.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .expect("in-flight registry poisoned")
            .len()
    }
}

impl<R> Default for FetchCoordinator<R>
where
    R: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_concurrent_requests_share_one_load() {
        let coordinator = Arc::new(FetchCoordinator::<Vec<i64>>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let coordinator = Arc::clone(&coordinator);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                coordinator
                    .request_load("org1", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(vec![1, 2, 3])
                    })
                    .await
            }));
        }

        let first = handles.remove(0).await.unwrap().unwrap();
        let second = handles.remove(0).await.unwrap().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(*first, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_attached_callers_observe_the_same_failure() {
        let coordinator = Arc::new(FetchCoordinator::<Vec<i64>>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let coordinator = Arc::clone(&coordinator);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                coordinator
                    .request_load("org1", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(anyhow::anyhow!("upstream 500"))
                    })
                    .await
            }));
        }

        let first = handles.remove(0).await.unwrap();
        let second = handles.remove(0).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let first = first.expect_err("load should fail");
        let second = second.expect_err("load should fail");
        assert_eq!(first.message(), second.message());
        assert!(first.message().contains("upstream 500"));
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_by_the_next_request() {
        let coordinator = FetchCoordinator::<Vec<i64>>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = {
            let calls = Arc::clone(&calls);
            coordinator
                .request_load("org1", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::anyhow!("upstream 500"))
                })
                .await
        };
        assert!(failing.is_err());
        assert_eq!(coordinator.in_flight_count(), 0);

        let ok = {
            let calls = Arc::clone(&calls);
            coordinator
                .request_load("org1", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![7])
                })
                .await
                .unwrap()
        };

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*ok, vec![7]);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_share_loads() {
        let coordinator = Arc::new(FetchCoordinator::<Vec<i64>>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        for key in ["org1", "org2"] {
            let calls = Arc::clone(&calls);
            coordinator
                .request_load(key, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1])
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(coordinator.in_flight_count(), 0);
    }
}
