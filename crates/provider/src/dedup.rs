//! Coalesces concurrent identical requests into one underlying call.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use vantage_core::config::DedupConfig;
use vantage_core::VantageResult;

type SharedCall<T> = Shared<BoxFuture<'static, VantageResult<T>>>;
type Registry<T> = Arc<Mutex<HashMap<String, SharedCall<T>>>>;

/// Singleflight registry keyed by string.
///
/// The first caller for a key starts the work; later callers with the same
/// key await the same shared future and observe the same value or error.
pub struct Deduplicator<T> {
    in_flight: Registry<T>,
    delay: Duration,
}

impl<T> Deduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(config: &DedupConfig) -> Self {
        Self::with_delay(config.coalesce_delay)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            delay,
        }
    }

    /// Runs `thunk` once for all concurrent callers of `key`.
    ///
    /// The thunk starts after the configured delay so callers arriving in the
    /// same tick can join. The registration is dropped before any waiter sees
    /// the outcome.
    pub async fn dedupe<F, Fut>(&self, key: &str, thunk: F) -> VantageResult<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = VantageResult<T>> + Send + 'static,
    {
        let call = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(key) {
                Some(existing) => {
                    tracing::trace!(key, "joining in-flight call");
                    existing.clone()
                }
                None => {
                    let call = Self::spawn_call(
                        Arc::clone(&self.in_flight),
                        key.to_string(),
                        self.delay,
                        thunk,
                    );
                    in_flight.insert(key.to_string(), call.clone());
                    call
                }
            }
        };
        call.await
    }

    /// Number of keys with a call in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn spawn_call<F, Fut>(registry: Registry<T>, key: String, delay: Duration, thunk: F) -> SharedCall<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = VantageResult<T>> + Send + 'static,
    {
        async move {
            let guard = Deregister { registry, key };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = thunk().await;
            drop(guard);
            result
        }
        .boxed()
        .shared()
    }
}

/// Removes the registry entry when the call settles, or if it unwinds.
struct Deregister<T> {
    registry: Registry<T>,
    key: String,
}

impl<T> Drop for Deregister<T> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vantage_core::VantageError;

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_run() {
        let dedup = Arc::new(Deduplicator::with_delay(Duration::from_millis(100)));
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let dedup = Arc::clone(&dedup);
            let runs = Arc::clone(&runs);
            handles.push(tokio::spawn(async move {
                dedup
                    .dedupe("getSlot", move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42u64)
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), Ok(42));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_shared_and_registration_cleared() {
        let dedup = Deduplicator::<u64>::with_delay(Duration::ZERO);
        let runs = Arc::new(AtomicUsize::new(0));

        let make = |runs: Arc<AtomicUsize>| {
            move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(VantageError::Transport("down".into()))
            }
        };

        let (a, b, c) = tokio::join!(
            dedup.dedupe("k", make(Arc::clone(&runs))),
            dedup.dedupe("k", make(Arc::clone(&runs))),
            dedup.dedupe("k", make(Arc::clone(&runs))),
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(a, Err(VantageError::Transport("down".into())));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(dedup.in_flight(), 0);

        // Settled key starts a fresh call.
        let again = dedup.dedupe("k", || async { Ok(7) }).await;
        assert_eq!(again, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_do_not_coalesce() {
        let dedup = Deduplicator::with_delay(Duration::from_millis(100));
        let (a, b) = tokio::join!(
            dedup.dedupe("a", || async { Ok("a") }),
            dedup.dedupe("b", || async { Ok("b") }),
        );
        assert_eq!(a, Ok("a"));
        assert_eq!(b, Ok("b"));
    }
}
