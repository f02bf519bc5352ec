//! Single-flight execution with a short result cache.
//!
//! # States
//! ```text
//! Empty ──run──▶ Pending(shared future) ──complete──▶ Done(value, at)
//!   ▲                                                     │
//!   └──────────────── wait window elapsed ────────────────┘
//! ```
//!
//! Callers arriving while `Pending` attach to the same shared future.
//! Callers arriving while `Done` and inside the window get the cached value.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

enum Slot<T> {
    Empty,
    Pending(Shared<BoxFuture<'static, T>>),
    Done { value: T, at: Instant },
}

/// Debounce guard around a single action.
pub struct Single<T> {
    wait: Duration,
    slot: Mutex<Slot<T>>,
}

impl<T> Single<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a guard that caches completed results for `wait`.
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Run `action` unless an execution is in flight or a result is still cached.
    ///
    /// Returns the value and whether it was shared with another caller.
    pub async fn run<F, Fut>(&self, action: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (fut, shared) = {
            let mut slot = self.lock();
            match &*slot {
                Slot::Done { value, at } if at.elapsed() < self.wait => {
                    return (value.clone(), true);
                }
                Slot::Pending(fut) => (fut.clone(), true),
                _ => {
                    let fut = action().boxed().shared();
                    *slot = Slot::Pending(fut.clone());
                    (fut, false)
                }
            }
        };

        let value = fut.clone().await;
        self.complete(&fut, &value);
        (value, shared)
    }

    /// Drop any cached or pending state. In-flight callers still finish.
    pub fn reset(&self) {
        *self.lock() = Slot::Empty;
    }

    /// True while an execution is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(&*self.lock(), Slot::Pending(_))
    }

    fn complete(&self, fut: &Shared<BoxFuture<'static, T>>, value: &T) {
        let mut slot = self.lock();
        // Only the first finisher of this exact execution moves it to Done.
        if let Slot::Pending(current) = &*slot {
            if current.ptr_eq(fut) {
                *slot = Slot::Done {
                    value: value.clone(),
                    at: Instant::now(),
                };
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
