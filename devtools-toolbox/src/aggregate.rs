//! Bounded concurrent fan-out over independent lookups.
//!
//! [`aggregate`] spawns one task per target, admits at most `K` of them into
//! their resolver at a time, and joins every task handle before returning.
//! Each target therefore yields exactly one [`ItemResult`]: resolver errors,
//! panics and cancellations all become per-item failures.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{AggregateResult, ItemResult};

/// Cancellation and deadline shared by every item of one aggregate run.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    cancel: CancellationToken,
    deadline: Option<tokio::time::Instant>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(tokio::time::Instant::now() + timeout),
        }
    }

    /// Context driven by an externally owned token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<tokio::time::Instant> {
        self.deadline
    }

    /// Cancel this context when the returned guard is dropped.
    ///
    /// Request handlers hold the guard so that a dropped request stops its
    /// spawned items.
    #[must_use]
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    /// Run `fut` until it completes, the token fires, or the deadline passes.
    pub async fn guard<F, T>(&self, fut: F) -> ToolboxResult<T>
    where
        F: Future<Output = ToolboxResult<T>>,
    {
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ToolboxError::Cancelled),
            () = expired => Err(ToolboxError::Timeout("shared deadline expired".to_string())),
            result = fut => result,
        }
    }
}

/// Turns one target into a payload.
///
/// Implementations must be safe to call concurrently and should wrap their
/// I/O in [`ResolveContext::guard`].
#[async_trait]
pub trait Resolver<T: Send>: Send + Sync {
    async fn resolve(&self, target: &str, ctx: &ResolveContext) -> ToolboxResult<T>;
}

/// Admission limit for an aggregate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// At most this many resolver calls in flight. Zero is treated as one.
    Bounded(usize),
    /// Every target is admitted at once; only for small, fixed target sets.
    Unbounded,
}

/// Resolve every target concurrently and collect one outcome per target.
///
/// Results keep submission order. The call itself never fails; `duration_ms`
/// spans from dispatch to the last collected outcome.
pub async fn aggregate<T>(
    targets: Vec<String>,
    concurrency: Concurrency,
    resolver: Arc<dyn Resolver<T>>,
    ctx: &ResolveContext,
) -> AggregateResult<T>
where
    T: Send + 'static,
{
    let started = Instant::now();
    let admission = match concurrency {
        Concurrency::Bounded(limit) => Some(Arc::new(Semaphore::new(limit.max(1)))),
        Concurrency::Unbounded => None,
    };

    log::debug!(
        "Dispatching {} target(s) with {:?} concurrency",
        targets.len(),
        concurrency
    );

    let tasks: Vec<_> = targets
        .into_iter()
        .map(|target| {
            let resolver = Arc::clone(&resolver);
            let admission = admission.clone();
            let ctx = ctx.clone();
            let item = target.clone();
            let handle = tokio::spawn(async move {
                // Held until the task ends, including on panic.
                let _permit = match admission {
                    Some(semaphore) => Some(
                        ctx.guard(async {
                            semaphore.acquire_owned().await.map_err(|_| {
                                ToolboxError::Internal("admission semaphore closed".to_string())
                            })
                        })
                        .await?,
                    ),
                    None => None,
                };
                resolver.resolve(&item, &ctx).await
            });
            (target, handle)
        })
        .collect();

    let results = join_all(tasks.into_iter().map(|(target, handle)| async move {
        match handle.await {
            Ok(Ok(payload)) => ItemResult::success(target, payload),
            Ok(Err(e)) => {
                log::debug!("Lookup for {target} failed: {e}");
                ItemResult::failure(target, e.to_string())
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    "resolver panicked"
                } else {
                    "resolver task was cancelled"
                };
                log::warn!("Lookup for {target} aborted: {reason}");
                ItemResult::failure(target, reason)
            }
        }
    }))
    .await;

    let duration_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let aggregate = AggregateResult::from_results(results, duration_ms);
    log::debug!(
        "Aggregate finished: {} ok, {} failed in {:.1}ms",
        aggregate.summary.successful,
        aggregate.summary.failed,
        duration_ms
    );
    aggregate
}
