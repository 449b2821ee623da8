//! Background task runtime with UI-thread delivery.
//!
//! Long-running I/O (checking a remote library source for updates, for
//! instance) runs on a Tokio runtime owned by [`BackgroundRuntime`]. Results
//! never touch UI state directly: they are posted through a [`UiPoster`] and
//! applied when the UI thread drains its [`crate::UiQueue`].
//!
//! Every delivered task has a deadline. A task that misses it, or whose
//! originating view closed while it ran, is dropped without reaching the UI.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use horizon_outline_core::{BackgroundConfig, BackgroundRuntime, UiQueue, ViewGuard};
//!
//! # async fn fetch_release() -> String { "v5.2".to_string() }
//! let runtime = BackgroundRuntime::new(BackgroundConfig::default()).unwrap();
//! let queue = UiQueue::<Vec<String>>::new();
//! let view = ViewGuard::new();
//!
//! runtime.deliver(
//!     queue.poster(),
//!     view.token(),
//!     Duration::from_secs(10),
//!     fetch_release(),
//!     |releases, found| releases.push(found),
//! );
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::{CoreError, Result};
use crate::invocation::{UiPoster, ViewToken};
use crate::logging::targets;

/// Configuration for the background runtime.
#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    /// Number of worker threads. Defaults to Tokio's choice.
    pub worker_threads: Option<usize>,
    /// Name prefix for runtime threads.
    pub thread_name: String,
    /// Deadline used by [`BackgroundRuntime::deliver_default`].
    pub default_timeout: Duration,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "outline-background".to_string(),
            default_timeout: Duration::from_secs(10),
        }
    }
}

impl BackgroundConfig {
    /// Set the number of worker threads.
    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    /// Set the thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the default delivery deadline.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// What happened to a delivered background result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The result was posted to the UI queue.
    Posted,
    /// The task missed its deadline; nothing was posted.
    TimedOut,
    /// The originating view closed before the result was ready.
    ViewClosed,
    /// The UI queue no longer exists.
    QueueClosed,
}

/// The background runtime.
pub struct BackgroundRuntime {
    runtime: Runtime,
    active_tasks: Arc<AtomicU64>,
    default_timeout: Duration,
}

impl BackgroundRuntime {
    /// Create a new multi-threaded runtime.
    pub fn new(config: BackgroundConfig) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.thread_name(&config.thread_name).enable_time();
        if let Some(workers) = config.worker_threads {
            builder.worker_threads(workers);
        }
        let runtime = builder
            .build()
            .map_err(|e| CoreError::runtime(e.to_string()))?;
        tracing::debug!(target: targets::BACKGROUND, thread_name = %config.thread_name, "background runtime started");
        Ok(Self {
            runtime,
            active_tasks: Arc::new(AtomicU64::new(0)),
            default_timeout: config.default_timeout,
        })
    }

    /// Get a handle to the Tokio runtime.
    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Get the number of tasks still running.
    pub fn active_tasks(&self) -> u64 {
        self.active_tasks.load(Ordering::Acquire)
    }

    /// The default deadline for [`deliver_default`](Self::deliver_default).
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Block the calling (non-runtime) thread on a future.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Run `future` with a deadline, returning its output or a timeout error.
    pub fn spawn_with_timeout<F, T>(&self, timeout: Duration, future: F) -> JoinHandle<Result<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let active_tasks = self.active_tasks.clone();
        active_tasks.fetch_add(1, Ordering::AcqRel);
        self.runtime.spawn(async move {
            let result = tokio::time::timeout(timeout, future)
                .await
                .map_err(|_| CoreError::Timeout(timeout));
            active_tasks.fetch_sub(1, Ordering::AcqRel);
            result
        })
    }

    /// Run `future` in the background and hand its output to `deliver` on
    /// the UI thread.
    ///
    /// The output is dropped if the deadline passes first or `target` closes
    /// before delivery. `deliver` itself runs only when the UI thread drains
    /// its queue, and is skipped there too if the view closed in between.
    pub fn deliver<C, F, T, D>(
        &self,
        poster: UiPoster<C>,
        target: ViewToken,
        timeout: Duration,
        future: F,
        deliver: D,
    ) -> JoinHandle<DeliveryOutcome>
    where
        C: 'static,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        D: FnOnce(&mut C, T) + Send + 'static,
    {
        let active_tasks = self.active_tasks.clone();
        active_tasks.fetch_add(1, Ordering::AcqRel);
        self.runtime.spawn(async move {
            let outcome = match tokio::time::timeout(timeout, future).await {
                Err(_) => {
                    tracing::warn!(target: targets::BACKGROUND, ?timeout, "background task timed out, discarding");
                    DeliveryOutcome::TimedOut
                }
                Ok(_) if !target.is_alive() => {
                    tracing::debug!(target: targets::BACKGROUND, "view closed, discarding background result");
                    DeliveryOutcome::ViewClosed
                }
                Ok(value) => match poster.post_for(target, move |ctx| deliver(ctx, value)) {
                    Ok(_) => DeliveryOutcome::Posted,
                    Err(_) => DeliveryOutcome::QueueClosed,
                },
            };
            active_tasks.fetch_sub(1, Ordering::AcqRel);
            outcome
        })
    }

    /// [`deliver`](Self::deliver) using the configured default deadline.
    pub fn deliver_default<C, F, T, D>(
        &self,
        poster: UiPoster<C>,
        target: ViewToken,
        future: F,
        deliver: D,
    ) -> JoinHandle<DeliveryOutcome>
    where
        C: 'static,
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        D: FnOnce(&mut C, T) + Send + 'static,
    {
        self.deliver(poster, target, self.default_timeout, future, deliver)
    }
}

impl std::fmt::Debug for BackgroundRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRuntime")
            .field("active_tasks", &self.active_tasks())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
