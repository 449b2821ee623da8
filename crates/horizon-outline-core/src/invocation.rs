//! Queued invocations delivered to the UI thread.
//!
//! Outline state (record trees, tables, undo stacks) is owned by the UI
//! thread and is never touched from anywhere else. Background work hands its
//! results back by posting a closure through a [`UiPoster`]; the UI thread
//! runs those closures with mutable access to its context when it calls
//! [`UiQueue::drain`].
//!
//! # How It Works
//!
//! 1. The UI thread creates a [`UiQueue<C>`] where `C` is its context type.
//! 2. Any thread holding a [`UiPoster<C>`] can post a closure.
//! 3. The UI thread drains the queue at a convenient point of its event loop
//!    and each closure runs with `&mut C`.
//!
//! Closures posted with [`UiPoster::post_for`] are tied to a [`ViewToken`]
//! and are dropped unexecuted when the view closed in the meantime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::{CoreError, Result};
use crate::logging::targets;

/// Global invocation counter for unique IDs.
static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A type-erased closure waiting to run on the UI thread.
pub struct QueuedInvocation<C> {
    id: u64,
    invoke: Box<dyn FnOnce(&mut C) + Send>,
    target: Option<ViewToken>,
}

impl<C> QueuedInvocation<C> {
    /// Create a new queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        Self {
            id: NEXT_INVOCATION_ID.fetch_add(1, Ordering::SeqCst),
            invoke: Box::new(invoke),
            target: None,
        }
    }

    /// Create an invocation that only runs while `target` is alive.
    pub fn for_view<F>(target: ViewToken, invoke: F) -> Self
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        Self {
            target: Some(target),
            ..Self::new(invoke)
        }
    }

    /// The unique ID of this invocation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns false when the invocation targets a view that has closed.
    pub fn is_live(&self) -> bool {
        self.target.as_ref().is_none_or(ViewToken::is_alive)
    }

    /// Execute the invocation. Returns false if it was discarded.
    pub fn execute(self, ctx: &mut C) -> bool {
        if !self.is_live() {
            tracing::debug!(target: targets::QUEUE, id = self.id, "target view closed, discarding invocation");
            return false;
        }
        (self.invoke)(ctx);
        true
    }
}

impl<C> std::fmt::Debug for QueuedInvocation<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedInvocation")
            .field("id", &self.id)
            .field("targeted", &self.target.is_some())
            .finish()
    }
}

/// The receiving end, owned by the UI thread.
pub struct UiQueue<C> {
    sender: Sender<QueuedInvocation<C>>,
    receiver: Receiver<QueuedInvocation<C>>,
}

impl<C> UiQueue<C> {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// Create a queue holding at most `capacity` pending invocations.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Create a handle that other threads use to post work.
    pub fn poster(&self) -> UiPoster<C> {
        UiPoster {
            sender: self.sender.clone(),
        }
    }

    /// Get the number of pending invocations.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Remove every pending invocation without running it.
    ///
    /// Used when the context that would run them is itself borrowed.
    pub fn take_pending(&self) -> Vec<QueuedInvocation<C>> {
        self.receiver.try_iter().collect()
    }

    /// Run every pending invocation against `ctx`.
    ///
    /// Returns the number of invocations that actually executed.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let mut executed = 0;
        for invocation in self.receiver.try_iter() {
            if invocation.execute(ctx) {
                executed += 1;
            }
        }
        if executed > 0 {
            tracing::trace!(target: targets::QUEUE, executed, "drained UI queue");
        }
        executed
    }
}

impl<C> Default for UiQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable, thread-safe handle for posting work to the UI thread.
pub struct UiPoster<C> {
    sender: Sender<QueuedInvocation<C>>,
}

impl<C> Clone for UiPoster<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<C> UiPoster<C> {
    /// Post a closure to run on the UI thread. Returns the invocation ID.
    pub fn post<F>(&self, invoke: F) -> Result<u64>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.send(QueuedInvocation::new(invoke))
    }

    /// Post a closure that is discarded if `target` closes before it runs.
    pub fn post_for<F>(&self, target: ViewToken, invoke: F) -> Result<u64>
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.send(QueuedInvocation::for_view(target, invoke))
    }

    fn send(&self, invocation: QueuedInvocation<C>) -> Result<u64> {
        let id = invocation.id();
        match self.sender.try_send(invocation) {
            Ok(()) => Ok(id),
            Err(TrySendError::Disconnected(_)) => Err(CoreError::QueueClosed),
            Err(TrySendError::Full(invocation)) => {
                // A full bounded queue blocks the poster, never the UI thread.
                self.sender
                    .send(invocation)
                    .map(|()| id)
                    .map_err(|_| CoreError::QueueClosed)
            }
        }
    }
}

/// Keeps a view marked alive until dropped or explicitly closed.
///
/// The view (window, dockable, editor) owns the guard; background work
/// carries [`ViewToken`]s obtained from it.
#[derive(Debug)]
pub struct ViewGuard {
    alive: Arc<AtomicBool>,
}

impl ViewGuard {
    /// Create a guard for a newly opened view.
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a token observing this guard.
    pub fn token(&self) -> ViewToken {
        ViewToken {
            alive: self.alive.clone(),
        }
    }

    /// Mark the view closed.
    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Default for ViewGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ViewGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// A cheap, cloneable observer of a [`ViewGuard`].
#[derive(Debug, Clone)]
pub struct ViewToken {
    alive: Arc<AtomicBool>,
}

impl ViewToken {
    /// Returns true while the originating view is open.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

static_assertions::assert_impl_all!(UiPoster<()>: Send, Sync, Clone);
static_assertions::assert_impl_all!(ViewToken: Send, Sync);
