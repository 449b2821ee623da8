//! Core systems for Horizon Outline.
//!
//! This crate provides the thread-aware plumbing underneath the outline
//! table controller:
//!
//! - **Signal/Slot System**: Change notifications for tables and undo stacks
//! - **UI Queue**: Posting closures from any thread to the UI thread
//! - **View Liveness**: Guards and tokens that let late results be dropped
//! - **Background Runtime**: Tokio tasks with deadlines and UI delivery
//! - **Logging**: Tracing targets, span names and tree dumps
//!
//! # Example
//!
//! ```
//! use horizon_outline_core::{Signal, UiQueue};
//!
//! let changed = Signal::<()>::new();
//! changed.connect(|_| println!("changed"));
//! changed.emit(());
//!
//! let queue = UiQueue::<u32>::new();
//! let poster = queue.poster();
//! std::thread::spawn(move || {
//!     let _ = poster.post(|count| *count += 1);
//! })
//! .join()
//! .unwrap();
//!
//! let mut count = 0;
//! queue.drain(&mut count);
//! assert_eq!(count, 1);
//! ```

pub mod async_runtime;
mod error;
pub mod invocation;
pub mod logging;
pub mod signal;

pub use async_runtime::{BackgroundConfig, BackgroundRuntime, DeliveryOutcome};
pub use error::{CoreError, Result, SignalError};
pub use invocation::{QueuedInvocation, UiPoster, UiQueue, ViewGuard, ViewToken};
pub use logging::{PerfSpan, TreeDump, TreeFormatOptions, TreeSource, TreeStyle};
pub use signal::{ConnectionId, Signal};
