//! # rxcore: Reactive Extensions core for Rust
//!
//! Lazy push-based sequences with explicit cancellation, pluggable time and a
//! virtual clock for deterministic tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! observable::from_iter::<_, ()>(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("Value: {}", v));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A cold, lazy producer. Every subscription runs it anew |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` notifications |
//! | [`Subscriber`] | The safe sink that enforces the notification grammar |
//! | [`Subscription`] | Handle to cancel an execution and release its resources |
//! | [`Scheduler`] | Decides when work runs and what time it is |
//! | [`Subject`] | A hot multicast hub, both observer and observable |
//!
//! The whole library is single-threaded: shared state lives in `Rc` and
//! `RefCell`, and concurrency means interleaving tasks on one thread.
//!
//! ## Feature Flags
//!
//! - **`timer`** (default): `AsyncScheduler`, `AnimationFrameScheduler` and
//!   `LocalRuntime`, backed by `futures-time`
//! - **`tokio-scheduler`**: `TokioScheduler` on a tokio `LocalSet`
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Scheduler`]: scheduler::Scheduler
//! [`Subject`]: subject::Subject

pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod testing;

pub use prelude::*;
