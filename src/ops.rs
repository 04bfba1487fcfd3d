//! Operators.
//!
//! Every operator is an inherent method on [`Observable`](crate::observable::Observable)
//! defined in its own file. Most of them `lift` the source with a small
//! observer that forwards into the downstream [`Subscriber`](crate::subscriber::Subscriber).
//!
//! The concurrency-coordinating operators multiplex several executions into
//! one output and share the same contract: an error from any inner or outer
//! source errors the output and tears everything else down, unsubscribing the
//! output cascades to every active execution, and the output only completes
//! once the outer source and every active or queued inner have completed.

pub mod combine_latest;
pub mod concat_map;
pub mod delay;
pub mod exhaust_map;
pub mod filter;
pub mod finalize;
pub mod into_future;
pub mod map;
pub mod merge_map;
pub mod multicast;
pub mod observe_on;
pub mod race;
pub mod subscribe_on;
pub mod switch_map;
pub mod take;
pub mod take_until;
pub mod timeout;
pub mod zip;
