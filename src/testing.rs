//! Marble testing.
//!
//! A marble diagram describes a timed sequence of notifications in ASCII.
//! [`TestScheduler`] turns diagrams into cold or hot observables on a virtual
//! clock, records what an observable under test emits and compares it with an
//! expected diagram. See [`marble`] for the syntax.

pub mod marble;
mod test_scheduler;

pub use marble::{parse_marbles, parse_subscription_marbles, Marbles, SubscriptionLog, TestMessage};
pub use test_scheduler::*;
