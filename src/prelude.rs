// Errors
pub use crate::error::{TeardownError, TimeoutError, UnsubscriptionError};
// Factories, reachable as `observable::of(..)` and friends
pub use crate::observable;
// Core types and traits
pub use crate::observable::{IntoObservable, Observable, Subscribable};
pub use crate::observer::{Notification, NotificationObserver, Observer};
pub use crate::ops::multicast::ConnectableObservable;
// Schedulers
#[cfg(feature = "timer")]
pub use crate::scheduler::{AnimationFrameScheduler, AsyncScheduler, LocalRuntime};
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  Duration, ImmediateScheduler, Instant, QueueScheduler, Recurse, Scheduler, VirtualTimeScheduler,
};
// Subjects
pub use crate::subject::{AsyncSubject, BehaviorSubject, ReplaySubject, Subject};
pub use crate::subscriber::Subscriber;
// Subscription
pub use crate::subscription::{Subscription, SubscriptionGuard, SubscriptionLike, Teardown};
