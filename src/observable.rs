//! The lazy push-based stream type and its factories.
//!
//! An [`Observable`] is only a recipe: it stores a subscribe function and runs
//! it again for every subscription, so two subscribers get two independent
//! executions. Nothing happens until `subscribe` is called.
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use rxcore::prelude::*;
//!
//! let collected = Rc::new(RefCell::new(vec![]));
//! let c_collected = collected.clone();
//! observable::from_iter::<_, ()>(1..=3)
//!   .map(|v| v * 10)
//!   .subscribe(move |v| c_collected.borrow_mut().push(v));
//! assert_eq!(*collected.borrow(), vec![10, 20, 30]);
//! ```

use std::{
  fmt::{Debug, Formatter},
  rc::Rc,
};

use crate::{
  observer::{FnMutObserver, Observer, ObserverAll, ObserverComp, ObserverErr},
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionLike, Teardown},
};

mod create;
mod from_future;
mod of;
mod timer;

pub use create::*;
pub use from_future::*;
pub use of::*;
pub use timer::*;

// Static combinators live next to their operators.
pub use crate::ops::{
  combine_latest::combine_latest, concat_map::concat, merge_map::merge, race::race, zip::zip,
};

type SubscribeFn<Item, Err> = dyn Fn(Subscriber<Item, Err>) -> Result<(), Err>;

/// A lazy, push-based sequence of `Item`s that may fail with `Err`.
pub struct Observable<Item, Err> {
  subscribe_fn: Rc<SubscribeFn<Item, Err>>,
}

impl<Item, Err> Clone for Observable<Item, Err> {
  fn clone(&self) -> Self { Self { subscribe_fn: self.subscribe_fn.clone() } }
}

impl<Item, Err> Debug for Observable<Item, Err> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("Observable { .. }") }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Creates an observable from a raw subscribe function.
  ///
  /// The function receives the safe [`Subscriber`] of one execution. An `Err`
  /// returned from it is delivered as an error notification.
  pub fn new(subscribe: impl Fn(Subscriber<Item, Err>) -> Result<(), Err> + 'static) -> Self {
    Self { subscribe_fn: Rc::new(subscribe) }
  }

  /// Starts a new execution delivering into `observer`.
  pub fn subscribe_with(&self, observer: impl Observer<Item, Err> + 'static) -> Subscription {
    let subscriber = Subscriber::new(observer);
    let subscription = subscriber.subscription().clone();
    self.run(subscriber);
    subscription
  }

  /// Starts a new execution owned by `parent`.
  ///
  /// The child subscription is attached before the subscribe function runs,
  /// so a parent closed by a synchronous emission stops the child right away.
  pub(crate) fn subscribe_child(
    &self,
    parent: &Subscription,
    observer: impl Observer<Item, Err> + 'static,
  ) -> Subscription {
    let subscriber = Subscriber::new(observer);
    let subscription = subscriber.subscription().clone();
    parent.add(subscription.clone());
    self.run(subscriber);
    subscription
  }

  /// Runs the subscribe function against an existing subscriber.
  pub(crate) fn run(&self, subscriber: Subscriber<Item, Err>) {
    if let Err(err) = (self.subscribe_fn)(subscriber.clone()) {
      subscriber.error(err);
    }
  }

  /// Subscribes with a `next` handler. An error notification is treated as
  /// unhandled: it is logged and raised as a panic.
  pub fn subscribe(&self, next: impl FnMut(Item) + 'static) -> Subscription
  where
    Err: Debug,
  {
    self.subscribe_with(FnMutObserver(next))
  }

  pub fn subscribe_err(
    &self,
    next: impl FnMut(Item) + 'static,
    error: impl FnOnce(Err) + 'static,
  ) -> Subscription {
    self.subscribe_with(ObserverErr::new(next, error))
  }

  pub fn subscribe_complete(
    &self,
    next: impl FnMut(Item) + 'static,
    complete: impl FnOnce() + 'static,
  ) -> Subscription
  where
    Err: Debug,
  {
    self.subscribe_with(ObserverComp::new(next, complete))
  }

  pub fn subscribe_all(
    &self,
    next: impl FnMut(Item) + 'static,
    error: impl FnOnce(Err) + 'static,
    complete: impl FnOnce() + 'static,
  ) -> Subscription {
    self.subscribe_with(ObserverAll::new(next, error, complete))
  }

  /// Builds a new observable whose executions subscribe this one through an
  /// operator observer.
  ///
  /// `operator` receives the downstream subscriber and returns the observer
  /// that handles upstream notifications. The upstream execution is owned by
  /// the downstream one, so unsubscribing the result cascades upstream.
  pub fn lift<Out, Err2, O>(
    self,
    operator: impl Fn(Subscriber<Out, Err2>) -> O + 'static,
  ) -> Observable<Out, Err2>
  where
    Out: 'static,
    Err2: 'static,
    O: Observer<Item, Err> + 'static,
  {
    Observable::new(move |downstream: Subscriber<Out, Err2>| {
      self.subscribe_child(downstream.subscription(), operator(downstream.clone()));
      Ok(())
    })
  }

  /// Applies a user-defined operator function.
  #[inline]
  pub fn pipe<R>(self, operator: impl FnOnce(Self) -> R) -> R { operator(self) }
}

// ============================================================================
// Conversions
// ============================================================================

/// Anything that can be viewed as an [`Observable`].
pub trait IntoObservable<Item, Err> {
  fn into_observable(self) -> Observable<Item, Err>;
}

impl<Item, Err> IntoObservable<Item, Err> for Observable<Item, Err> {
  #[inline]
  fn into_observable(self) -> Observable<Item, Err> { self }
}

/// A foreign source that only exposes a subscribe capability.
///
/// Wrap it with [`from_subscribable`] to use it wherever an observable is
/// expected. Its notifications still pass through a [`Subscriber`], so a
/// misbehaving source cannot break the notification grammar downstream.
pub trait Subscribable<Item, Err> {
  fn subscribe_observer(
    &self,
    observer: Box<dyn Observer<Item, Err>>,
  ) -> Box<dyn SubscriptionLike>;
}

/// Adapts a [`Subscribable`] into an [`Observable`].
pub fn from_subscribable<Item, Err, S>(source: S) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  S: Subscribable<Item, Err> + 'static,
{
  Observable::new(move |subscriber: Subscriber<Item, Err>| {
    let handle = source.subscribe_observer(Box::new(subscriber.clone()));
    subscriber.add(Teardown::Boxed(handle));
    Ok(())
  })
}
