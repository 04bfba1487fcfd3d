//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).
//!
//! An `Observer` on its own promises nothing about call order. Every
//! `subscribe` wraps the observer in a [`Subscriber`], which guarantees that
//! at most one terminal notification reaches it and nothing after that.
//!
//! [`Subscriber`]: crate::subscriber::Subscriber

use std::fmt::Debug;

use crate::rc::{MutRc, RcDeref, RcDerefMut};

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable. No notification follows.
  fn error(&mut self, err: Err);

  /// Handle completion of the observable. No notification follows.
  fn complete(&mut self);

  /// Checks if the observer is closed.
  ///
  /// Sources such as `from_iter` poll this to stop emitting early once the
  /// downstream went away.
  fn is_closed(&self) -> bool { false }
}

/// Boxed value observer (single-threaded).
pub type BoxedObserver<'a, Item, Err> = Box<dyn Observer<Item, Err> + 'a>;

impl<Item, Err, O> Observer<Item, Err> for Box<O>
where
  O: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

// ============================================================================
// Notification
// ============================================================================

/// The three notification kinds as one tagged value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Complete,
}

impl<Item, Err> Notification<Item, Err> {
  /// Delivers this notification into `observer`.
  pub fn observe<O>(self, observer: &mut O)
  where
    O: Observer<Item, Err> + ?Sized,
  {
    match self {
      Notification::Next(v) => observer.next(v),
      Notification::Error(e) => observer.error(e),
      Notification::Complete => observer.complete(),
    }
  }

  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Notification::Next(_)) }

  pub fn map<U>(self, f: impl FnOnce(Item) -> U) -> Notification<U, Err> {
    match self {
      Notification::Next(v) => Notification::Next(f(v)),
      Notification::Error(e) => Notification::Error(e),
      Notification::Complete => Notification::Complete,
    }
  }
}

/// A sink that receives every notification through one tagged callback.
pub struct NotificationObserver<F>(pub F);

impl<Item, Err, F> Observer<Item, Err> for NotificationObserver<F>
where
  F: FnMut(Notification<Item, Err>),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(Notification::Next(value)) }

  #[inline]
  fn error(&mut self, err: Err) { (self.0)(Notification::Error(err)) }

  #[inline]
  fn complete(&mut self) { (self.0)(Notification::Complete) }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Reports an error that reached a subscriber without an error handler.
///
/// Errors are never swallowed: the error is logged and then raised as a
/// panic on the thread that delivered it.
#[track_caller]
pub(crate) fn unhandled_error<Err: Debug>(err: Err) -> ! {
  tracing::error!(error = ?err, "unhandled error notification");
  panic!("unhandled error in observable: {err:?}");
}

/// Closure as `next` handler.
///
/// Completion is ignored; an error is unhandled and fails loudly.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<F, Item, Err> Observer<Item, Err> for FnMutObserver<F>
where
  F: FnMut(Item),
  Err: Debug,
{
  #[inline]
  fn next(&mut self, v: Item) { (self.0)(v); }

  fn error(&mut self, err: Err) { unhandled_error(err) }

  #[inline]
  fn complete(&mut self) {}
}

/// `next` + `error` handlers.
pub struct ObserverErr<N, E> {
  next: N,
  error: Option<E>,
}

impl<N, E> ObserverErr<N, E> {
  pub fn new(next: N, error: E) -> Self { Self { next, error: Some(error) } }
}

impl<Item, Err, N, E> Observer<Item, Err> for ObserverErr<N, E>
where
  N: FnMut(Item),
  E: FnOnce(Err),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) {
    if let Some(error) = self.error.take() {
      error(err)
    }
  }

  #[inline]
  fn complete(&mut self) { self.error = None; }

  fn is_closed(&self) -> bool { self.error.is_none() }
}

/// `next` + `complete` handlers; an error fails loudly.
pub struct ObserverComp<N, C> {
  next: N,
  complete: Option<C>,
}

impl<N, C> ObserverComp<N, C> {
  pub fn new(next: N, complete: C) -> Self { Self { next, complete: Some(complete) } }
}

impl<Item, Err, N, C> Observer<Item, Err> for ObserverComp<N, C>
where
  N: FnMut(Item),
  C: FnOnce(),
  Err: Debug,
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) {
    self.complete = None;
    unhandled_error(err)
  }

  fn complete(&mut self) {
    if let Some(complete) = self.complete.take() {
      complete()
    }
  }

  fn is_closed(&self) -> bool { self.complete.is_none() }
}

/// Positional `next`, `error` and `complete` handlers.
pub struct ObserverAll<N, E, C> {
  next: N,
  terminal: Option<(E, C)>,
}

impl<N, E, C> ObserverAll<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self {
    Self { next, terminal: Some((error, complete)) }
  }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) {
    if let Some((error, _)) = self.terminal.take() {
      error(err)
    }
  }

  fn complete(&mut self) {
    if let Some((_, complete)) = self.terminal.take() {
      complete()
    }
  }

  fn is_closed(&self) -> bool { self.terminal.is_none() }
}

// ============================================================================
// Observer implementations for Option and shared Option wrappers
// ============================================================================

/// Option observer - None ignores all events, Some delegates to inner
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(inner) = self {
      inner.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut inner) = self.take() {
      inner.error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(mut inner) = self.take() {
      inner.complete();
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().is_none_or(Observer::<Item, Err>::is_closed) }
}

/// Shared ownership observer.
///
/// Terminal notifications `take()` the inner observer so every clone observes
/// the stop. The inner observer is called outside of the borrow.
impl<O, Item, Err> Observer<Item, Err> for MutRc<Option<O>>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.rc_deref_mut().next(value); }

  fn error(&mut self, err: Err) {
    let inner = self.rc_deref_mut().take();
    if let Some(mut inner) = inner {
      inner.error(err);
    }
  }

  fn complete(&mut self) {
    let inner = self.rc_deref_mut().take();
    if let Some(mut inner) = inner {
      inner.complete();
    }
  }

  fn is_closed(&self) -> bool {
    self
      .rc_deref()
      .as_ref()
      .is_none_or(Observer::<Item, Err>::is_closed)
  }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;

  struct TestObserver {
    values: Vec<i32>,
    done: bool,
  }

  impl Observer<i32, ()> for TestObserver {
    fn next(&mut self, value: i32) { self.values.push(value); }

    fn error(&mut self, _: ()) { self.done = true; }

    fn complete(&mut self) { self.done = true; }

    fn is_closed(&self) -> bool { self.done }
  }

  #[test]
  fn test_observer_trait() {
    let mut obs = TestObserver { values: vec![], done: false };
    obs.next(1);
    obs.next(2);
    assert_eq!(obs.values, vec![1, 2]);
    assert!(!obs.is_closed());
  }

  #[test]
  fn test_closure_as_observer() {
    let mut count = 0;
    let mut closure_obs = FnMutObserver(|v: i32| {
      count += v;
    });

    Observer::<i32, ()>::next(&mut closure_obs, 10);
    Observer::<i32, ()>::next(&mut closure_obs, 20);
    assert_eq!(count, 30);
  }

  #[test]
  #[should_panic(expected = "unhandled error")]
  fn test_unhandled_error_is_loud() {
    let mut obs = FnMutObserver(|_: i32| {});
    Observer::<i32, &str>::error(&mut obs, "boom");
  }

  #[test]
  fn test_notification_observer_tags_kinds() {
    let log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    let mut obs =
      NotificationObserver(move |n: Notification<i32, String>| c_log.borrow_mut().push(n));
    obs.next(1);
    obs.complete();
    assert_eq!(*log.borrow(), vec![Notification::Next(1), Notification::Complete]);
  }

  #[test]
  fn test_notification_observe() {
    let mut obs = TestObserver { values: vec![], done: false };
    Notification::<i32, ()>::Next(5).observe(&mut obs);
    Notification::<i32, ()>::Complete.observe(&mut obs);
    assert_eq!(obs.values, vec![5]);
    assert!(obs.is_closed());
  }

  #[test]
  fn test_observer_all_runs_one_terminal() {
    let hits = Rc::new(RefCell::new(vec![]));
    let (h1, h2) = (hits.clone(), hits.clone());
    let mut obs = ObserverAll::new(
      |_: i32| {},
      move |e: &str| h1.borrow_mut().push(e.to_string()),
      move || h2.borrow_mut().push("complete".to_string()),
    );
    obs.complete();
    obs.error("late");
    assert_eq!(*hits.borrow(), vec!["complete"]);
    assert!(Observer::<i32, &str>::is_closed(&obs));
  }

  #[test]
  fn test_shared_option_observer_stops_all_clones() {
    let shared = MutRc::own(Some(TestObserver { values: vec![], done: false }));
    let mut clone = shared.clone();
    Observer::<i32, ()>::complete(&mut clone);
    assert!(Observer::<i32, ()>::is_closed(&shared));
  }
}
