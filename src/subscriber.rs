use std::collections::VecDeque;

use crate::{
  error::UnsubscriptionError,
  observer::{BoxedObserver, Notification, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{dispose, Subscription, SubscriptionLike, Teardown, TeardownKey},
};

struct SubscriberState<Item, Err> {
  destination: Option<BoxedObserver<'static, Item, Err>>,
  stopped: bool,
  delivering: bool,
  pending: VecDeque<Notification<Item, Err>>,
}

/// Safe wrapping sink of one execution. Clones share the same state.
///
/// Allows any number of `next`, then at most one `error` or `complete`.
/// A notification that arrives while the observer is still handling the
/// previous one is queued and delivered after the current callback returns.
pub struct Subscriber<Item, Err> {
  state: MutRc<SubscriberState<Item, Err>>,
  subscription: Subscription,
}

impl<Item, Err> Clone for Subscriber<Item, Err> {
  fn clone(&self) -> Self {
    Self { state: self.state.clone(), subscription: self.subscription.clone() }
  }
}

impl<Item: 'static, Err: 'static> Subscriber<Item, Err> {
  /// Wraps `observer` in a fresh execution.
  pub fn new(observer: impl Observer<Item, Err> + 'static) -> Self {
    let state = MutRc::own(SubscriberState {
      destination: Some(Box::new(observer) as BoxedObserver<'static, Item, Err>),
      stopped: false,
      delivering: false,
      pending: VecDeque::new(),
    });
    let subscription = Subscription::new();
    let weak = state.downgrade();
    subscription.add(move || {
      if let Some(state) = weak.upgrade() {
        // Release the observer outside of the borrow, its drop may re-enter.
        let released = state.try_rc_deref_mut().and_then(|mut s| {
          s.stopped = true;
          s.pending.clear();
          s.destination.take()
        });
        drop(released);
      }
    });
    Self { state, subscription }
  }

  #[inline]
  pub fn next(&self, value: Item) { self.emit(Notification::Next(value)) }

  #[inline]
  pub fn error(&self, err: Err) { self.emit(Notification::Error(err)) }

  #[inline]
  pub fn complete(&self) { self.emit(Notification::Complete) }

  /// True once a terminal notification was accepted or the execution was
  /// unsubscribed. Producers use it to stop emitting early.
  pub fn is_closed(&self) -> bool { self.state.rc_deref().stopped || self.subscription.is_closed() }

  /// The resource handle of this execution.
  #[inline]
  pub fn subscription(&self) -> &Subscription { &self.subscription }

  /// Registers a teardown that runs when this execution ends.
  #[inline]
  pub fn add(&self, teardown: impl Into<Teardown>) -> TeardownKey { self.subscription.add(teardown) }

  /// Ends the execution without notifying the observer.
  pub fn unsubscribe(&self) { dispose(&self.subscription, "subscriber") }

  fn emit(&self, notification: Notification<Item, Err>) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.stopped || self.subscription.is_closed() {
        return;
      }
      if notification.is_terminal() {
        state.stopped = true;
      }
      if state.delivering {
        state.pending.push_back(notification);
        return;
      }
      state.delivering = true;
    }

    let guard = DeliveryGuard(&self.state);
    let mut current = Some(notification);
    while let Some(notification) = current {
      self.deliver(notification);
      current = {
        let mut state = self.state.rc_deref_mut();
        let next = state.pending.pop_front();
        if next.is_none() {
          state.delivering = false;
        }
        next
      };
    }
    std::mem::forget(guard);
  }

  fn deliver(&self, notification: Notification<Item, Err>) {
    let destination = self.state.rc_deref_mut().destination.take();
    let Some(mut destination) = destination else {
      return;
    };
    match notification {
      Notification::Next(value) => {
        destination.next(value);
        let released = {
          let mut state = self.state.rc_deref_mut();
          if self.subscription.is_closed() || state.destination.is_some() {
            Some(destination)
          } else {
            state.destination = Some(destination);
            None
          }
        };
        drop(released);
      }
      Notification::Error(err) => {
        destination.error(err);
        drop(destination);
        dispose(&self.subscription, "subscriber error");
      }
      Notification::Complete => {
        destination.complete();
        drop(destination);
        dispose(&self.subscription, "subscriber complete");
      }
    }
  }
}

/// Stops the subscriber when an observer callback unwinds. The observer was
/// moved out for the call and is gone, so nothing can be delivered anymore.
struct DeliveryGuard<'a, Item, Err>(&'a MutRc<SubscriberState<Item, Err>>);

impl<Item, Err> Drop for DeliveryGuard<'_, Item, Err> {
  fn drop(&mut self) {
    if let Some(mut state) = self.0.try_rc_deref_mut() {
      state.delivering = false;
      state.stopped = true;
      state.pending.clear();
    }
  }
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for Subscriber<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { self.emit(Notification::Next(value)) }

  #[inline]
  fn error(&mut self, err: Err) { self.emit(Notification::Error(err)) }

  #[inline]
  fn complete(&mut self) { self.emit(Notification::Complete) }

  #[inline]
  fn is_closed(&self) -> bool { Subscriber::is_closed(self) }
}

impl<Item: 'static, Err: 'static> SubscriptionLike for Subscriber<Item, Err> {
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError> { self.subscription.unsubscribe() }

  fn is_closed(&self) -> bool { Subscriber::is_closed(self) }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::observer::NotificationObserver;

  type Log = Rc<RefCell<Vec<Notification<i32, &'static str>>>>;

  fn recording() -> (Log, Subscriber<i32, &'static str>) {
    let log: Log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    let subscriber = Subscriber::new(NotificationObserver(move |n| c_log.borrow_mut().push(n)));
    (log, subscriber)
  }

  #[test]
  fn nothing_after_terminal() {
    let (log, subscriber) = recording();
    subscriber.next(1);
    subscriber.complete();
    subscriber.next(2);
    subscriber.error("late");
    subscriber.complete();
    assert_eq!(*log.borrow(), vec![Notification::Next(1), Notification::Complete]);
    assert!(subscriber.is_closed());
    assert!(subscriber.subscription().is_closed());
  }

  #[test]
  fn error_releases_resources() {
    let (log, subscriber) = recording();
    let released = Rc::new(RefCell::new(false));
    let c_released = released.clone();
    subscriber.add(move || *c_released.borrow_mut() = true);
    subscriber.error("boom");
    assert_eq!(*log.borrow(), vec![Notification::Error("boom")]);
    assert!(*released.borrow());
  }

  #[test]
  fn unsubscribe_silences_the_observer() {
    let (log, subscriber) = recording();
    subscriber.next(1);
    subscriber.unsubscribe();
    subscriber.next(2);
    subscriber.complete();
    assert_eq!(*log.borrow(), vec![Notification::Next(1)]);
  }

  #[test]
  fn reentrant_notifications_are_queued() {
    let log = Rc::new(RefCell::new(vec![]));
    let slot: Rc<RefCell<Option<Subscriber<i32, ()>>>> = Rc::new(RefCell::new(None));
    let (c_log, c_slot) = (log.clone(), slot.clone());
    let subscriber = Subscriber::new(NotificationObserver(move |n: Notification<i32, ()>| {
      if let Notification::Next(v) = &n {
        if *v == 1 {
          let inner = c_slot.borrow().clone();
          if let Some(inner) = inner {
            inner.next(2);
            inner.complete();
          }
        }
      }
      c_log.borrow_mut().push(n);
    }));
    *slot.borrow_mut() = Some(subscriber.clone());

    subscriber.next(1);
    subscriber.next(3);
    assert_eq!(
      *log.borrow(),
      vec![Notification::Next(1), Notification::Next(2), Notification::Complete]
    );
    slot.borrow_mut().take();
  }

  #[test]
  fn panicking_observer_stops_the_subscriber() {
    let log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    let subscriber = Subscriber::new(NotificationObserver(move |n: Notification<i32, ()>| {
      if n == Notification::Next(0) {
        panic!("observer failure");
      }
      c_log.borrow_mut().push(n);
    }));
    let c_subscriber = subscriber.clone();
    let result =
      std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || c_subscriber.next(0)));
    assert!(result.is_err());
    assert!(subscriber.is_closed());
    subscriber.next(1);
    assert!(log.borrow().is_empty());
  }
}
