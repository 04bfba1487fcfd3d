use std::rc::Rc;

use tracing::debug;

use crate::{
  observable::{IntoObservable, Observable},
  observer::{BoxedObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  subject::Subject,
  subscriber::Subscriber,
  subscription::{dispose, Subscription, SubscriptionLike},
};

type SubjectFactory<Item, Err> = dyn Fn() -> (BoxedObserver<'static, Item, Err>, Observable<Item, Err>);

struct ConnectState<Item, Err> {
  /// Sink of the subject the next connection feeds. Taken by `connect`.
  sink: Option<BoxedObserver<'static, Item, Err>>,
  output: Observable<Item, Err>,
  connection: Option<Subscription>,
}

/// An observable whose source runs once, on demand, for all subscribers.
///
/// Subscribers attach to an inner subject. The source itself is only
/// subscribed by [`connect`](ConnectableObservable::connect).
pub struct ConnectableObservable<Item, Err> {
  source: Observable<Item, Err>,
  factory: Rc<SubjectFactory<Item, Err>>,
  state: MutRc<ConnectState<Item, Err>>,
}

impl<Item, Err> Clone for ConnectableObservable<Item, Err> {
  fn clone(&self) -> Self {
    Self {
      source: self.source.clone(),
      factory: self.factory.clone(),
      state: self.state.clone(),
    }
  }
}

impl<Item: 'static, Err: 'static> ConnectableObservable<Item, Err> {
  fn new(source: Observable<Item, Err>, factory: Rc<SubjectFactory<Item, Err>>) -> Self {
    let (sink, output) = factory();
    let state = MutRc::own(ConnectState { sink: Some(sink), output, connection: None });
    Self { source, factory, state }
  }

  /// Swaps in a fresh subject once the previous connection has ended.
  fn refresh(&self) {
    let stale = {
      let state = self.state.rc_deref();
      state.sink.is_none() && state.connection.as_ref().is_none_or(|c| c.is_closed())
    };
    if stale {
      let (sink, output) = (self.factory)();
      let mut state = self.state.rc_deref_mut();
      state.sink = Some(sink);
      state.output = output;
      state.connection = None;
    }
  }

  fn output(&self) -> Observable<Item, Err> {
    self.refresh();
    self.state.rc_deref().output.clone()
  }

  /// Subscribes the source into the subject. Calling it while connected
  /// returns the running connection.
  pub fn connect(&self) -> Subscription {
    self.refresh();
    let sink = {
      let mut state = self.state.rc_deref_mut();
      if let Some(connection) = state.connection.as_ref().filter(|c| !c.is_closed()) {
        return connection.clone();
      }
      state.sink.take()
    };
    let Some(sink) = sink else {
      return Subscription::closed();
    };
    let subscriber = Subscriber::new(sink);
    let connection = subscriber.subscription().clone();
    self.state.rc_deref_mut().connection = Some(connection.clone());
    debug!("connectable observable connected");
    self.source.run(subscriber);
    connection
  }

  /// Ends the running connection, if any. Subscribers stay attached to the
  /// subject but receive nothing until the next `connect`.
  pub fn disconnect(&self) {
    let connection = self.state.rc_deref_mut().connection.take();
    if let Some(connection) = connection {
      debug!("connectable observable disconnected");
      dispose(&connection, "connectable connection");
    }
  }

  /// True while a connection is running.
  pub fn is_connected(&self) -> bool {
    self.state.rc_deref().connection.as_ref().is_some_and(|c| !c.is_closed())
  }

  /// Connects on the first subscriber and disconnects when the last one
  /// unsubscribes.
  pub fn ref_count(&self) -> Observable<Item, Err> {
    let connectable = self.clone();
    let count = MutRc::own(0usize);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let first = {
        let mut count = count.rc_deref_mut();
        *count += 1;
        *count == 1
      };
      connectable.output().run(downstream.clone());

      let c_count = count.clone();
      let c_connectable = connectable.clone();
      downstream.add(move || {
        let last = {
          let mut count = c_count.rc_deref_mut();
          *count -= 1;
          *count == 0
        };
        if last {
          c_connectable.disconnect();
        }
      });

      if first && !downstream.is_closed() {
        connectable.connect();
      }
      Ok(())
    })
  }

  pub fn as_observable(&self) -> Observable<Item, Err> {
    let connectable = self.clone();
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      connectable.output().run(downstream);
      Ok(())
    })
  }

  pub fn subscribe_with(&self, observer: impl Observer<Item, Err> + 'static) -> Subscription {
    self.as_observable().subscribe_with(observer)
  }
}

impl<Item: 'static, Err: 'static> IntoObservable<Item, Err> for ConnectableObservable<Item, Err> {
  fn into_observable(self) -> Observable<Item, Err> { self.as_observable() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Shares one execution of this observable through `subject`.
  ///
  /// Every connection feeds the same subject, so once it has stopped later
  /// subscribers only get its terminal notification.
  pub fn multicast<S>(self, subject: S) -> ConnectableObservable<Item, Err>
  where
    S: Observer<Item, Err> + IntoObservable<Item, Err> + Clone + 'static,
  {
    self.multicast_with(move || subject.clone())
  }

  /// Like [`multicast`](Self::multicast), but every new connection gets a
  /// fresh subject from `factory`.
  pub fn multicast_with<S, F>(self, factory: F) -> ConnectableObservable<Item, Err>
  where
    S: Observer<Item, Err> + IntoObservable<Item, Err> + Clone + 'static,
    F: Fn() -> S + 'static,
  {
    let factory: Rc<SubjectFactory<Item, Err>> = Rc::new(move || {
      let subject = factory();
      (Box::new(subject.clone()) as BoxedObserver<'static, Item, Err>, subject.into_observable())
    });
    ConnectableObservable::new(self, factory)
  }
}

impl<Item: Clone + 'static, Err: Clone + 'static> Observable<Item, Err> {
  /// `multicast` through a plain [`Subject`].
  pub fn publish(self) -> ConnectableObservable<Item, Err> { self.multicast(Subject::new()) }

  /// Shares one execution among all concurrent subscribers. The source is
  /// subscribed with the first subscriber, unsubscribed with the last, and
  /// subscribed again for the next one.
  pub fn share(self) -> Observable<Item, Err> { self.multicast_with(Subject::new).ref_count() }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use crate::{
    observable::{create, from_iter},
    subject::{ReplaySubject, Subject},
    subscriber::Subscriber,
    subscription::SubscriptionLike,
  };

  fn counting_source(
    count: Rc<RefCell<usize>>,
    source: Subject<i32, ()>,
  ) -> crate::observable::Observable<i32, ()> {
    create(move |s: Subscriber<i32, ()>| {
      *count.borrow_mut() += 1;
      let handle = source.as_observable().subscribe_with(s.clone());
      s.add(handle);
    })
  }

  #[test]
  fn connect_starts_the_shared_execution() {
    let seen = Rc::new(RefCell::new(vec![]));
    let (a, b) = (seen.clone(), seen.clone());
    let connectable = from_iter::<_, ()>(1..=2).publish();
    connectable.as_observable().subscribe(move |v| a.borrow_mut().push(("a", v)));
    connectable.as_observable().subscribe(move |v| b.borrow_mut().push(("b", v)));
    assert!(seen.borrow().is_empty());

    connectable.connect();
    assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
  }

  #[test]
  fn disconnect_unsubscribes_source() {
    let upstream = Subject::<i32, ()>::new();
    let count = Rc::new(RefCell::new(0));
    let connectable = counting_source(count.clone(), upstream.clone()).publish();
    let connection = connectable.connect();
    assert!(connectable.connect().ptr_eq(&connection));
    assert_eq!(*count.borrow(), 1);
    assert_eq!(upstream.observer_count(), 1);
    connectable.disconnect();
    assert!(connection.is_closed());
    assert_eq!(upstream.observer_count(), 0);
  }

  #[test]
  fn ref_count_follows_subscribers() {
    let upstream = Subject::<i32, ()>::new();
    let count = Rc::new(RefCell::new(0));
    let shared = counting_source(count.clone(), upstream.clone()).share();

    let seen = Rc::new(RefCell::new(vec![]));
    let (a, b) = (seen.clone(), seen.clone());
    let first = shared.subscribe(move |v| a.borrow_mut().push(("a", v)));
    let second = shared.subscribe(move |v| b.borrow_mut().push(("b", v)));
    assert_eq!(*count.borrow(), 1);
    upstream.next(1);
    assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1)]);

    first.unsubscribe().unwrap();
    assert_eq!(upstream.observer_count(), 1);
    second.unsubscribe().unwrap();
    assert_eq!(upstream.observer_count(), 0);

    let _third = shared.subscribe(|_| {});
    assert_eq!(*count.borrow(), 2);
    assert_eq!(upstream.observer_count(), 1);
  }

  #[test]
  fn multicast_through_replay_subject() {
    let connectable = from_iter::<_, ()>(1..=3).multicast(ReplaySubject::new(2));
    connectable.connect();
    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    connectable.as_observable().subscribe(move |v| c_seen.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![2, 3]);
  }
}
