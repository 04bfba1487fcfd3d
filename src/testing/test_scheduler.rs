use std::time::Duration;

use crate::{
  error::MarbleError,
  observable::{IntoObservable, Observable},
  observer::NotificationObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  scheduler::{Scheduler, Task, VirtualTimeScheduler},
  subject::Subject,
  subscriber::Subscriber,
  subscription::{dispose, Subscription},
  testing::marble::{
    parse_marbles, parse_subscription_marbles, SubscriptionLog, TestMessage,
  },
};

type Check = Box<dyn FnOnce()>;

/// A virtual-time scheduler that builds observables from marble diagrams and
/// checks recorded notifications against them.
///
/// Expectations are registered up front and asserted by
/// [`flush`](TestScheduler::flush), which panics on the first mismatch.
///
/// ```
/// use rxcore::{prelude::*, testing::TestScheduler};
///
/// let ts = TestScheduler::new();
/// let source = ts.cold("-a-b-|", &[('a', 1), ('b', 2)], None::<()>).unwrap();
/// ts.expect_observable(source.observable().map(|v| v * 10))
///   .to_be("-a-b-|", &[('a', 10), ('b', 20)], None)
///   .unwrap();
/// ts.expect_subscriptions(&source).to_be(&["^----!"]).unwrap();
/// ts.flush();
/// ```
#[derive(Clone, Default)]
pub struct TestScheduler {
  scheduler: VirtualTimeScheduler,
  checks: MutRc<Vec<Check>>,
}

/// An observable scripted by a marble diagram, with the log of every
/// subscription made to it.
pub struct TestObservable<Item, Err> {
  observable: Observable<Item, Err>,
  subscriptions: MutRc<Vec<SubscriptionLog>>,
}

impl<Item, Err> Clone for TestObservable<Item, Err> {
  fn clone(&self) -> Self {
    Self { observable: self.observable.clone(), subscriptions: self.subscriptions.clone() }
  }
}

impl<Item, Err> TestObservable<Item, Err> {
  pub fn observable(&self) -> Observable<Item, Err> { self.observable.clone() }

  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.subscriptions.rc_deref().clone() }
}

impl<Item, Err> IntoObservable<Item, Err> for TestObservable<Item, Err> {
  fn into_observable(self) -> Observable<Item, Err> { self.observable }
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Stops `flush` after `frames` frames of virtual time.
  pub fn with_max_frames(self, frames: u64) -> Self {
    Self {
      scheduler: self.scheduler.with_max_frames(Duration::from_millis(frames)),
      checks: self.checks,
    }
  }

  /// The current virtual frame.
  pub fn frame(&self) -> u64 { to_frame(self.scheduler.now()) }

  /// The underlying virtual clock, for code that needs a concrete scheduler.
  pub fn virtual_time(&self) -> &VirtualTimeScheduler { &self.scheduler }

  /// An observable that replays `marbles` from the moment of each
  /// subscription.
  pub fn cold<Item, Err>(
    &self,
    marbles: &str,
    values: &[(char, Item)],
    error: Option<Err>,
  ) -> Result<TestObservable<Item, Err>, MarbleError>
  where
    Item: Clone + 'static,
    Err: Clone + 'static,
  {
    let messages = parse_marbles(marbles, values, error, false)?.messages;
    let subscriptions = MutRc::own(vec![]);
    let c_subscriptions = subscriptions.clone();
    let scheduler = self.scheduler.clone();
    let observable = Observable::new(move |subscriber: Subscriber<Item, Err>| {
      log_subscription(&scheduler, &c_subscriptions, &subscriber);
      for TestMessage { frame, notification } in messages.iter().cloned() {
        let mut sink = subscriber.clone();
        let task: Task = Box::new(move || notification.observe(&mut sink));
        subscriber.add(scheduler.schedule_task(Duration::from_millis(frame), task));
      }
      Ok(())
    });
    Ok(TestObservable { observable, subscriptions })
  }

  /// An observable that plays `marbles` once, starting now, whether anyone is
  /// subscribed or not. `^` marks the frame that counts as now.
  pub fn hot<Item, Err>(
    &self,
    marbles: &str,
    values: &[(char, Item)],
    error: Option<Err>,
  ) -> Result<TestObservable<Item, Err>, MarbleError>
  where
    Item: Clone + 'static,
    Err: Clone + 'static,
  {
    let messages = parse_marbles(marbles, values, error, true)?.messages;
    let subject = Subject::<Item, Err>::new();
    for TestMessage { frame, notification } in messages {
      let mut sink = subject.clone();
      let task: Task = Box::new(move || notification.observe(&mut sink));
      self.scheduler.schedule_task(Duration::from_millis(frame), task);
    }

    let subscriptions = MutRc::own(vec![]);
    let c_subscriptions = subscriptions.clone();
    let scheduler = self.scheduler.clone();
    let observable = Observable::new(move |subscriber: Subscriber<Item, Err>| {
      log_subscription(&scheduler, &c_subscriptions, &subscriber);
      let handle = subject.as_observable().subscribe_with(subscriber.clone());
      subscriber.add(handle);
      Ok(())
    });
    Ok(TestObservable { observable, subscriptions })
  }

  /// Subscribes to `observable` now and records what it emits.
  pub fn expect_observable<Item, Err>(
    &self,
    observable: impl IntoObservable<Item, Err>,
  ) -> ObservableExpectation<'_, Item, Err>
  where
    Item: 'static,
    Err: 'static,
  {
    let actual = MutRc::own(vec![]);
    observable.into_observable().subscribe_with(self.recorder(&actual));
    ObservableExpectation { scheduler: self, actual }
  }

  /// Like [`expect_observable`](Self::expect_observable), but subscribes at
  /// the `^` and unsubscribes at the `!` of `subscription_marbles`.
  pub fn expect_observable_with<Item, Err>(
    &self,
    observable: impl IntoObservable<Item, Err>,
    subscription_marbles: &str,
  ) -> Result<ObservableExpectation<'_, Item, Err>, MarbleError>
  where
    Item: 'static,
    Err: 'static,
  {
    let log = parse_subscription_marbles(subscription_marbles)?;
    let actual = MutRc::own(vec![]);
    let observable = observable.into_observable();
    let subscription = MutRc::own(None::<Subscription>);
    let now = self.frame();

    let (c_subscription, recorder) = (subscription.clone(), self.recorder(&actual));
    self.scheduler.schedule_task(
      Duration::from_millis(log.subscribed.saturating_sub(now)),
      Box::new(move || {
        let handle = observable.subscribe_with(recorder);
        *c_subscription.rc_deref_mut() = Some(handle);
      }),
    );
    if let Some(unsubscribed) = log.unsubscribed {
      self.scheduler.schedule_task(
        Duration::from_millis(unsubscribed.saturating_sub(now)),
        Box::new(move || {
          if let Some(handle) = subscription.rc_deref_mut().take() {
            dispose(&handle, "marble expectation");
          }
        }),
      );
    }
    Ok(ObservableExpectation { scheduler: self, actual })
  }

  /// Prepares a check of the subscription log of `observable`.
  pub fn expect_subscriptions<Item, Err>(
    &self,
    observable: &TestObservable<Item, Err>,
  ) -> SubscriptionExpectation<'_> {
    SubscriptionExpectation { scheduler: self, actual: observable.subscriptions.clone() }
  }

  /// Runs every scheduled action, then asserts every registered expectation.
  ///
  /// # Panics
  ///
  /// When an expectation does not match what was recorded.
  pub fn flush(&self) {
    self.scheduler.flush();
    let checks = std::mem::take(&mut *self.checks.rc_deref_mut());
    for check in checks {
      check();
    }
  }

  fn recorder<Item: 'static, Err: 'static>(
    &self,
    actual: &MutRc<Vec<TestMessage<Item, Err>>>,
  ) -> NotificationObserver<impl FnMut(crate::observer::Notification<Item, Err>)> {
    let scheduler = self.scheduler.clone();
    let actual = actual.clone();
    NotificationObserver(move |notification| {
      let frame = to_frame(scheduler.now());
      actual.rc_deref_mut().push(TestMessage { frame, notification });
    })
  }

  fn add_check(&self, check: impl FnOnce() + 'static) {
    self.checks.rc_deref_mut().push(Box::new(check));
  }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> Duration { self.scheduler.now() }

  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription {
    self.scheduler.schedule_task(delay, task)
  }
}

/// Recorded notifications of one observable under test.
pub struct ObservableExpectation<'a, Item, Err> {
  scheduler: &'a TestScheduler,
  actual: MutRc<Vec<TestMessage<Item, Err>>>,
}

impl<Item, Err> ObservableExpectation<'_, Item, Err>
where
  Item: Clone + PartialEq + std::fmt::Debug + 'static,
  Err: Clone + PartialEq + std::fmt::Debug + 'static,
{
  /// Expects the recorded notifications to equal `marbles`, checked on flush.
  pub fn to_be(
    self,
    marbles: &str,
    values: &[(char, Item)],
    error: Option<Err>,
  ) -> Result<(), MarbleError> {
    let expected = parse_marbles(marbles, values, error, false)?.messages;
    let actual = self.actual;
    let marbles = marbles.to_string();
    self.scheduler.add_check(move || {
      assert_eq!(*actual.rc_deref(), expected, "observable does not match `{marbles}`");
    });
    Ok(())
  }
}

/// Recorded subscriptions of one test observable.
pub struct SubscriptionExpectation<'a> {
  scheduler: &'a TestScheduler,
  actual: MutRc<Vec<SubscriptionLog>>,
}

impl SubscriptionExpectation<'_> {
  /// Expects one subscription per diagram, in subscription order.
  pub fn to_be(self, marbles: &[&str]) -> Result<(), MarbleError> {
    let expected = marbles
      .iter()
      .map(|m| parse_subscription_marbles(m))
      .collect::<Result<Vec<_>, _>>()?;
    let actual = self.actual;
    let marbles = marbles.join(", ");
    self.scheduler.add_check(move || {
      assert_eq!(*actual.rc_deref(), expected, "subscriptions do not match [{marbles}]");
    });
    Ok(())
  }
}

fn to_frame(time: Duration) -> u64 { u64::try_from(time.as_millis()).unwrap_or(u64::MAX) }

fn log_subscription<Item: 'static, Err: 'static>(
  scheduler: &VirtualTimeScheduler,
  log: &MutRc<Vec<SubscriptionLog>>,
  subscriber: &Subscriber<Item, Err>,
) {
  let index = {
    let mut log = log.rc_deref_mut();
    log.push(SubscriptionLog { subscribed: to_frame(scheduler.now()), unsubscribed: None });
    log.len() - 1
  };
  let (scheduler, log) = (scheduler.clone(), log.clone());
  subscriber.add(move || {
    if let Some(entry) = log.rc_deref_mut().get_mut(index) {
      entry.unsubscribed = Some(to_frame(scheduler.now()));
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observable::merge;

  #[test]
  fn cold_replays_per_subscription() {
    let ts = TestScheduler::new();
    let source = ts.cold("-a|", &[('a', 1)], None::<()>).unwrap();
    ts.expect_observable(source.observable()).to_be("-a|", &[('a', 1)], None).unwrap();
    ts.expect_observable_with(source.clone(), "--^")
      .unwrap()
      .to_be("---a|", &[('a', 1)], None)
      .unwrap();
    ts.expect_subscriptions(&source).to_be(&["^-!", "--^-!"]).unwrap();
    ts.flush();
  }

  #[test]
  fn hot_is_shared_and_ignores_late_subscribers_history() {
    let ts = TestScheduler::new();
    let source = ts.hot("-a-^-b-c|", &[('a', 1), ('b', 2), ('c', 3)], None::<()>).unwrap();
    ts.expect_observable(source.observable()).to_be("--b-c|", &[('b', 2), ('c', 3)], None).unwrap();
    ts.expect_observable_with(source.clone(), "--^-!")
      .unwrap()
      .to_be("----c", &[('c', 3)], None)
      .unwrap();
    ts.expect_subscriptions(&source).to_be(&["^----!", "--^-!"]).unwrap();
    ts.flush();
  }

  #[test]
  fn merge_interleaves_by_frame() {
    let ts = TestScheduler::new();
    let a = ts.cold("a---b|", &[('a', 'a'), ('b', 'b')], Some("boom")).unwrap();
    let b = ts.cold("-c-#", &[('c', 'c')], Some("boom")).unwrap();
    ts.expect_observable(merge(vec![a.clone(), b.clone()]))
      .to_be("ac-#", &[('a', 'a'), ('c', 'c')], Some("boom"))
      .unwrap();
    ts.expect_subscriptions(&a).to_be(&["^--!"]).unwrap();
    ts.expect_subscriptions(&b).to_be(&["^--!"]).unwrap();
    ts.flush();
  }

  #[test]
  fn time_operators_run_on_the_test_scheduler() {
    let ts = TestScheduler::new();
    let source = ts.cold("a-b|", &[('a', 1), ('b', 2)], None::<()>).unwrap();
    ts.expect_observable(source.observable().delay(Duration::from_millis(2), ts.clone()))
      .to_be("--a-b|", &[('a', 1), ('b', 2)], None)
      .unwrap();
    ts.flush();
  }

  #[test]
  #[should_panic(expected = "observable does not match")]
  fn mismatch_panics_on_flush() {
    let ts = TestScheduler::new();
    let source = ts.cold("-a|", &[('a', 1)], None::<()>).unwrap();
    ts.expect_observable(source).to_be("a|", &[('a', 1)], None).unwrap();
    ts.flush();
  }

  #[test]
  fn max_frames_cuts_infinite_sources() {
    let ts = TestScheduler::new().with_max_frames(5);
    let ticks = crate::observable::interval::<(), _>(Duration::from_millis(2), ts.clone());
    ts.expect_observable(ticks).to_be("--a-b", &[('a', 0), ('b', 1)], None).unwrap();
    ts.flush();
    assert_eq!(ts.frame(), 4);
  }
}
