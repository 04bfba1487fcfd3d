use std::{collections::VecDeque, rc::Rc};

use crate::{
  observable::{from_iter, IntoObservable, Observable},
  observer::Observer,
  rc::{MutRc, RcDerefMut},
  subscriber::Subscriber,
};

struct MergeState<Item> {
  active: usize,
  buffer: VecDeque<Item>,
  outer_done: bool,
  draining: bool,
}

/// Shared context of one `merge_map` execution.
pub struct MergeMap<Item, Out, Err, F> {
  downstream: Subscriber<Out, Err>,
  project: Rc<F>,
  concurrent: usize,
  state: MutRc<MergeState<Item>>,
}

impl<Item, Out, Err, F> Clone for MergeMap<Item, Out, Err, F> {
  fn clone(&self) -> Self {
    Self {
      downstream: self.downstream.clone(),
      project: self.project.clone(),
      concurrent: self.concurrent,
      state: self.state.clone(),
    }
  }
}

impl<Item, Out, Err, F, S> MergeMap<Item, Out, Err, F>
where
  Item: 'static,
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> S + 'static,
  S: IntoObservable<Out, Err>,
{
  /// Starts buffered inners while there is room, then checks for completion.
  ///
  /// Runs as a loop guarded by `draining`: an inner that completes
  /// synchronously while being started only frees its slot and the loop
  /// picks up the next buffered value.
  fn drain(&self) {
    {
      let mut state = self.state.rc_deref_mut();
      if state.draining {
        return;
      }
      state.draining = true;
    }
    loop {
      let next = {
        let mut state = self.state.rc_deref_mut();
        if self.downstream.is_closed() || state.active >= self.concurrent {
          None
        } else {
          let next = state.buffer.pop_front();
          if next.is_some() {
            state.active += 1;
          }
          next
        }
      };
      let Some(value) = next else { break };
      let inner = (self.project)(value).into_observable();
      inner.subscribe_child(self.downstream.subscription(), MergeInner(self.clone()));
    }
    let done = {
      let mut state = self.state.rc_deref_mut();
      state.draining = false;
      state.outer_done && state.active == 0 && state.buffer.is_empty()
    };
    if done {
      self.downstream.complete();
    }
  }
}

impl<Item, Out, Err, F, S> Observer<Item, Err> for MergeMap<Item, Out, Err, F>
where
  Item: 'static,
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> S + 'static,
  S: IntoObservable<Out, Err>,
{
  fn next(&mut self, value: Item) {
    self.state.rc_deref_mut().buffer.push_back(value);
    self.drain();
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) {
    self.state.rc_deref_mut().outer_done = true;
    self.drain();
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

/// Observer of one inner execution.
pub struct MergeInner<Item, Out, Err, F>(MergeMap<Item, Out, Err, F>);

impl<Item, Out, Err, F, S> Observer<Out, Err> for MergeInner<Item, Out, Err, F>
where
  Item: 'static,
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> S + 'static,
  S: IntoObservable<Out, Err>,
{
  fn next(&mut self, value: Out) { self.0.downstream.next(value) }

  fn error(&mut self, err: Err) { self.0.downstream.error(err) }

  fn complete(&mut self) {
    self.0.state.rc_deref_mut().active -= 1;
    self.0.drain();
  }

  fn is_closed(&self) -> bool { self.0.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Projects each value to an inner observable and merges their outputs.
  ///
  /// At most `concurrent` inners are subscribed at a time. Further values wait
  /// in a FIFO buffer and are projected when a running inner completes. With
  /// `concurrent == 1` this is [`concat_map`](Self::concat_map).
  pub fn merge_map<Out, S, F>(self, project: F, concurrent: usize) -> Observable<Out, Err>
  where
    Out: 'static,
    S: IntoObservable<Out, Err>,
    F: Fn(Item) -> S + 'static,
  {
    let project = Rc::new(project);
    let concurrent = concurrent.max(1);
    let source = self;
    Observable::new(move |downstream: Subscriber<Out, Err>| {
      let merge = MergeMap {
        downstream: downstream.clone(),
        project: project.clone(),
        concurrent,
        state: MutRc::own(MergeState {
          active: 0,
          buffer: VecDeque::new(),
          outer_done: false,
          draining: false,
        }),
      };
      source.subscribe_child(downstream.subscription(), merge);
      Ok(())
    })
  }

  /// `merge_map` without a concurrency limit.
  pub fn flat_map<Out, S, F>(self, project: F) -> Observable<Out, Err>
  where
    Out: 'static,
    S: IntoObservable<Out, Err>,
    F: Fn(Item) -> S + 'static,
  {
    self.merge_map(project, usize::MAX)
  }

  /// Flattens a higher-order observable, subscribing up to `concurrent`
  /// inners at a time.
  pub fn merge_all<Out>(self, concurrent: usize) -> Observable<Out, Err>
  where
    Out: 'static,
    Item: IntoObservable<Out, Err>,
  {
    self.merge_map(|inner| inner, concurrent)
  }

  /// Merges the values of `other` into this observable.
  pub fn merge_with(self, other: impl IntoObservable<Item, Err>) -> Observable<Item, Err> {
    merge(vec![self, other.into_observable()])
  }
}

/// Subscribes every source at once and emits all of their values. Completes
/// when all of them completed.
pub fn merge<Item, Err, S>(sources: impl IntoIterator<Item = S>) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  S: IntoObservable<Item, Err>,
{
  let sources: Vec<Observable<Item, Err>> = sources.into_iter().map(IntoObservable::into_observable).collect();
  from_iter(sources).merge_all(usize::MAX)
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc, time::Duration};

  use super::*;
  use crate::{
    observable::{of, timer},
    observer::{Notification, NotificationObserver},
    scheduler::{Scheduler, VirtualTimeScheduler},
    subject::Subject,
    subscription::SubscriptionLike,
  };

  type Log<T> = Rc<RefCell<Vec<Notification<T, &'static str>>>>;

  fn record<T: 'static>(source: &Observable<T, &'static str>) -> Log<T> {
    let log: Log<T> = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    source.subscribe_with(NotificationObserver(move |n| c_log.borrow_mut().push(n)));
    log
  }

  #[test]
  fn concurrency_limit_queues_in_fifo_order() {
    let scheduler = VirtualTimeScheduler::new();
    let c_scheduler = scheduler.clone();
    let subscribed = Rc::new(RefCell::new(vec![]));
    let c_subscribed = subscribed.clone();
    let source = from_iter(vec![30u64, 10, 20]).merge_map(
      move |delay| {
        c_subscribed.borrow_mut().push((delay, c_scheduler.now()));
        timer(Duration::from_millis(delay), c_scheduler.clone()).map(move |_| delay)
      },
      1,
    );
    let log = record(&source);
    scheduler.flush();
    assert_eq!(
      *log.borrow(),
      vec![
        Notification::Next(30),
        Notification::Next(10),
        Notification::Next(20),
        Notification::Complete
      ]
    );
    assert_eq!(
      *subscribed.borrow(),
      vec![
        (30, Duration::ZERO),
        (10, Duration::from_millis(30)),
        (20, Duration::from_millis(40)),
      ]
    );
  }

  #[test]
  fn unlimited_merge_interleaves_by_time() {
    let scheduler = VirtualTimeScheduler::new();
    let c_scheduler = scheduler.clone();
    let source = from_iter(vec![30u64, 10, 20]).flat_map(move |delay| {
      timer(Duration::from_millis(delay), c_scheduler.clone()).map(move |_| delay)
    });
    let log = record(&source);
    scheduler.flush();
    assert_eq!(
      *log.borrow(),
      vec![
        Notification::Next(10),
        Notification::Next(20),
        Notification::Next(30),
        Notification::Complete
      ]
    );
  }

  #[test]
  fn waits_for_inners_after_outer_completes() {
    let inner = Subject::<i32, &'static str>::new();
    let c_inner = inner.clone();
    let log = record(&of(()).merge_map(move |_| c_inner.clone(), 2));
    assert!(log.borrow().is_empty());
    inner.next(1);
    inner.complete();
    assert_eq!(*log.borrow(), vec![Notification::Next(1), Notification::Complete]);
  }

  #[test]
  fn inner_error_tears_down_everything() {
    let outer = Subject::<i32, &'static str>::new();
    let a = Subject::<i32, &'static str>::new();
    let b = Subject::<i32, &'static str>::new();
    let (c_a, c_b) = (a.clone(), b.clone());
    let log = record(
      &outer
        .as_observable()
        .merge_map(move |i| if i == 0 { c_a.clone() } else { c_b.clone() }, usize::MAX),
    );
    outer.next(0);
    outer.next(1);
    assert_eq!(a.observer_count() + b.observer_count(), 2);

    a.error("inner failed");
    assert_eq!(*log.borrow(), vec![Notification::Error("inner failed")]);
    assert_eq!(outer.observer_count(), 0);
    assert_eq!(b.observer_count(), 0);
  }

  #[test]
  fn unsubscribe_cascades_to_outer_and_inners() {
    let outer = Subject::<i32, &'static str>::new();
    let inner = Subject::<i32, &'static str>::new();
    let c_inner = inner.clone();
    let subscription = outer
      .as_observable()
      .merge_map(move |_| c_inner.clone(), usize::MAX)
      .subscribe_err(|_| {}, |_| {});
    outer.next(1);
    assert_eq!(inner.observer_count(), 1);
    subscription.unsubscribe().unwrap();
    assert_eq!(outer.observer_count(), 0);
    assert_eq!(inner.observer_count(), 0);
  }

  #[test]
  fn synchronous_inners_do_not_recurse() {
    let seen = Rc::new(RefCell::new(0usize));
    let c_seen = seen.clone();
    from_iter::<_, &'static str>(0..50_000)
      .concat_map(|v| of(v))
      .subscribe_err(move |_| *c_seen.borrow_mut() += 1, |_| {});
    assert_eq!(*seen.borrow(), 50_000);
  }

  #[test]
  fn static_merge_completes_after_all_sources() {
    let log = record(&merge(vec![of(1), of(2)]));
    assert_eq!(
      *log.borrow(),
      vec![Notification::Next(1), Notification::Next(2), Notification::Complete]
    );
  }
}
