use std::{collections::VecDeque, rc::Rc, time::Duration};

use crate::{
  observable::Observable,
  rc::{MutRc, RcDerefMut},
  scheduler::Scheduler,
  subject::{SubjectCore, Terminal},
  subscriber::Subscriber,
};

type Clock = Rc<dyn Fn() -> Duration>;

struct ReplayBuffer<Item> {
  capacity: usize,
  window: Option<(Duration, Clock)>,
  values: VecDeque<(Duration, Item)>,
}

impl<Item: Clone> ReplayBuffer<Item> {
  fn now(&self) -> Duration { self.window.as_ref().map_or(Duration::ZERO, |(_, clock)| clock()) }

  fn push(&mut self, value: Item) {
    let now = self.now();
    self.values.push_back((now, value));
    self.trim(now);
  }

  /// Drops values beyond the capacity and values older than the window.
  fn trim(&mut self, now: Duration) {
    while self.values.len() > self.capacity {
      self.values.pop_front();
    }
    if let Some((window, _)) = &self.window {
      while self
        .values
        .front()
        .is_some_and(|(at, _)| now.saturating_sub(*at) > *window)
      {
        self.values.pop_front();
      }
    }
  }

  fn snapshot(&mut self) -> Vec<Item> {
    let now = self.now();
    self.trim(now);
    self.values.iter().map(|(_, v)| v.clone()).collect()
  }
}

/// A subject that records the values it emits and replays them to new
/// subscribers, also after it stopped.
///
/// The buffer keeps at most `buffer_size` values. With a window, values
/// older than the window (measured on the scheduler's clock) are dropped
/// too.
pub struct ReplaySubject<Item, Err> {
  core: SubjectCore<Item, Err>,
  buffer: MutRc<ReplayBuffer<Item>>,
}

impl<Item, Err> Clone for ReplaySubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone(), buffer: self.buffer.clone() } }
}

impl<Item: Clone + 'static, Err: Clone + 'static> ReplaySubject<Item, Err> {
  /// Replays up to `buffer_size` past values.
  pub fn new(buffer_size: usize) -> Self { Self::build(buffer_size, None) }

  /// Replays every past value.
  pub fn unbounded() -> Self { Self::build(usize::MAX, None) }

  /// Replays up to `buffer_size` past values no older than `window`.
  pub fn with_window(buffer_size: usize, window: Duration, scheduler: impl Scheduler) -> Self {
    let clock: Clock = Rc::new(move || scheduler.now());
    Self::build(buffer_size, Some((window, clock)))
  }

  fn build(capacity: usize, window: Option<(Duration, Clock)>) -> Self {
    Self {
      core: SubjectCore::new(),
      buffer: MutRc::own(ReplayBuffer { capacity, window, values: VecDeque::new() }),
    }
  }

  pub fn next(&self, value: Item) {
    if self.core.is_stopped() {
      return;
    }
    self.buffer.rc_deref_mut().push(value.clone());
    self.core.emit_next(value);
  }

  pub fn error(&self, err: Err) { self.core.stop(Terminal::Error(err)); }

  pub fn complete(&self) { self.core.stop(Terminal::Complete); }

  pub fn is_stopped(&self) -> bool { self.core.is_stopped() }

  pub fn observer_count(&self) -> usize { self.core.observer_count() }

  /// Number of values a subscriber arriving now would receive.
  pub fn buffered_len(&self) -> usize {
    let mut buffer = self.buffer.rc_deref_mut();
    let now = buffer.now();
    buffer.trim(now);
    buffer.values.len()
  }

  pub fn as_observable(&self) -> Observable<Item, Err> {
    let (core, buffer) = (self.core.clone(), self.buffer.clone());
    Observable::new(move |subscriber: Subscriber<Item, Err>| {
      let registered = core.register(&subscriber);
      let replay = buffer.rc_deref_mut().snapshot();
      for value in replay {
        if subscriber.is_closed() {
          break;
        }
        subscriber.next(value);
      }
      if !registered {
        if let Some(terminal) = core.terminal() {
          terminal.deliver(&subscriber);
        }
      }
      Ok(())
    })
  }
}

crate::subject::impl_subject_observable!(ReplaySubject);
