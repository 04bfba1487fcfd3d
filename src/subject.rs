//! Subjects: observables that are also sinks.
//!
//! A subject keeps a list of subscribed observers and fans every notification
//! out to them. The variants differ only in what a *new* subscriber gets:
//!
//! - [`Subject`]: nothing from the past.
//! - [`BehaviorSubject`]: the current value.
//! - [`ReplaySubject`]: up to N buffered values, optionally limited by age.
//! - [`AsyncSubject`]: only the last value, once the subject completes.
//!
//! Once a subject errors or completes it is stopped for good. Later `next`
//! calls are ignored and later subscribers get the terminal notification
//! right away instead of being added to the list.

use smallvec::SmallVec;

use crate::{
  observable::{IntoObservable, Observable},
  rc::{MutRc, RcDeref, RcDerefMut},
  subscriber::Subscriber,
};

mod async_subject;
mod behavior_subject;
mod replay_subject;

pub use async_subject::*;
pub use behavior_subject::*;
pub use replay_subject::*;

// ============================================================================
// Shared observer list
// ============================================================================

/// How a subject stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Terminal<Err> {
  Error(Err),
  Complete,
}

impl<Err> Terminal<Err> {
  pub(crate) fn deliver<Item: 'static>(self, subscriber: &Subscriber<Item, Err>)
  where
    Err: 'static,
  {
    match self {
      Terminal::Error(err) => subscriber.error(err),
      Terminal::Complete => subscriber.complete(),
    }
  }
}

struct Observers<Item, Err> {
  list: SmallVec<[(usize, Subscriber<Item, Err>); 2]>,
  next_id: usize,
  terminal: Option<Terminal<Err>>,
}

/// The observer list and stop state every subject variant is built on.
pub(crate) struct SubjectCore<Item, Err>(MutRc<Observers<Item, Err>>);

impl<Item, Err> Clone for SubjectCore<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item: Clone + 'static, Err: Clone + 'static> SubjectCore<Item, Err> {
  pub(crate) fn new() -> Self {
    Self(MutRc::own(Observers { list: SmallVec::new(), next_id: 0, terminal: None }))
  }

  fn snapshot(&self) -> SmallVec<[Subscriber<Item, Err>; 2]> {
    self.0.rc_deref().list.iter().map(|(_, s)| s.clone()).collect()
  }

  /// Delivers `value` to a snapshot of the current observers.
  pub(crate) fn emit_next(&self, value: Item) {
    if self.is_stopped() {
      return;
    }
    let targets = self.snapshot();
    tracing::trace!(observers = targets.len(), "subject fan-out");
    if let Some((last, rest)) = targets.split_last() {
      for subscriber in rest {
        subscriber.next(value.clone());
      }
      last.next(value);
    }
  }

  /// Stops the subject and notifies every observer. Returns `false` if it was
  /// already stopped.
  pub(crate) fn stop(&self, terminal: Terminal<Err>) -> bool {
    let targets = {
      let mut observers = self.0.rc_deref_mut();
      if observers.terminal.is_some() {
        return false;
      }
      observers.terminal = Some(terminal.clone());
      std::mem::take(&mut observers.list)
    };
    for (_, subscriber) in targets {
      terminal.clone().deliver(&subscriber);
    }
    true
  }

  pub(crate) fn terminal(&self) -> Option<Terminal<Err>> { self.0.rc_deref().terminal.clone() }

  pub(crate) fn is_stopped(&self) -> bool { self.0.rc_deref().terminal.is_some() }

  pub(crate) fn observer_count(&self) -> usize { self.0.rc_deref().list.len() }

  /// Adds `subscriber` to the live list. Returns `false` when the subject is
  /// already stopped and the subscriber was not added.
  pub(crate) fn register(&self, subscriber: &Subscriber<Item, Err>) -> bool {
    let id = {
      let mut observers = self.0.rc_deref_mut();
      if observers.terminal.is_some() {
        return false;
      }
      let id = observers.next_id;
      observers.next_id += 1;
      observers.list.push((id, subscriber.clone()));
      id
    };
    let weak = self.0.downgrade();
    subscriber.add(move || {
      let removed = weak.upgrade().and_then(|observers| {
        let mut observers = observers.try_rc_deref_mut()?;
        let pos = observers.list.iter().position(|(i, _)| *i == id)?;
        Some(observers.list.remove(pos))
      });
      drop(removed);
    });
    true
  }
}

/// Generates the subscribe surface shared by every subject handle.
macro_rules! impl_subject_observable {
  ($ty:ident) => {
    impl<Item: Clone + 'static, Err: Clone + 'static> $ty<Item, Err> {
      pub fn subscribe_with(
        &self,
        observer: impl $crate::observer::Observer<Item, Err> + 'static,
      ) -> $crate::subscription::Subscription {
        self.as_observable().subscribe_with(observer)
      }

      pub fn subscribe(&self, next: impl FnMut(Item) + 'static) -> $crate::subscription::Subscription
      where
        Err: std::fmt::Debug,
      {
        self.as_observable().subscribe(next)
      }

      pub fn subscribe_err(
        &self,
        next: impl FnMut(Item) + 'static,
        error: impl FnOnce(Err) + 'static,
      ) -> $crate::subscription::Subscription {
        self.as_observable().subscribe_err(next, error)
      }

      pub fn subscribe_complete(
        &self,
        next: impl FnMut(Item) + 'static,
        complete: impl FnOnce() + 'static,
      ) -> $crate::subscription::Subscription
      where
        Err: std::fmt::Debug,
      {
        self.as_observable().subscribe_complete(next, complete)
      }

      pub fn subscribe_all(
        &self,
        next: impl FnMut(Item) + 'static,
        error: impl FnOnce(Err) + 'static,
        complete: impl FnOnce() + 'static,
      ) -> $crate::subscription::Subscription {
        self.as_observable().subscribe_all(next, error, complete)
      }
    }

    impl<Item: Clone + 'static, Err: Clone + 'static> $crate::observable::IntoObservable<Item, Err>
      for $ty<Item, Err>
    {
      fn into_observable(self) -> $crate::observable::Observable<Item, Err> { self.as_observable() }
    }

    impl<Item: Clone + 'static, Err: Clone + 'static> $crate::observer::Observer<Item, Err>
      for $ty<Item, Err>
    {
      fn next(&mut self, value: Item) { $ty::next(self, value) }

      fn error(&mut self, err: Err) { $ty::error(self, err) }

      fn complete(&mut self) { $ty::complete(self) }

      fn is_closed(&self) -> bool { self.is_stopped() }
    }
  };
}

pub(crate) use impl_subject_observable;

// ============================================================================
// Subject
// ============================================================================

/// A multicast hub. New subscribers only see what is emitted after they
/// subscribed.
///
/// ```
/// use rxcore::prelude::*;
///
/// let subject = Subject::<i32, ()>::new();
/// subject.subscribe(|v| println!("A: {v}"));
/// subject.next(1);
/// subject.subscribe(|v| println!("B: {v}"));
/// subject.next(2);
/// subject.complete();
/// ```
pub struct Subject<Item, Err> {
  core: SubjectCore<Item, Err>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item: Clone + 'static, Err: Clone + 'static> Subject<Item, Err> {
  pub fn new() -> Self { Self { core: SubjectCore::new() } }

  #[inline]
  pub fn next(&self, value: Item) { self.core.emit_next(value) }

  pub fn error(&self, err: Err) { self.core.stop(Terminal::Error(err)); }

  pub fn complete(&self) { self.core.stop(Terminal::Complete); }

  pub fn is_stopped(&self) -> bool { self.core.is_stopped() }

  /// Number of currently subscribed observers.
  pub fn observer_count(&self) -> usize { self.core.observer_count() }

  /// A read-only observable view of this subject.
  pub fn as_observable(&self) -> Observable<Item, Err> {
    let core = self.core.clone();
    Observable::new(move |subscriber: Subscriber<Item, Err>| {
      if !core.register(&subscriber) {
        if let Some(terminal) = core.terminal() {
          terminal.deliver(&subscriber);
        }
      }
      Ok(())
    })
  }
}

impl<Item: Clone + 'static, Err: Clone + 'static> Default for Subject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl_subject_observable!(Subject);
