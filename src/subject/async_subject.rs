use crate::{
  observable::Observable,
  rc::{MutRc, RcDeref, RcDerefMut},
  subject::{SubjectCore, Terminal},
  subscriber::Subscriber,
};

/// A subject that only emits the last value it received, and only when it
/// completes. An error discards the value.
pub struct AsyncSubject<Item, Err> {
  core: SubjectCore<Item, Err>,
  last: MutRc<Option<Item>>,
}

impl<Item, Err> Clone for AsyncSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone(), last: self.last.clone() } }
}

impl<Item: Clone + 'static, Err: Clone + 'static> AsyncSubject<Item, Err> {
  pub fn new() -> Self { Self { core: SubjectCore::new(), last: MutRc::own(None) } }

  pub fn next(&self, value: Item) {
    if !self.core.is_stopped() {
      *self.last.rc_deref_mut() = Some(value);
    }
  }

  pub fn error(&self, err: Err) {
    if self.core.stop(Terminal::Error(err)) {
      self.last.take();
    }
  }

  pub fn complete(&self) {
    if self.core.is_stopped() {
      return;
    }
    let last = self.last.rc_deref().clone();
    if let Some(value) = last {
      self.core.emit_next(value);
    }
    self.core.stop(Terminal::Complete);
  }

  pub fn is_stopped(&self) -> bool { self.core.is_stopped() }

  pub fn observer_count(&self) -> usize { self.core.observer_count() }

  pub fn as_observable(&self) -> Observable<Item, Err> {
    let (core, last) = (self.core.clone(), self.last.clone());
    Observable::new(move |subscriber: Subscriber<Item, Err>| {
      if core.register(&subscriber) {
        return Ok(());
      }
      match core.terminal() {
        Some(Terminal::Complete) => {
          let value = last.rc_deref().clone();
          if let Some(value) = value {
            subscriber.next(value);
          }
          subscriber.complete();
        }
        Some(terminal) => terminal.deliver(&subscriber),
        None => {}
      }
      Ok(())
    })
  }
}

impl<Item: Clone + 'static, Err: Clone + 'static> Default for AsyncSubject<Item, Err> {
  fn default() -> Self { Self::new() }
}

crate::subject::impl_subject_observable!(AsyncSubject);
