use crate::{
  observable::Observable,
  rc::{MutRc, RcDeref},
  subject::{SubjectCore, Terminal},
  subscriber::Subscriber,
};

/// A subject that always holds a current value.
///
/// It is seeded at construction, every `next` replaces it, and a new
/// subscriber receives it immediately. After the subject stopped, new
/// subscribers only receive the terminal notification.
pub struct BehaviorSubject<Item, Err> {
  core: SubjectCore<Item, Err>,
  value: MutRc<Item>,
}

impl<Item, Err> Clone for BehaviorSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone(), value: self.value.clone() } }
}

impl<Item: Clone + 'static, Err: Clone + 'static> BehaviorSubject<Item, Err> {
  pub fn new(value: Item) -> Self { Self { core: SubjectCore::new(), value: MutRc::own(value) } }

  /// The current value, or the error the subject stopped with.
  pub fn value(&self) -> Result<Item, Err> {
    match self.core.terminal() {
      Some(Terminal::Error(err)) => Err(err),
      _ => Ok(self.value.rc_deref().clone()),
    }
  }

  pub fn next(&self, value: Item) {
    if self.core.is_stopped() {
      return;
    }
    self.value.replace(value.clone());
    self.core.emit_next(value);
  }

  pub fn error(&self, err: Err) { self.core.stop(Terminal::Error(err)); }

  pub fn complete(&self) { self.core.stop(Terminal::Complete); }

  pub fn is_stopped(&self) -> bool { self.core.is_stopped() }

  pub fn observer_count(&self) -> usize { self.core.observer_count() }

  pub fn as_observable(&self) -> Observable<Item, Err> {
    let (core, value) = (self.core.clone(), self.value.clone());
    Observable::new(move |subscriber: Subscriber<Item, Err>| {
      if core.register(&subscriber) {
        let current = value.rc_deref().clone();
        subscriber.next(current);
      } else if let Some(terminal) = core.terminal() {
        terminal.deliver(&subscriber);
      }
      Ok(())
    })
  }
}

crate::subject::impl_subject_observable!(BehaviorSubject);
