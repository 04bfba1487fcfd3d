use crate::{
  observable::{IntoObservable, Observable},
  observer::Observer,
  subscriber::Subscriber,
};

/// Listens to the notifier: its first value completes the output.
pub struct TakeUntilNotifier<Item, Err> {
  downstream: Subscriber<Item, Err>,
}

impl<Item, NotifyItem, Err> Observer<NotifyItem, Err> for TakeUntilNotifier<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  fn next(&mut self, _: NotifyItem) { self.downstream.complete() }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) {}

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Emits the values of the source until `notifier` emits its first value,
  /// then completes and unsubscribes the source.
  ///
  /// The notifier is subscribed first, so a notifier that fires immediately
  /// prevents the source from being subscribed at all.
  pub fn take_until<NotifyItem, N>(self, notifier: N) -> Observable<Item, Err>
  where
    NotifyItem: 'static,
    N: IntoObservable<NotifyItem, Err>,
  {
    let notifier = notifier.into_observable();
    let source = self;
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      notifier.subscribe_child(downstream.subscription(), TakeUntilNotifier {
        downstream: downstream.clone(),
      });
      if !downstream.is_closed() {
        source.subscribe_child(downstream.subscription(), downstream.clone());
      }
      Ok(())
    })
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use crate::{observable::of, subject::Subject};

  #[test]
  fn completes_when_notifier_emits() {
    let source = Subject::<i32, ()>::new();
    let notifier = Subject::<(), ()>::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let completed = Rc::new(RefCell::new(false));
    let (c_seen, c_completed) = (seen.clone(), completed.clone());
    source.as_observable().take_until(notifier.clone()).subscribe_complete(
      move |v| c_seen.borrow_mut().push(v),
      move || *c_completed.borrow_mut() = true,
    );

    source.next(1);
    notifier.next(());
    source.next(2);
    assert_eq!(*seen.borrow(), vec![1]);
    assert!(*completed.borrow());
    assert_eq!(source.observer_count(), 0);
    assert_eq!(notifier.observer_count(), 0);
  }

  #[test]
  fn immediate_notifier_skips_source() {
    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    let source = Subject::<i32, ()>::new();
    source
      .as_observable()
      .take_until(of(()))
      .subscribe(move |v| c_seen.borrow_mut().push(v));
    assert_eq!(source.observer_count(), 0);
    assert!(seen.borrow().is_empty());
  }
}
