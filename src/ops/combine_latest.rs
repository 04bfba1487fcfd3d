use crate::{
  observable::{IntoObservable, Observable},
  observer::Observer,
  ops::zip::Side,
  rc::{MutRc, RcDerefMut},
  subscriber::Subscriber,
};

struct CombineState<Item> {
  latest: Vec<Option<Item>>,
  completed: Vec<bool>,
}

pub struct CombineLatestObserver<Item, Err> {
  index: usize,
  downstream: Subscriber<Vec<Item>, Err>,
  state: MutRc<CombineState<Item>>,
}

impl<Item: Clone + 'static, Err: 'static> Observer<Item, Err> for CombineLatestObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    let combined = {
      let mut state = self.state.rc_deref_mut();
      state.latest[self.index] = Some(value);
      state.latest.iter().cloned().collect::<Option<Vec<_>>>()
    };
    if let Some(combined) = combined {
      self.downstream.next(combined);
    }
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) {
    let done = {
      let mut state = self.state.rc_deref_mut();
      state.completed[self.index] = true;
      state.latest[self.index].is_none() || state.completed.iter().all(|c| *c)
    };
    if done {
      self.downstream.complete();
    }
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

/// Emits the latest value of every source, in source order, whenever any
/// source emits and all of them have emitted at least once.
///
/// A source that completes without ever emitting completes the output, since
/// no combination can be formed any more. Otherwise the output completes when
/// every source has completed.
pub fn combine_latest<Item, Err, S>(sources: impl IntoIterator<Item = S>) -> Observable<Vec<Item>, Err>
where
  Item: Clone + 'static,
  Err: 'static,
  S: IntoObservable<Item, Err>,
{
  let sources: Vec<Observable<Item, Err>> =
    sources.into_iter().map(IntoObservable::into_observable).collect();
  Observable::new(move |downstream: Subscriber<Vec<Item>, Err>| {
    if sources.is_empty() {
      downstream.complete();
      return Ok(());
    }
    let state = MutRc::own(CombineState {
      latest: sources.iter().map(|_| None).collect(),
      completed: vec![false; sources.len()],
    });
    for (index, source) in sources.iter().enumerate() {
      if downstream.is_closed() {
        break;
      }
      source.subscribe_child(downstream.subscription(), CombineLatestObserver {
        index,
        downstream: downstream.clone(),
        state: state.clone(),
      });
    }
    Ok(())
  })
}

impl<Item: Clone + 'static, Err: 'static> Observable<Item, Err> {
  /// Combines the latest values of this observable and `other` into a tuple.
  pub fn combine_latest_with<B: Clone + 'static>(
    self,
    other: impl IntoObservable<B, Err>,
  ) -> Observable<(Item, B), Err> {
    let left = self.map(Side::Left);
    let right = other.into_observable().map(Side::Right);
    combine_latest(vec![left, right]).map(Side::into_pair)
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::{observable::empty, subject::Subject, subscription::SubscriptionLike};

  #[test]
  fn emits_once_every_source_has_a_value() {
    let a = Subject::<i32, ()>::new();
    let b = Subject::<&'static str, ()>::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    a.as_observable()
      .combine_latest_with(b.clone())
      .subscribe(move |v| c_seen.borrow_mut().push(v));

    a.next(1);
    a.next(2);
    b.next("x");
    a.next(3);
    b.next("y");
    assert_eq!(*seen.borrow(), vec![(2, "x"), (3, "x"), (3, "y")]);
  }

  #[test]
  fn completes_when_all_sources_complete() {
    let a = Subject::<i32, ()>::new();
    let b = Subject::<i32, ()>::new();
    let completed = Rc::new(RefCell::new(false));
    let c_completed = completed.clone();
    combine_latest(vec![a.clone(), b.clone()])
      .subscribe_complete(|_| {}, move || *c_completed.borrow_mut() = true);

    a.next(1);
    b.next(2);
    a.complete();
    assert!(!*completed.borrow());
    b.next(3);
    b.complete();
    assert!(*completed.borrow());
  }

  #[test]
  fn source_without_values_completes_output() {
    let other = Subject::<i32, ()>::new();
    let completed = Rc::new(RefCell::new(false));
    let c_completed = completed.clone();
    combine_latest(vec![other.as_observable(), empty()])
      .subscribe_complete(|_| {}, move || *c_completed.borrow_mut() = true);
    assert!(*completed.borrow());
    assert_eq!(other.observer_count(), 0);
  }

  #[test]
  fn unsubscribe_tears_down_every_source() {
    let sources = [Subject::<i32, ()>::new(), Subject::<i32, ()>::new(), Subject::<i32, ()>::new()];
    let subscription = combine_latest(sources.to_vec()).subscribe(|_| {});
    sources[1].next(1);
    assert!(sources.iter().all(|s| s.observer_count() == 1));
    subscription.unsubscribe().unwrap();
    assert!(sources.iter().all(|s| s.observer_count() == 0));
  }
}
