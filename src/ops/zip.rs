use std::collections::VecDeque;

use crate::{
  observable::{IntoObservable, Observable},
  observer::Observer,
  rc::{MutRc, RcDerefMut},
  subscriber::Subscriber,
};

struct ZipState<Item> {
  buffers: Vec<VecDeque<Item>>,
  completed: Vec<bool>,
}

impl<Item> ZipState<Item> {
  /// A source that completed with nothing buffered can never pair again.
  fn exhausted(&self) -> bool {
    self.completed.iter().zip(&self.buffers).any(|(done, buffer)| *done && buffer.is_empty())
  }
}

pub struct ZipObserver<Item, Err> {
  index: usize,
  downstream: Subscriber<Vec<Item>, Err>,
  state: MutRc<ZipState<Item>>,
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for ZipObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    let (tuple, exhausted) = {
      let mut state = self.state.rc_deref_mut();
      state.buffers[self.index].push_back(value);
      let tuple = if state.buffers.iter().all(|b| !b.is_empty()) {
        Some(state.buffers.iter_mut().filter_map(VecDeque::pop_front).collect::<Vec<_>>())
      } else {
        None
      };
      (tuple, state.exhausted())
    };
    if let Some(tuple) = tuple {
      self.downstream.next(tuple);
    }
    if exhausted {
      self.downstream.complete();
    }
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) {
    let exhausted = {
      let mut state = self.state.rc_deref_mut();
      state.completed[self.index] = true;
      state.exhausted()
    };
    if exhausted {
      self.downstream.complete();
    }
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

/// Pairs the n-th values of every source into a `Vec`, in source order.
///
/// Completes as soon as one source has completed and all of its values have
/// been paired. With no sources it completes immediately.
pub fn zip<Item, Err, S>(sources: impl IntoIterator<Item = S>) -> Observable<Vec<Item>, Err>
where
  Item: 'static,
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
    let state = MutRc::own(ZipState {
      buffers: sources.iter().map(|_| VecDeque::new()).collect(),
      completed: vec![false; sources.len()],
    });
    for (index, source) in sources.iter().enumerate() {
      if downstream.is_closed() {
        break;
      }
      source.subscribe_child(downstream.subscription(), ZipObserver {
        index,
        downstream: downstream.clone(),
        state: state.clone(),
      });
    }
    Ok(())
  })
}

/// Tags the values of two differently typed sources so they can share one
/// n-ary combinator.
#[derive(Clone)]
pub(crate) enum Side<A, B> {
  Left(A),
  Right(B),
}

impl<A, B> Side<A, B> {
  /// Splits a `[Left, Right]` pair produced by a two-source combinator.
  pub(crate) fn into_pair(pair: Vec<Side<A, B>>) -> (A, B) {
    let mut pair = pair.into_iter();
    match (pair.next(), pair.next()) {
      (Some(Side::Left(a)), Some(Side::Right(b))) => (a, b),
      _ => unreachable!("two-source combinators emit one value per side, in order"),
    }
  }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Pairs the values of this observable with those of `other`.
  pub fn zip_with<B: 'static>(
    self,
    other: impl IntoObservable<B, Err>,
  ) -> Observable<(Item, B), Err> {
    let left = self.map(Side::Left);
    let right = other.into_observable().map(Side::Right);
    zip(vec![left, right]).map(Side::into_pair)
  }
}
