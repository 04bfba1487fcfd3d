use crate::{
  observable::{IntoObservable, Observable},
  observer::Observer,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscriber::Subscriber,
  subscription::{dispose, Subscription},
};

struct RaceState {
  winner: Option<usize>,
  contenders: Vec<Subscription>,
}

pub struct RaceObserver<Item, Err> {
  index: usize,
  downstream: Subscriber<Item, Err>,
  state: MutRc<RaceState>,
}

impl<Item, Err> RaceObserver<Item, Err> {
  /// Claims the win on the first notification. Returns whether this source
  /// may forward.
  fn claim(&self) -> bool {
    let losers = {
      let mut state = self.state.rc_deref_mut();
      match state.winner {
        Some(winner) => return winner == self.index,
        None => state.winner = Some(self.index),
      }
      let contenders = std::mem::take(&mut state.contenders);
      contenders
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != self.index)
        .map(|(_, s)| s)
        .collect::<Vec<_>>()
    };
    for loser in losers {
      dispose(&loser, "race loser");
    }
    true
  }
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for RaceObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.claim() {
      self.downstream.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if self.claim() {
      self.downstream.error(err);
    }
  }

  fn complete(&mut self) {
    if self.claim() {
      self.downstream.complete();
    }
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

/// Mirrors whichever source notifies first; all other sources are
/// unsubscribed at that moment.
///
/// Sources are subscribed in order. Once a source has won during its own
/// subscription, the remaining sources are not subscribed at all.
pub fn race<Item, Err, S>(sources: impl IntoIterator<Item = S>) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  S: IntoObservable<Item, Err>,
{
  let sources: Vec<Observable<Item, Err>> =
    sources.into_iter().map(IntoObservable::into_observable).collect();
  Observable::new(move |downstream: Subscriber<Item, Err>| {
    let state = MutRc::own(RaceState { winner: None, contenders: vec![] });
    for (index, source) in sources.iter().enumerate() {
      if state.rc_deref().winner.is_some() || downstream.is_closed() {
        break;
      }
      let subscription = source.subscribe_child(downstream.subscription(), RaceObserver {
        index,
        downstream: downstream.clone(),
        state: state.clone(),
      });
      let mut state = state.rc_deref_mut();
      if state.winner.is_none() {
        state.contenders.push(subscription);
      }
    }
    Ok(())
  })
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Races this observable against `other`.
  pub fn race_with(self, other: impl IntoObservable<Item, Err>) -> Observable<Item, Err> {
    race(vec![self, other.into_observable()])
  }
}
