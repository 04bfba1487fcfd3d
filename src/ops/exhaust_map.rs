use std::rc::Rc;

use tracing::trace;

use crate::{
  observable::{IntoObservable, Observable},
  observer::Observer,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscriber::Subscriber,
};

#[derive(Default)]
struct ExhaustState {
  inner_active: bool,
  outer_done: bool,
}

pub struct ExhaustMapObserver<Out, Err, F> {
  downstream: Subscriber<Out, Err>,
  project: Rc<F>,
  state: MutRc<ExhaustState>,
}

impl<Item, Out, Err, F, S> Observer<Item, Err> for ExhaustMapObserver<Out, Err, F>
where
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> S,
  S: IntoObservable<Out, Err>,
{
  fn next(&mut self, value: Item) {
    if self.state.rc_deref().inner_active {
      trace!("exhaust_map dropped a value while an inner is active");
      return;
    }
    self.state.rc_deref_mut().inner_active = true;
    let inner = (self.project)(value).into_observable();
    inner.subscribe_child(self.downstream.subscription(), ExhaustInner {
      downstream: self.downstream.clone(),
      state: self.state.clone(),
    });
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) {
    let done = {
      let mut state = self.state.rc_deref_mut();
      state.outer_done = true;
      !state.inner_active
    };
    if done {
      self.downstream.complete();
    }
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

pub struct ExhaustInner<Out, Err> {
  downstream: Subscriber<Out, Err>,
  state: MutRc<ExhaustState>,
}

impl<Out: 'static, Err: 'static> Observer<Out, Err> for ExhaustInner<Out, Err> {
  fn next(&mut self, value: Out) { self.downstream.next(value) }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) {
    let done = {
      let mut state = self.state.rc_deref_mut();
      state.inner_active = false;
      state.outer_done
    };
    if done {
      self.downstream.complete();
    }
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Projects a value to an inner observable only when no inner is running.
  /// Values that arrive meanwhile are dropped.
  pub fn exhaust_map<Out, S, F>(self, project: F) -> Observable<Out, Err>
  where
    Out: 'static,
    S: IntoObservable<Out, Err>,
    F: Fn(Item) -> S + 'static,
  {
    let project = Rc::new(project);
    self.lift(move |downstream| ExhaustMapObserver {
      downstream,
      project: project.clone(),
      state: MutRc::own(ExhaustState::default()),
    })
  }

  /// Flattens a higher-order observable, ignoring inners that arrive while
  /// one is running.
  pub fn exhaust_all<Out>(self) -> Observable<Out, Err>
  where
    Out: 'static,
    Item: IntoObservable<Out, Err>,
  {
    self.exhaust_map(|inner| inner)
  }
}
