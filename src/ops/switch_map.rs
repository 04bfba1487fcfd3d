use std::rc::Rc;

use crate::{
  observable::{IntoObservable, Observable},
  observer::Observer,
  rc::{MutRc, RcDerefMut},
  subscriber::Subscriber,
  subscription::{dispose, Subscription, SubscriptionLike},
};

#[derive(Default)]
struct SwitchState {
  current: Option<Subscription>,
  inner_id: usize,
  inner_active: bool,
  outer_done: bool,
}

pub struct SwitchMapObserver<Out, Err, F> {
  downstream: Subscriber<Out, Err>,
  project: Rc<F>,
  state: MutRc<SwitchState>,
}

impl<Item, Out, Err, F, S> Observer<Item, Err> for SwitchMapObserver<Out, Err, F>
where
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> S,
  S: IntoObservable<Out, Err>,
{
  fn next(&mut self, value: Item) {
    let (previous, id) = {
      let mut state = self.state.rc_deref_mut();
      state.inner_id += 1;
      state.inner_active = true;
      (state.current.take(), state.inner_id)
    };
    if let Some(previous) = previous {
      dispose(&previous, "switch_map inner");
    }

    let inner = (self.project)(value).into_observable();
    let observer = SwitchInner {
      downstream: self.downstream.clone(),
      state: self.state.clone(),
      id,
    };
    let subscription = inner.subscribe_child(self.downstream.subscription(), observer);
    let mut state = self.state.rc_deref_mut();
    if state.inner_id == id && !subscription.is_closed() {
      state.current = Some(subscription);
    }
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

pub struct SwitchInner<Out, Err> {
  downstream: Subscriber<Out, Err>,
  state: MutRc<SwitchState>,
  id: usize,
}

impl<Out: 'static, Err: 'static> Observer<Out, Err> for SwitchInner<Out, Err> {
  fn next(&mut self, value: Out) { self.downstream.next(value) }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) {
    let done = {
      let mut state = self.state.rc_deref_mut();
      if state.inner_id != self.id {
        return;
      }
      state.inner_active = false;
      state.current = None;
      state.outer_done
    };
    if done {
      self.downstream.complete();
    }
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Projects each value to an inner observable, unsubscribing the previous
  /// inner first. Only the latest inner delivers values.
  ///
  /// Completes once the source and the latest inner have completed.
  pub fn switch_map<Out, S, F>(self, project: F) -> Observable<Out, Err>
  where
    Out: 'static,
    S: IntoObservable<Out, Err>,
    F: Fn(Item) -> S + 'static,
  {
    let project = Rc::new(project);
    self.lift(move |downstream| SwitchMapObserver {
      downstream,
      project: project.clone(),
      state: MutRc::own(SwitchState::default()),
    })
  }

  /// Flattens a higher-order observable, following only the latest inner.
  pub fn switch_all<Out>(self) -> Observable<Out, Err>
  where
    Out: 'static,
    Item: IntoObservable<Out, Err>,
  {
    self.switch_map(|inner| inner)
  }
}
