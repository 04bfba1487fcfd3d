use std::future::Future;

use futures::{
  future::{abortable, FutureExt},
  task::{LocalSpawn, LocalSpawnExt},
};

use crate::{observable::Observable, subscriber::Subscriber};

/// Converts a `Future` into an observable that emits its output once and
/// completes.
///
/// The future is driven by `spawner` (for example the spawner of a
/// `futures::executor::LocalPool`). It is shared, so every subscription
/// observes the same output and the work runs at most once. Unsubscribing
/// before it resolves aborts the spawned task of that subscription.
pub fn from_future<F, Err, Sp>(future: F, spawner: Sp) -> Observable<F::Output, Err>
where
  F: Future + 'static,
  F::Output: Clone + 'static,
  Err: Clone + 'static,
  Sp: LocalSpawn + 'static,
{
  from_future_result(future.map(Ok::<F::Output, Err>), spawner)
}

/// Like [`from_future`] for fallible futures: `Err` becomes the error
/// notification.
pub fn from_future_result<F, Item, Err, Sp>(future: F, spawner: Sp) -> Observable<Item, Err>
where
  F: Future<Output = Result<Item, Err>> + 'static,
  Item: Clone + 'static,
  Err: Clone + 'static,
  Sp: LocalSpawn + 'static,
{
  let shared = future.shared();
  Observable::new(move |subscriber: Subscriber<Item, Err>| {
    let sink = subscriber.clone();
    let (task, handle) = abortable(shared.clone().map(move |output| match output {
      Ok(value) => {
        sink.next(value);
        sink.complete();
      }
      Err(err) => sink.error(err),
    }));
    match spawner.spawn_local(task.map(|_| ())) {
      Ok(()) => {
        subscriber.add(move || handle.abort());
      }
      Err(err) => tracing::error!(error = %err, "failed to spawn future observable"),
    }
    Ok(())
  })
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use futures::executor::LocalPool;

  use super::*;
  use crate::subscription::SubscriptionLike;

  #[test]
  fn emits_output_then_completes() {
    let mut pool = LocalPool::new();
    let log = Rc::new(RefCell::new(vec![]));
    let (c_log, c_done) = (log.clone(), log.clone());
    from_future::<_, (), _>(async { 42 }, pool.spawner())
      .subscribe_complete(move |v| c_log.borrow_mut().push(v), move || c_done.borrow_mut().push(-1));
    assert!(log.borrow().is_empty());
    pool.run();
    assert_eq!(*log.borrow(), vec![42, -1]);
  }

  #[test]
  fn failed_future_errors() {
    let mut pool = LocalPool::new();
    let errors = Rc::new(RefCell::new(vec![]));
    let c_errors = errors.clone();
    from_future_result(async { Err::<i32, _>("nope") }, pool.spawner())
      .subscribe_err(|_| {}, move |e| c_errors.borrow_mut().push(e));
    pool.run();
    assert_eq!(*errors.borrow(), vec!["nope"]);
  }

  #[test]
  fn unsubscribe_before_resolution_drops_output() {
    let mut pool = LocalPool::new();
    let log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    let subscription = from_future::<_, (), _>(async { 1 }, pool.spawner())
      .subscribe(move |v| c_log.borrow_mut().push(v));
    subscription.unsubscribe().unwrap();
    pool.run();
    assert!(log.borrow().is_empty());
  }
}
