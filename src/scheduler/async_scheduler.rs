use std::{future::Future, time::Instant};

use futures::{
  executor::{LocalPool, LocalSpawner},
  future::{AbortHandle, Abortable, FutureExt},
  task::LocalSpawnExt,
};

use crate::{
  scheduler::{AnimationFrameScheduler, Duration, Scheduler, Task},
  subscription::{dispose, Subscription, SubscriptionLike},
};

/// Runs every task as a spawned future on a `futures` local executor.
///
/// Tasks never run inline: even a zero delay waits until the executor polls
/// the spawned future. Positive delays are timer futures from `futures-time`.
#[derive(Clone)]
pub struct AsyncScheduler {
  spawner: LocalSpawner,
  epoch: Instant,
}

impl AsyncScheduler {
  pub fn new(spawner: LocalSpawner) -> Self { Self { spawner, epoch: Instant::now() } }

  pub fn spawner(&self) -> &LocalSpawner { &self.spawner }
}

impl Scheduler for AsyncScheduler {
  fn now(&self) -> Duration { self.epoch.elapsed() }

  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription {
    let handle = Subscription::new();
    let c_handle = handle.clone();
    let work = async move {
      if !delay.is_zero() {
        futures_time::task::sleep(delay.into()).await;
      }
      if !c_handle.is_closed() {
        task();
        dispose(&c_handle, "async task");
      }
    };

    let (abort, registration) = AbortHandle::new_pair();
    match self.spawner.spawn_local(Abortable::new(work, registration).map(|_| ())) {
      Ok(()) => {
        tracing::trace!(?delay, "async task spawned");
        handle.add(move || abort.abort());
      }
      Err(err) => {
        tracing::error!(error = %err, "failed to spawn scheduled task");
        dispose(&handle, "async task spawn failure");
      }
    }
    handle
  }
}

/// A single-threaded runtime: a `LocalPool` plus the schedulers feeding it.
///
/// ```
/// use std::time::Duration;
///
/// use rxcore::prelude::*;
///
/// let mut runtime = LocalRuntime::new();
/// let scheduler = runtime.scheduler();
/// let ticks = std::rc::Rc::new(std::cell::Cell::new(0));
/// let c_ticks = ticks.clone();
/// observable::interval::<(), _>(Duration::from_millis(1), scheduler)
///   .take(3)
///   .subscribe(move |_| c_ticks.set(c_ticks.get() + 1));
/// runtime.run();
/// assert_eq!(ticks.get(), 3);
/// ```
pub struct LocalRuntime {
  pool: LocalPool,
  scheduler: AsyncScheduler,
}

impl LocalRuntime {
  pub fn new() -> Self {
    let pool = LocalPool::new();
    let scheduler = AsyncScheduler::new(pool.spawner());
    Self { pool, scheduler }
  }

  pub fn scheduler(&self) -> AsyncScheduler { self.scheduler.clone() }

  /// An animation-frame scheduler ticking on this runtime.
  pub fn animation_frame_scheduler(&self) -> AnimationFrameScheduler {
    AnimationFrameScheduler::new(self.scheduler.clone())
  }

  /// Runs until every spawned task completed.
  pub fn run(&mut self) { self.pool.run() }

  /// Runs the tasks that can make progress without waiting.
  pub fn run_until_stalled(&mut self) { self.pool.run_until_stalled() }

  /// Drives `future` to completion, running spawned tasks meanwhile.
  pub fn run_until<F: Future>(&mut self, future: F) -> F::Output { self.pool.run_until(future) }
}

impl Default for LocalRuntime {
  fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;

  #[test]
  fn zero_delay_is_not_inline() {
    let mut runtime = LocalRuntime::new();
    let ran = Rc::new(RefCell::new(false));
    let c_ran = ran.clone();
    runtime.scheduler().schedule_task(Duration::ZERO, Box::new(move || *c_ran.borrow_mut() = true));
    assert!(!*ran.borrow());
    runtime.run();
    assert!(*ran.borrow());
  }

  #[test]
  fn delays_run_in_due_order() {
    let mut runtime = LocalRuntime::new();
    let scheduler = runtime.scheduler();
    let log = Rc::new(RefCell::new(vec![]));
    for (value, delay) in [(2, 20), (1, 5)] {
      let log = log.clone();
      scheduler.schedule_task(Duration::from_millis(delay), Box::new(move || log.borrow_mut().push(value)));
    }
    runtime.run();
    assert_eq!(*log.borrow(), vec![1, 2]);
  }

  #[test]
  fn cancel_aborts_pending_task() {
    let mut runtime = LocalRuntime::new();
    let ran = Rc::new(RefCell::new(false));
    let c_ran = ran.clone();
    let handle = runtime
      .scheduler()
      .schedule_task(Duration::from_millis(5), Box::new(move || *c_ran.borrow_mut() = true));
    handle.unsubscribe().unwrap();
    runtime.run();
    assert!(!*ran.borrow());
  }
}
