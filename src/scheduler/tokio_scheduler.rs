use std::time::Instant;

use crate::{
  scheduler::{Duration, Scheduler, Task},
  subscription::{dispose, Subscription, SubscriptionLike},
};

/// Spawns every task on the current tokio `LocalSet`.
///
/// Scheduling panics when no `LocalSet` is running on this thread, like
/// `tokio::task::spawn_local` does.
#[derive(Clone)]
pub struct TokioScheduler {
  epoch: Instant,
}

impl TokioScheduler {
  pub fn new() -> Self { Self { epoch: Instant::now() } }
}

impl Default for TokioScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for TokioScheduler {
  fn now(&self) -> Duration { self.epoch.elapsed() }

  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription {
    let handle = Subscription::new();
    let c_handle = handle.clone();
    let join = tokio::task::spawn_local(async move {
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      if !c_handle.is_closed() {
        task();
        dispose(&c_handle, "tokio task");
      }
    });
    tracing::trace!(?delay, "tokio task spawned");
    handle.add(move || join.abort());
    handle
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use tokio::task::LocalSet;

  use super::*;

  #[tokio::test]
  async fn runs_tasks_in_due_order() {
    let local = LocalSet::new();
    let log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    local
      .run_until(async move {
        let scheduler = TokioScheduler::new();
        for (value, delay) in [(2, 20), (1, 5)] {
          let log = c_log.clone();
          scheduler.schedule_task(
            Duration::from_millis(delay),
            Box::new(move || log.borrow_mut().push(value)),
          );
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
      })
      .await;
    assert_eq!(*log.borrow(), vec![1, 2]);
  }

  #[tokio::test]
  async fn cancelled_task_never_runs() {
    let local = LocalSet::new();
    let ran = Rc::new(RefCell::new(false));
    let c_ran = ran.clone();
    local
      .run_until(async move {
        let handle = TokioScheduler::new()
          .schedule_task(Duration::from_millis(5), Box::new(move || *c_ran.borrow_mut() = true));
        handle.unsubscribe().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
      })
      .await;
    assert!(!*ran.borrow());
  }
}
