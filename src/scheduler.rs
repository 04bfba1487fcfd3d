//! Scheduler abstraction: *when* work runs.
//!
//! A [`Scheduler`] is a value with a clock and a way to run a task after a
//! delay. Operators and factories that involve time take a scheduler
//! argument, so the same pipeline runs on a real clock in production and on a
//! [`VirtualTimeScheduler`] in tests.
//!
//! | Scheduler | Runs a task | Clock |
//! |-----------|-------------|-------|
//! | [`ImmediateScheduler`] | inline, nested calls trampolined | wall clock |
//! | [`QueueScheduler`] | inline, on its own trampoline | wall clock |
//! | [`AsyncScheduler`] | spawned on a `LocalPool` | wall clock |
//! | [`AnimationFrameScheduler`] | batched per frame tick | wall clock |
//! | [`TokioScheduler`] | spawned on a tokio `LocalSet` | wall clock |
//! | [`VirtualTimeScheduler`] | when flushed | virtual |
//!
//! The two trampolines never block. A positive delay is waited out on the
//! scheduler given to `with_timer`; without one the task is refused.
//!
//! A task that panics unwinds out of the call that executed it. Every
//! scheduler resets its internal state on the way out, so it stays usable.

use std::{cell::Cell, rc::Rc};

pub use std::time::{Duration, Instant};

use crate::{
  rc::{MutRc, RcDerefMut},
  subscription::{dispose, Subscription, SubscriptionLike},
};

#[cfg(feature = "timer")]
mod animation_frame;
#[cfg(feature = "timer")]
mod async_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
mod trampoline;
mod virtual_time;

#[cfg(feature = "timer")]
pub use animation_frame::*;
#[cfg(feature = "timer")]
pub use async_scheduler::*;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::*;
pub use trampoline::*;
pub use virtual_time::*;

/// A unit of work accepted by [`Scheduler::schedule_task`].
pub type Task = Box<dyn FnOnce()>;

/// Decides when scheduled work executes and supplies the current time.
pub trait Scheduler: Clone + 'static {
  /// The time of this scheduler's clock, measured from its own epoch.
  fn now(&self) -> Duration;

  /// Runs `task` once, no earlier than `delay` from now.
  ///
  /// The returned subscription cancels the task while it is still pending and
  /// is closed once the task has run.
  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription;

  /// Schedules a recurring action.
  ///
  /// `work` is called with `state` after `delay`. It may call
  /// [`Recurse::schedule`] to run again later with a new state; otherwise the
  /// action ends. The returned subscription cancels whichever run is pending.
  fn schedule<S, F>(&self, work: F, delay: Duration, state: S) -> Subscription
  where
    S: 'static,
    F: FnMut(S, &mut Recurse<S>) + 'static,
  {
    let action = Subscription::new();
    let pending = MutRc::own(None::<Subscription>);
    let c_pending = pending.clone();
    action.add(move || {
      if let Some(task) = c_pending.take() {
        dispose(&task, "scheduled action");
      }
    });
    step(self.clone(), MutRc::own(work), pending, action.clone(), delay, state);
    action
  }
}

/// Lets a running action ask to be executed again.
pub struct Recurse<S> {
  next: Option<(S, Duration)>,
}

impl<S> Recurse<S> {
  /// Runs the action again with `state` after `delay`. Calling it more than
  /// once keeps the last request.
  pub fn schedule(&mut self, state: S, delay: Duration) { self.next = Some((state, delay)); }
}

fn step<Sch, S, F>(
  scheduler: Sch,
  work: MutRc<F>,
  pending: MutRc<Option<Subscription>>,
  action: Subscription,
  delay: Duration,
  state: S,
) where
  Sch: Scheduler,
  S: 'static,
  F: FnMut(S, &mut Recurse<S>) + 'static,
{
  let c_scheduler = scheduler.clone();
  let c_pending = pending.clone();
  let c_action = action.clone();
  let task: Task = Box::new(move || {
    if c_action.is_closed() {
      return;
    }
    let mut recurse = Recurse { next: None };
    (&mut *work.rc_deref_mut())(state, &mut recurse);
    match recurse.next {
      Some((state, delay)) if !c_action.is_closed() => {
        step(c_scheduler, work, c_pending, c_action, delay, state)
      }
      _ => {
        c_pending.take();
        dispose(&c_action, "scheduled action");
      }
    }
  });

  let handle = scheduler.schedule_task(delay, task);
  // A task that already ran inline installed its successor itself.
  if !handle.is_closed() {
    *pending.rc_deref_mut() = Some(handle);
  }
}

/// Resets a flag when dropped, also when a task unwinds.
pub(crate) struct ActiveFlag(pub(crate) Rc<Cell<bool>>);

impl Drop for ActiveFlag {
  fn drop(&mut self) { self.0.set(false); }
}
