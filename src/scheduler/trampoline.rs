use std::{
  cell::Cell,
  collections::VecDeque,
  rc::Rc,
  time::{Duration, Instant},
};

use crate::{
  rc::{MutRc, RcDerefMut},
  scheduler::{ActiveFlag, Scheduler, Task},
  subscription::{dispose, Subscription, SubscriptionLike},
};

/// Hands a delayed task to another scheduler's clock.
type Timer = Rc<dyn Fn(Duration, Task) -> Subscription>;

struct QueuedTask {
  task: Task,
  handle: Subscription,
}

/// A synchronous run loop.
///
/// The first task scheduled while idle runs inline. Tasks scheduled while it
/// is already running are queued and executed by the same loop once the
/// current task returns, so recursive scheduling never grows the stack.
#[derive(Clone)]
struct Trampoline {
  active: Rc<Cell<bool>>,
  queue: MutRc<VecDeque<QueuedTask>>,
  epoch: Instant,
}

impl Trampoline {
  fn new() -> Self {
    Self { active: Rc::new(Cell::new(false)), queue: MutRc::own(VecDeque::new()), epoch: Instant::now() }
  }

  fn schedule_task(&self, task: Task) -> Subscription {
    let handle = Subscription::new();
    self.queue.rc_deref_mut().push_back(QueuedTask { task, handle: handle.clone() });
    tracing::trace!("trampoline task scheduled");
    if !self.active.get() {
      self.drain();
    }
    handle
  }

  fn drain(&self) {
    self.active.set(true);
    let _active = ActiveFlag(self.active.clone());
    let _cancel = CancelOnUnwind(&self.queue);

    loop {
      let next = self.queue.rc_deref_mut().pop_front();
      let Some(QueuedTask { task, handle }) = next else { break };
      if handle.is_closed() {
        tracing::trace!("trampoline task cancelled");
        continue;
      }
      tracing::trace!("trampoline task executed");
      task();
      dispose(&handle, "trampoline task");
    }
  }

  /// Zero delays join the queue. Positive delays wait on `timer` and join the
  /// queue once due; without a timer they are refused.
  fn schedule_after(&self, timer: Option<&Timer>, delay: Duration, task: Task) -> Subscription {
    if delay.is_zero() {
      return self.schedule_task(task);
    }
    let Some(timer) = timer else {
      tracing::error!(?delay, "delayed task refused by a trampoline without a timer");
      return Subscription::closed();
    };
    let handle = Subscription::new();
    let c_handle = handle.clone();
    let trampoline = self.clone();
    let timer_task = timer(
      delay,
      Box::new(move || {
        if c_handle.is_closed() {
          return;
        }
        let done = c_handle.clone();
        let queued = trampoline.schedule_task(Box::new(move || {
          task();
          dispose(&done, "delayed trampoline task");
        }));
        c_handle.add(queued);
      }),
    );
    handle.add(timer_task);
    handle
  }
}

/// Cancels whatever is still queued when a task unwinds.
struct CancelOnUnwind<'a>(&'a MutRc<VecDeque<QueuedTask>>);

impl Drop for CancelOnUnwind<'_> {
  fn drop(&mut self) {
    if !std::thread::panicking() {
      return;
    }
    let dropped: Vec<_> = match self.0.try_rc_deref_mut() {
      Some(mut queue) => queue.drain(..).collect(),
      None => return,
    };
    for QueuedTask { handle, .. } in dropped {
      dispose(&handle, "trampoline unwind");
    }
  }
}

fn timer_of<S: Scheduler>(scheduler: S) -> Timer {
  Rc::new(move |delay, task| scheduler.schedule_task(delay, task))
}

thread_local! {
  static IMMEDIATE: Trampoline = Trampoline::new();
}

/// Executes work as soon as possible on the current thread.
///
/// All clones on one thread share a single trampoline, so work scheduled from
/// inside a running task waits for that task to return instead of nesting.
/// Positive delays need a timer, see [`ImmediateScheduler::with_timer`].
#[derive(Clone)]
pub struct ImmediateScheduler {
  trampoline: Trampoline,
  timer: Option<Timer>,
}

impl ImmediateScheduler {
  /// Waits out positive delays on `scheduler`, then runs the task on this
  /// thread's trampoline.
  pub fn with_timer<S: Scheduler>(mut self, scheduler: S) -> Self {
    self.timer = Some(timer_of(scheduler));
    self
  }
}

impl Default for ImmediateScheduler {
  fn default() -> Self { Self { trampoline: IMMEDIATE.with(Trampoline::clone), timer: None } }
}

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Duration { self.trampoline.epoch.elapsed() }

  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription {
    self.trampoline.schedule_after(self.timer.as_ref(), delay, task)
  }
}

/// A trampoline of its own: tasks run in FIFO order, nested scheduling is
/// queued behind the current task.
///
/// A task with a positive delay is refused with an error log and a closed
/// handle unless a timer was attached with [`QueueScheduler::with_timer`].
#[derive(Clone)]
pub struct QueueScheduler {
  trampoline: Trampoline,
  timer: Option<Timer>,
}

impl QueueScheduler {
  pub fn new() -> Self { Self { trampoline: Trampoline::new(), timer: None } }

  pub fn with_timer<S: Scheduler>(mut self, scheduler: S) -> Self {
    self.timer = Some(timer_of(scheduler));
    self
  }

  /// Whether a task of this scheduler is executing right now.
  pub fn is_active(&self) -> bool { self.trampoline.active.get() }
}

impl Default for QueueScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for QueueScheduler {
  fn now(&self) -> Duration { self.trampoline.epoch.elapsed() }

  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription {
    self.trampoline.schedule_after(self.timer.as_ref(), delay, task)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::RefCell,
    panic::{catch_unwind, AssertUnwindSafe},
  };

  use super::*;
  use crate::scheduler::VirtualTimeScheduler;

  #[test]
  fn idle_scheduler_runs_inline() {
    let scheduler = QueueScheduler::new();
    let ran = Rc::new(Cell::new(false));
    let c_ran = ran.clone();
    let handle = scheduler.schedule_task(Duration::ZERO, Box::new(move || c_ran.set(true)));
    assert!(ran.get());
    assert!(handle.is_closed());
  }

  #[test]
  fn nested_work_is_queued_in_order() {
    let scheduler = QueueScheduler::new();
    let log = Rc::new(RefCell::new(vec![]));
    let (c_log, c_scheduler) = (log.clone(), scheduler.clone());
    scheduler.schedule_task(
      Duration::ZERO,
      Box::new(move || {
        for i in 1..=3 {
          let log = c_log.clone();
          c_scheduler.schedule_task(Duration::ZERO, Box::new(move || log.borrow_mut().push(i)));
        }
        c_log.borrow_mut().push(0);
      }),
    );
    assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
  }

  #[test]
  fn delayed_task_without_timer_is_refused() {
    let scheduler = QueueScheduler::new();
    let ran = Rc::new(Cell::new(false));
    let c_ran = ran.clone();
    let start = Instant::now();
    let handle = scheduler.schedule_task(Duration::from_secs(60), Box::new(move || c_ran.set(true)));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(handle.is_closed());
    assert!(!ran.get());
    assert!(!scheduler.is_active());
  }

  #[test]
  fn delayed_task_waits_on_the_timer() {
    let timer = VirtualTimeScheduler::new();
    let scheduler = QueueScheduler::new().with_timer(timer.clone());
    let log = Rc::new(RefCell::new(vec![]));

    let c_log = log.clone();
    let handle = scheduler.schedule_task(Duration::from_millis(20), Box::new(move || c_log.borrow_mut().push(20)));
    let c_log = log.clone();
    scheduler.schedule_task(Duration::ZERO, Box::new(move || c_log.borrow_mut().push(0)));
    assert_eq!(*log.borrow(), vec![0]);
    assert!(!handle.is_closed());

    timer.advance_by(Duration::from_millis(19));
    assert_eq!(*log.borrow(), vec![0]);
    timer.advance_by(Duration::from_millis(1));
    assert_eq!(*log.borrow(), vec![0, 20]);
    assert!(handle.is_closed());
  }

  #[test]
  fn cancelled_delayed_task_never_runs() {
    let timer = VirtualTimeScheduler::new();
    let scheduler = ImmediateScheduler::default().with_timer(timer.clone());
    let ran = Rc::new(Cell::new(false));
    let c_ran = ran.clone();
    let handle = scheduler.schedule_task(Duration::from_millis(5), Box::new(move || c_ran.set(true)));
    handle.unsubscribe().unwrap();
    assert_eq!(timer.pending_count(), 0);
    timer.flush();
    assert!(!ran.get());
  }

  #[test]
  fn cancelled_nested_task_is_skipped() {
    let scheduler = QueueScheduler::new();
    let ran = Rc::new(Cell::new(false));
    let (c_ran, c_scheduler) = (ran.clone(), scheduler.clone());
    scheduler.schedule_task(
      Duration::ZERO,
      Box::new(move || {
        let ran = c_ran.clone();
        let handle = c_scheduler.schedule_task(Duration::ZERO, Box::new(move || ran.set(true)));
        handle.unsubscribe().unwrap();
      }),
    );
    assert!(!ran.get());
  }

  #[test]
  fn scheduler_is_reusable_after_a_panicking_task() {
    let scheduler = ImmediateScheduler::default();
    let log = Rc::new(RefCell::new(vec![]));

    let c_log = log.clone();
    scheduler.schedule_task(Duration::ZERO, Box::new(move || c_log.borrow_mut().push(1)));

    let c_scheduler = scheduler.clone();
    let result = catch_unwind(AssertUnwindSafe(move || {
      c_scheduler.schedule_task(Duration::ZERO, Box::new(|| panic!("task failed")));
    }));
    assert!(result.is_err());

    let c_log = log.clone();
    scheduler.schedule_task(Duration::ZERO, Box::new(move || c_log.borrow_mut().push(3)));
    assert_eq!(*log.borrow(), vec![1, 3]);
  }
}
