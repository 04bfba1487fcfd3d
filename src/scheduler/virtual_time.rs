use std::{
  cell::Cell,
  cmp::Ordering,
  collections::BinaryHeap,
  rc::Rc,
  time::Duration,
};

use crate::{
  rc::{MutRc, RcDeref, RcDerefMut},
  scheduler::{ActiveFlag, Scheduler, Task},
  subscription::{dispose, Subscription, SubscriptionLike},
};

struct VirtualAction {
  due: Duration,
  index: usize,
  task: Task,
  handle: Subscription,
}

// Reversed so the `BinaryHeap` pops the earliest due time first, and the
// earliest scheduled action among equal due times.
impl Ord for VirtualAction {
  fn cmp(&self, other: &Self) -> Ordering {
    other.due.cmp(&self.due).then_with(|| other.index.cmp(&self.index))
  }
}

impl PartialOrd for VirtualAction {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for VirtualAction {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.index == other.index }
}

impl Eq for VirtualAction {}

struct VirtualState {
  now: Duration,
  next_index: usize,
  max_frames: Duration,
  queue: BinaryHeap<VirtualAction>,
}

/// A scheduler whose clock only moves when told to.
///
/// Scheduled actions sit in a queue ordered by `(due time, scheduling order)`
/// and run when the clock is advanced with [`flush`](Self::flush),
/// [`advance_by`](Self::advance_by) or [`advance_to`](Self::advance_to).
/// Running asynchronous pipelines against it makes them fully deterministic.
///
/// ```
/// use std::{cell::RefCell, rc::Rc, time::Duration};
///
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// let log = Rc::new(RefCell::new(vec![]));
/// for (value, delay) in [(1, 0), (2, 100), (3, 0)] {
///   let log = log.clone();
///   scheduler.schedule(
///     move |v, _| log.borrow_mut().push(v),
///     Duration::from_millis(delay),
///     value,
///   );
/// }
/// scheduler.flush();
/// assert_eq!(*log.borrow(), vec![1, 3, 2]);
/// ```
#[derive(Clone)]
pub struct VirtualTimeScheduler {
  state: MutRc<VirtualState>,
  flushing: Rc<Cell<bool>>,
}

impl VirtualTimeScheduler {
  pub fn new() -> Self {
    Self {
      state: MutRc::own(VirtualState {
        now: Duration::ZERO,
        next_index: 0,
        max_frames: Duration::MAX,
        queue: BinaryHeap::new(),
      }),
      flushing: Rc::new(Cell::new(false)),
    }
  }

  /// Actions due after `max_frames` are never run by `flush`.
  pub fn with_max_frames(self, max_frames: Duration) -> Self {
    self.state.rc_deref_mut().max_frames = max_frames;
    self
  }

  pub fn max_frames(&self) -> Duration { self.state.rc_deref().max_frames }

  /// Runs every queued action in virtual-time order, including actions
  /// scheduled while flushing, up to `max_frames`.
  pub fn flush(&self) {
    let limit = self.max_frames();
    self.run_until(limit);
  }

  /// Moves the clock forward by `by`, running every action due on the way.
  pub fn advance_by(&self, by: Duration) {
    let target = self.now().saturating_add(by);
    self.advance_to(target);
  }

  /// Moves the clock to `time`, running every action due on the way. The
  /// clock never moves backwards.
  pub fn advance_to(&self, time: Duration) {
    self.run_until(time);
    let mut state = self.state.rc_deref_mut();
    if state.now < time {
      state.now = time;
    }
  }

  /// Number of actions still waiting to run.
  pub fn pending_count(&self) -> usize {
    self.state.rc_deref().queue.iter().filter(|a| !a.handle.is_closed()).count()
  }

  pub fn is_flushing(&self) -> bool { self.flushing.get() }

  fn run_until(&self, limit: Duration) {
    // A flush triggered from inside an action is already covered by the outer
    // loop.
    if self.flushing.get() {
      return;
    }
    self.flushing.set(true);
    let _flushing = ActiveFlag(self.flushing.clone());
    let _cancel = CancelOnUnwind(&self.state);
    tracing::debug!(now = ?self.now(), ?limit, "virtual time flush started");

    loop {
      let action = {
        let mut state = self.state.rc_deref_mut();
        match state.queue.peek() {
          Some(action) if action.due <= limit => state.queue.pop(),
          _ => None,
        }
      };
      let Some(VirtualAction { due, task, handle, index }) = action else {
        break;
      };
      // Cancelled work leaves the clock where it is.
      if handle.is_closed() {
        tracing::trace!(index, "virtual action cancelled");
        continue;
      }
      {
        let mut state = self.state.rc_deref_mut();
        if due > state.now {
          state.now = due;
        }
      }
      tracing::trace!(index, "virtual action executed");
      task();
      dispose(&handle, "virtual action");
    }
    tracing::debug!(now = ?self.now(), "virtual time flush finished");
  }
}

impl Default for VirtualTimeScheduler {
  fn default() -> Self { Self::new() }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Duration { self.state.rc_deref().now }

  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription {
    let handle = Subscription::new();
    let mut state = self.state.rc_deref_mut();
    let due = state.now.saturating_add(delay);
    let index = state.next_index;
    state.next_index += 1;
    state.queue.push(VirtualAction { due, index, task, handle: handle.clone() });
    tracing::trace!(?due, index, "virtual action scheduled");
    handle
  }
}

/// Cancels the remaining queue when an action unwinds out of a flush.
struct CancelOnUnwind<'a>(&'a MutRc<VirtualState>);

impl Drop for CancelOnUnwind<'_> {
  fn drop(&mut self) {
    if !std::thread::panicking() {
      return;
    }
    let dropped = match self.0.try_rc_deref_mut() {
      Some(mut state) => std::mem::take(&mut state.queue).into_vec(),
      None => return,
    };
    for VirtualAction { handle, .. } in dropped {
      dispose(&handle, "virtual time unwind");
    }
  }
}
