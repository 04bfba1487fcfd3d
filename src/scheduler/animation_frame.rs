use std::mem;

use crate::{
  rc::{MutRc, RcDeref, RcDerefMut},
  scheduler::{AsyncScheduler, Duration, Scheduler, Task},
  subscription::{dispose, Subscription, SubscriptionLike},
};

/// Default frame interval, roughly 60 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

struct FrameState {
  interval: Duration,
  queue: Vec<(Task, Subscription)>,
  requested: bool,
  frames: u64,
}

/// Batches zero-delay work into frame ticks.
///
/// Everything scheduled without delay between two ticks runs together on the
/// next tick, in scheduling order. Work scheduled while a frame is running
/// lands in the following frame. Delayed work waits on the underlying
/// [`AsyncScheduler`] first and then runs like any other task.
#[derive(Clone)]
pub struct AnimationFrameScheduler {
  timer: AsyncScheduler,
  state: MutRc<FrameState>,
}

impl AnimationFrameScheduler {
  pub fn new(timer: AsyncScheduler) -> Self {
    Self {
      timer,
      state: MutRc::own(FrameState {
        interval: DEFAULT_FRAME_INTERVAL,
        queue: vec![],
        requested: false,
        frames: 0,
      }),
    }
  }

  pub fn with_frame_interval(self, interval: Duration) -> Self {
    self.state.rc_deref_mut().interval = interval;
    self
  }

  /// Number of frames that ran so far.
  pub fn frame_count(&self) -> u64 { self.state.rc_deref().frames }

  fn request_frame(&self) {
    let wait = {
      let mut state = self.state.rc_deref_mut();
      if state.requested {
        return;
      }
      state.requested = true;
      let interval = state.interval.as_nanos().max(1);
      let elapsed = self.timer.now().as_nanos() % interval;
      Duration::from_nanos((interval - elapsed) as u64)
    };
    let this = self.clone();
    self.timer.schedule_task(wait, Box::new(move || this.run_frame()));
  }

  fn run_frame(&self) {
    let batch = {
      let mut state = self.state.rc_deref_mut();
      state.requested = false;
      state.frames += 1;
      mem::take(&mut state.queue)
    };
    tracing::trace!(tasks = batch.len(), "animation frame");
    for (task, handle) in batch {
      if !handle.is_closed() {
        task();
        dispose(&handle, "animation frame task");
      }
    }
  }
}

impl Scheduler for AnimationFrameScheduler {
  fn now(&self) -> Duration { self.timer.now() }

  fn schedule_task(&self, delay: Duration, task: Task) -> Subscription {
    if !delay.is_zero() {
      return self.timer.schedule_task(delay, task);
    }
    let handle = Subscription::new();
    self.state.rc_deref_mut().queue.push((task, handle.clone()));
    self.request_frame();
    handle
  }
}
