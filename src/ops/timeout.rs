use std::time::Duration;

use crate::{
  error::TimeoutError,
  observable::Observable,
  observer::Observer,
  rc::{MutRc, RcDeref},
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::{dispose, Subscription, SubscriptionLike},
};

pub struct TimeoutObserver<Item, Err, SD> {
  downstream: Subscriber<Item, Err>,
  duration: Duration,
  scheduler: SD,
  timer: MutRc<Subscription>,
}

/// Schedules the timeout error and ties the timer to the downstream lifetime.
fn arm<Item, Err, SD>(downstream: &Subscriber<Item, Err>, duration: Duration, scheduler: &SD) -> Subscription
where
  Item: 'static,
  Err: From<TimeoutError> + 'static,
  SD: Scheduler,
{
  let c_downstream = downstream.clone();
  let timer = scheduler.schedule_task(
    duration,
    Box::new(move || c_downstream.error(TimeoutError { millis: duration.as_millis() }.into())),
  );
  downstream.add(timer.clone());
  timer
}

impl<Item, Err, SD> Observer<Item, Err> for TimeoutObserver<Item, Err, SD>
where
  Item: 'static,
  Err: From<TimeoutError> + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) {
    let previous = self.timer.replace(Subscription::closed());
    dispose(&previous, "timeout timer");
    self.downstream.next(value);
    if !self.downstream.is_closed() {
      self.timer.replace(arm(&self.downstream, self.duration, &self.scheduler));
    }
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) { self.downstream.complete() }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Errors with [`TimeoutError`] when the source stays silent for
  /// `duration`, measured from subscription and then from each value.
  ///
  /// The timer is an ordinary scheduled task owned by the execution, so the
  /// source is torn down together with it when the timeout fires. The source
  /// is subscribed before the first timer is armed, so values it emits
  /// synchronously always win.
  pub fn timeout<SD: Scheduler>(self, duration: Duration, scheduler: SD) -> Observable<Item, Err>
  where
    Err: From<TimeoutError>,
  {
    let source = self;
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let timer = MutRc::own(Subscription::closed());
      source.subscribe_child(downstream.subscription(), TimeoutObserver {
        downstream: downstream.clone(),
        duration,
        scheduler: scheduler.clone(),
        timer: timer.clone(),
      });
      if !downstream.is_closed() && timer.rc_deref().is_closed() {
        timer.replace(arm(&downstream, duration, &scheduler));
      }
      Ok(())
    })
  }
}
