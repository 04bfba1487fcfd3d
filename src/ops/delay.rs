use std::time::Duration;

use crate::{
  observable::Observable,
  observer::{Notification, Observer},
  scheduler::Scheduler,
  subscriber::Subscriber,
};

pub struct DelayObserver<Item, Err, SD> {
  downstream: Subscriber<Item, Err>,
  delay: Duration,
  scheduler: SD,
}

impl<Item: 'static, Err: 'static, SD: Scheduler> DelayObserver<Item, Err, SD> {
  fn schedule(&self, notification: Notification<Item, Err>) {
    if self.downstream.is_closed() {
      return;
    }
    let mut downstream = self.downstream.clone();
    let handle = self
      .scheduler
      .schedule_task(self.delay, Box::new(move || notification.observe(&mut downstream)));
    self.downstream.add(handle);
  }
}

impl<Item, Err, SD> Observer<Item, Err> for DelayObserver<Item, Err, SD>
where
  Item: 'static,
  Err: 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) { self.schedule(Notification::Next(value)) }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) { self.schedule(Notification::Complete) }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Shifts every value and the completion by `delay` on `scheduler`.
  ///
  /// Errors are not delayed: they are forwarded at once and drop every value
  /// still waiting.
  ///
  /// ```
  /// use std::time::Duration;
  ///
  /// use rxcore::prelude::*;
  ///
  /// let scheduler = VirtualTimeScheduler::new();
  /// let c_scheduler = scheduler.clone();
  /// observable::of::<_, ()>(1)
  ///   .delay(Duration::from_millis(50), scheduler.clone())
  ///   .subscribe(move |_| assert_eq!(c_scheduler.now(), Duration::from_millis(50)));
  /// scheduler.flush();
  /// ```
  pub fn delay<SD: Scheduler>(self, delay: Duration, scheduler: SD) -> Observable<Item, Err> {
    self.lift(move |downstream| DelayObserver {
      downstream,
      delay,
      scheduler: scheduler.clone(),
    })
  }
}
