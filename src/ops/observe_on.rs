use std::time::Duration;

use crate::{
  observable::Observable,
  observer::{Notification, Observer},
  scheduler::Scheduler,
  subscriber::Subscriber,
};

pub struct ObserveOnObserver<Item, Err, SD> {
  downstream: Subscriber<Item, Err>,
  scheduler: SD,
}

impl<Item: 'static, Err: 'static, SD: Scheduler> ObserveOnObserver<Item, Err, SD> {
  fn schedule(&self, notification: Notification<Item, Err>) {
    if self.downstream.is_closed() {
      return;
    }
    let mut downstream = self.downstream.clone();
    let handle = self
      .scheduler
      .schedule_task(Duration::ZERO, Box::new(move || notification.observe(&mut downstream)));
    self.downstream.add(handle);
  }
}

impl<Item, Err, SD> Observer<Item, Err> for ObserveOnObserver<Item, Err, SD>
where
  Item: 'static,
  Err: 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) { self.schedule(Notification::Next(value)) }

  fn error(&mut self, err: Err) { self.schedule(Notification::Error(err)) }

  fn complete(&mut self) { self.schedule(Notification::Complete) }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Re-emits every notification of the source as a task on `scheduler`.
  ///
  /// Notifications keep their order. Unsubscribing cancels the ones that are
  /// still pending.
  pub fn observe_on<SD: Scheduler>(self, scheduler: SD) -> Observable<Item, Err> {
    self.lift(move |downstream| ObserveOnObserver { downstream, scheduler: scheduler.clone() })
  }
}
