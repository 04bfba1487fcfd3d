use std::time::Duration;

use crate::{observable::Observable, scheduler::Scheduler, subscriber::Subscriber};

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Subscribes to the source from a task on `scheduler` instead of on the
  /// caller's stack. Unsubscribing before the task runs cancels it.
  pub fn subscribe_on<SD: Scheduler>(self, scheduler: SD) -> Observable<Item, Err> {
    let source = self;
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let c_source = source.clone();
      let c_downstream = downstream.clone();
      let handle = scheduler.schedule_task(
        Duration::ZERO,
        Box::new(move || {
          if !c_downstream.is_closed() {
            c_source.subscribe_child(c_downstream.subscription(), c_downstream.clone());
          }
        }),
      );
      downstream.add(handle);
      Ok(())
    })
  }
}
