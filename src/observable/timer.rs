use std::time::Duration;

use crate::{observable::Observable, scheduler::Scheduler, subscriber::Subscriber};

/// Emits `0` after `delay` on `scheduler`, then completes.
pub fn timer<Err, S>(delay: Duration, scheduler: S) -> Observable<usize, Err>
where
  Err: 'static,
  S: Scheduler,
{
  Observable::new(move |subscriber: Subscriber<usize, Err>| {
    let sink = subscriber.clone();
    let action = scheduler.schedule(
      move |_, _| {
        sink.next(0);
        sink.complete();
      },
      delay,
      (),
    );
    subscriber.add(action);
    Ok(())
  })
}

/// Emits an increasing counter every `period` on `scheduler`. Never completes.
///
/// The counter is the state of one recurring scheduler action, so the whole
/// sequence costs a single scheduled action at a time.
///
/// ```
/// use std::time::Duration;
///
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// let ticks = std::rc::Rc::new(std::cell::RefCell::new(vec![]));
/// let c_ticks = ticks.clone();
/// observable::interval::<(), _>(Duration::from_millis(10), scheduler.clone())
///   .take(3)
///   .subscribe(move |v| c_ticks.borrow_mut().push(v));
/// scheduler.flush();
/// assert_eq!(*ticks.borrow(), vec![0, 1, 2]);
/// ```
pub fn interval<Err, S>(period: Duration, scheduler: S) -> Observable<usize, Err>
where
  Err: 'static,
  S: Scheduler,
{
  Observable::new(move |subscriber: Subscriber<usize, Err>| {
    let sink = subscriber.clone();
    let action = scheduler.schedule(
      move |count: usize, recurse| {
        sink.next(count);
        if !sink.is_closed() {
          recurse.schedule(count + 1, period);
        }
      },
      period,
      0,
    );
    subscriber.add(action);
    Ok(())
  })
}
