use std::time::Duration;

use crate::{observable::Observable, scheduler::Scheduler, subscriber::Subscriber};

/// Creates an observable producing multiple values.
///
/// Completes immediately after emitting the values given. Never emits an error.
///
/// # Examples
///
/// ```
/// use rxcore::{of_sequence, prelude::*};
///
/// let source: Observable<i32, ()> = of_sequence!(1, 2, 3);
/// source.subscribe(|v| println!("{v},"));
///
/// // print log:
/// // 1
/// // 2
/// // 3
/// ```
#[macro_export]
macro_rules! of_sequence {
  ( $( $item:expr ),* $(,)? ) => {
    $crate::observable::from_iter(vec![$( $item ),*])
  };
}

/// Creates an observable producing a single value, then completing.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::of::<_, ()>(123).subscribe(|v| println!("{v},"));
/// ```
pub fn of<Item, Err>(value: Item) -> Observable<Item, Err>
where
  Item: Clone + 'static,
  Err: 'static,
{
  Observable::new(move |subscriber| {
    subscriber.next(value.clone());
    subscriber.complete();
    Ok(())
  })
}

/// Emits every element of `iter` synchronously, then completes.
///
/// Emission stops as soon as the subscriber is closed, so an infinite
/// iterator is fine when the downstream limits it (for example with `take`).
pub fn from_iter<I, Err>(iter: I) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + 'static,
  I::Item: 'static,
  Err: 'static,
{
  Observable::new(move |subscriber| {
    for value in iter.clone() {
      if subscriber.is_closed() {
        return Ok(());
      }
      subscriber.next(value);
    }
    subscriber.complete();
    Ok(())
  })
}

/// Emits every element of `iter` as a separate action on `scheduler`.
///
/// Each value is one scheduler action that reschedules itself for the next
/// value, so other work interleaves between emissions.
pub fn from_iter_on<I, Err, S>(iter: I, scheduler: S) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + 'static,
  I::IntoIter: 'static,
  I::Item: 'static,
  Err: 'static,
  S: Scheduler,
{
  Observable::new(move |subscriber: Subscriber<I::Item, Err>| {
    let sink = subscriber.clone();
    let action = scheduler.schedule(
      move |mut it: I::IntoIter, recurse| match it.next() {
        Some(value) => {
          sink.next(value);
          if !sink.is_closed() {
            recurse.schedule(it, Duration::ZERO);
          }
        }
        None => sink.complete(),
      },
      Duration::ZERO,
      iter.clone().into_iter(),
    );
    subscriber.add(action);
    Ok(())
  })
}

/// Emits the integers `start .. start + count`, then completes.
pub fn range<Err: 'static>(start: i64, count: u64) -> Observable<i64, Err> {
  let end = start.saturating_add(i64::try_from(count).unwrap_or(i64::MAX));
  from_iter(start..end)
}

/// Completes immediately without emitting.
pub fn empty<Item: 'static, Err: 'static>() -> Observable<Item, Err> {
  Observable::new(|subscriber| {
    subscriber.complete();
    Ok(())
  })
}

/// Never emits and never terminates.
pub fn never<Item: 'static, Err: 'static>() -> Observable<Item, Err> {
  Observable::new(|_| Ok(()))
}

/// Emits `err` immediately as an error notification.
pub fn throw_err<Item, Err>(err: Err) -> Observable<Item, Err>
where
  Item: 'static,
  Err: Clone + 'static,
{
  Observable::new(move |_| Err(err.clone()))
}
