use crate::{
  observable::{IntoObservable, Observable},
  subscriber::Subscriber,
};

/// Creates an observable from a producer function.
///
/// The producer runs once per subscription with the safe sink of that
/// execution. Resources it allocates are released by registering a teardown
/// with [`Subscriber::add`]; a teardown added after the producer already
/// completed runs immediately.
///
/// # Example
///
/// ```
/// use rxcore::prelude::*;
///
/// let source = observable::create(|s: Subscriber<i32, ()>| {
///   s.next(1);
///   s.next(2);
///   s.complete();
///   s.add(|| println!("released"));
/// });
/// source.subscribe(|v| println!("{v}"));
/// ```
pub fn create<Item, Err>(producer: impl Fn(Subscriber<Item, Err>) + 'static) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  Observable::new(move |subscriber| {
    producer(subscriber);
    Ok(())
  })
}

/// Like [`create`] but the producer may fail. A returned `Err` is delivered as
/// the error notification of the execution.
pub fn try_create<Item, Err>(
  producer: impl Fn(&Subscriber<Item, Err>) -> Result<(), Err> + 'static,
) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  Observable::new(move |subscriber| producer(&subscriber))
}

/// Creates the observable lazily, calling `factory` on every subscription.
pub fn defer<Item, Err, S>(factory: impl Fn() -> S + 'static) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  S: IntoObservable<Item, Err>,
{
  Observable::new(move |subscriber| {
    factory().into_observable().run(subscriber);
    Ok(())
  })
}
