use std::rc::Rc;

use crate::{observable::Observable, observer::Observer, subscriber::Subscriber};

pub struct MapObserver<Out, Err, F> {
  downstream: Subscriber<Out, Err>,
  f: Rc<F>,
}

impl<Item, Out, Err, F> Observer<Item, Err> for MapObserver<Out, Err, F>
where
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> Out,
{
  fn next(&mut self, value: Item) { self.downstream.next((self.f)(value)) }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) { self.downstream.complete() }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

pub struct TryMapObserver<Out, Err, F> {
  downstream: Subscriber<Out, Err>,
  f: Rc<F>,
}

impl<Item, Out, Err, F> Observer<Item, Err> for TryMapObserver<Out, Err, F>
where
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> Result<Out, Err>,
{
  fn next(&mut self, value: Item) {
    match (self.f)(value) {
      Ok(out) => self.downstream.next(out),
      Err(err) => self.downstream.error(err),
    }
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) { self.downstream.complete() }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Creates a new stream which calls a closure on each element and uses its
  /// return as the value.
  pub fn map<Out, F>(self, f: F) -> Observable<Out, Err>
  where
    Out: 'static,
    F: Fn(Item) -> Out + 'static,
  {
    let f = Rc::new(f);
    self.lift(move |downstream| MapObserver { downstream, f: f.clone() })
  }

  /// Like `map`, but the closure may fail. Its `Err` becomes the error
  /// notification of the output and the source is unsubscribed.
  pub fn try_map<Out, F>(self, f: F) -> Observable<Out, Err>
  where
    Out: 'static,
    F: Fn(Item) -> Result<Out, Err> + 'static,
  {
    let f = Rc::new(f);
    self.lift(move |downstream| TryMapObserver { downstream, f: f.clone() })
  }
}
