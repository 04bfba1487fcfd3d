use std::rc::Rc;

use crate::{observable::Observable, observer::Observer, subscriber::Subscriber};

pub struct FilterObserver<Item, Err, F> {
  downstream: Subscriber<Item, Err>,
  predicate: Rc<F>,
}

impl<Item, Err, F> Observer<Item, Err> for FilterObserver<Item, Err, F>
where
  Item: 'static,
  Err: 'static,
  F: Fn(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.downstream.next(value)
    }
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) { self.downstream.complete() }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Emits only the values that satisfy `predicate`.
  pub fn filter<F>(self, predicate: F) -> Observable<Item, Err>
  where
    F: Fn(&Item) -> bool + 'static,
  {
    let predicate = Rc::new(predicate);
    self.lift(move |downstream| FilterObserver { downstream, predicate: predicate.clone() })
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use crate::observable::from_iter;

  #[test]
  fn keeps_matching_values() {
    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    from_iter::<_, ()>(0..10)
      .filter(|v| v % 3 == 0)
      .subscribe(move |v| c_seen.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![0, 3, 6, 9]);
  }
}
