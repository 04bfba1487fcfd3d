use crate::{observable::Observable, observer::Observer, subscriber::Subscriber};

pub struct TakeObserver<Item, Err> {
  downstream: Subscriber<Item, Err>,
  remaining: usize,
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for TakeObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    self.downstream.next(value);
    if self.remaining == 0 {
      self.downstream.complete();
    }
  }

  fn error(&mut self, err: Err) { self.downstream.error(err) }

  fn complete(&mut self) { self.downstream.complete() }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Emits only the first `count` values emitted by the source Observable.
  ///
  /// After that, it completes, regardless if the source completes, and the
  /// source is unsubscribed.
  ///
  /// # Example
  ///
  /// ```
  /// use rxcore::prelude::*;
  ///
  /// observable::from_iter::<_, ()>(0..10).take(5).subscribe(|v| println!("{v}"));
  ///
  /// // print logs:
  /// // 0
  /// // 1
  /// // 2
  /// // 3
  /// // 4
  /// ```
  pub fn take(self, count: usize) -> Observable<Item, Err> {
    if count == 0 {
      return Observable::new(|downstream| {
        downstream.complete();
        Ok(())
      });
    }
    self.lift(move |downstream| TakeObserver { downstream, remaining: count })
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use crate::{
    observable::{create, from_iter},
    subscriber::Subscriber,
  };

  #[test]
  fn base_function() {
    let completed = Rc::new(RefCell::new(false));
    let next_count = Rc::new(RefCell::new(0));
    let (c_completed, c_next_count) = (completed.clone(), next_count.clone());

    from_iter::<_, ()>(0..100).take(5).subscribe_complete(
      move |_| *c_next_count.borrow_mut() += 1,
      move || *c_completed.borrow_mut() = true,
    );

    assert_eq!(*next_count.borrow(), 5);
    assert!(*completed.borrow());
  }

  #[test]
  fn take_zero_never_subscribes_source() {
    let subscribed = Rc::new(RefCell::new(false));
    let c_subscribed = subscribed.clone();
    let completed = Rc::new(RefCell::new(false));
    let c_completed = completed.clone();
    create(move |_: Subscriber<i32, ()>| *c_subscribed.borrow_mut() = true)
      .take(0)
      .subscribe_complete(|_| {}, move || *c_completed.borrow_mut() = true);
    assert!(!*subscribed.borrow());
    assert!(*completed.borrow());
  }

  #[test]
  fn source_is_released_after_last_value() {
    let released = Rc::new(RefCell::new(false));
    let c_released = released.clone();
    create(move |s: Subscriber<i32, ()>| {
      let flag = c_released.clone();
      s.add(move || *flag.borrow_mut() = true);
      s.next(1);
    })
    .take(1)
    .subscribe(|_| {});
    assert!(*released.borrow());
  }
}
