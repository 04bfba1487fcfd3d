use std::rc::Rc;

use crate::{observable::Observable, subscriber::Subscriber};

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Calls `f` once when the execution ends, whether it completed, errored or
  /// was unsubscribed.
  pub fn finalize(self, f: impl Fn() + 'static) -> Observable<Item, Err> {
    let f = Rc::new(f);
    let source = self;
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      source.subscribe_child(downstream.subscription(), downstream.clone());
      let f = f.clone();
      downstream.add(move || f());
      Ok(())
    })
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use crate::{
    observable::{from_iter, never, throw_err},
    subscription::SubscriptionLike,
  };

  #[test]
  fn runs_on_every_kind_of_end() {
    let count = Rc::new(RefCell::new(0));

    let c_count = count.clone();
    from_iter::<_, ()>(vec![1])
      .finalize(move || *c_count.borrow_mut() += 1)
      .subscribe(|_| {});
    assert_eq!(*count.borrow(), 1);

    let c_count = count.clone();
    throw_err::<i32, _>("e")
      .finalize(move || *c_count.borrow_mut() += 1)
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(*count.borrow(), 2);

    let c_count = count.clone();
    let subscription = never::<i32, ()>()
      .finalize(move || *c_count.borrow_mut() += 1)
      .subscribe(|_| {});
    assert_eq!(*count.borrow(), 2);
    subscription.unsubscribe().unwrap();
    subscription.unsubscribe().unwrap();
    assert_eq!(*count.borrow(), 3);
  }
}
