use std::future::Future;

use futures::channel::oneshot;

use crate::{observable::Observable, observer::Observer};

/// Remembers the last value and reports the outcome through a oneshot.
pub struct LastValueObserver<Item, Err> {
  last: Option<Item>,
  sender: Option<oneshot::Sender<Result<Option<Item>, Err>>>,
}

impl<Item, Err> Observer<Item, Err> for LastValueObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.last = Some(value); }

  fn error(&mut self, err: Err) {
    if let Some(sender) = self.sender.take() {
      let _ = sender.send(Err(err));
    }
  }

  fn complete(&mut self) {
    if let Some(sender) = self.sender.take() {
      let _ = sender.send(Ok(self.last.take()));
    }
  }

  fn is_closed(&self) -> bool { self.sender.as_ref().is_none_or(|s| s.is_canceled()) }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Subscribes now and resolves with the last value once the source
  /// completes, `Ok(None)` if it completed empty, or the error it failed with.
  ///
  /// Dropping the future unsubscribes. A source that is unsubscribed from
  /// elsewhere before terminating resolves to `Ok(None)`.
  ///
  /// ```
  /// use rxcore::prelude::*;
  ///
  /// let last = futures::executor::block_on(observable::from_iter::<_, ()>(1..=3).into_future());
  /// assert_eq!(last, Ok(Some(3)));
  /// ```
  pub fn into_future(self) -> impl Future<Output = Result<Option<Item>, Err>> {
    let (sender, receiver) = oneshot::channel();
    let guard = self
      .subscribe_with(LastValueObserver { last: None, sender: Some(sender) })
      .unsubscribe_when_dropped();
    async move {
      let _guard = guard;
      receiver.await.unwrap_or(Ok(None))
    }
  }
}
