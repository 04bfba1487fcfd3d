use crate::observable::{from_iter, IntoObservable, Observable};

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Projects each value to an inner observable and subscribes them one after
  /// another. Values that arrive while an inner is running are buffered.
  ///
  /// # Example
  ///
  /// ```
  /// use rxcore::prelude::*;
  ///
  /// observable::from_iter::<_, ()>(1..=2)
  ///   .concat_map(|v| observable::from_iter(vec![v, v * 10]))
  ///   .subscribe(|v| println!("{v}"));
  ///
  /// // print logs:
  /// // 1
  /// // 10
  /// // 2
  /// // 20
  /// ```
  pub fn concat_map<Out, S, F>(self, project: F) -> Observable<Out, Err>
  where
    Out: 'static,
    S: IntoObservable<Out, Err>,
    F: Fn(Item) -> S + 'static,
  {
    self.merge_map(project, 1)
  }

  /// Flattens a higher-order observable one inner at a time.
  pub fn concat_all<Out>(self) -> Observable<Out, Err>
  where
    Out: 'static,
    Item: IntoObservable<Out, Err>,
  {
    self.merge_all(1)
  }

  /// Emits the values of this observable, then those of `other`.
  pub fn concat_with(self, other: impl IntoObservable<Item, Err>) -> Observable<Item, Err> {
    concat(vec![self, other.into_observable()])
  }
}

/// Subscribes each source only after the previous one completed.
pub fn concat<Item, Err, S>(sources: impl IntoIterator<Item = S>) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  S: IntoObservable<Item, Err>,
{
  let sources: Vec<Observable<Item, Err>> =
    sources.into_iter().map(IntoObservable::into_observable).collect();
  from_iter(sources).concat_all()
}
