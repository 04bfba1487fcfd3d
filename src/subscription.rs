//! Disposable resource handles.
//!
//! A [`Subscription`] owns an ordered list of teardowns. Unsubscribing closes
//! it exactly once and runs every teardown in the order it was added. A failing
//! teardown does not stop the rest: failures are collected into one
//! [`UnsubscriptionError`].
//!
//! Subscriptions nest. Adding a `Subscription` to another one makes the parent
//! tear the child down, and the child keeps a weak back-link so that it can
//! detach itself from the parent when it is disposed on its own.

use std::fmt::{Debug, Formatter};

use smallvec::SmallVec;

use crate::{
  error::{BoxError, TeardownError, UnsubscriptionError},
  rc::{MutRc, RcDeref, RcDerefMut, WeakMutRc},
};

mod guard;

pub use guard::SubscriptionGuard;

/// Anything that can release the resources of an execution.
pub trait SubscriptionLike {
  /// Releases the resources. Calling it again is a no-op returning `Ok`.
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError>;

  fn is_closed(&self) -> bool;
}

impl<T: ?Sized + SubscriptionLike> SubscriptionLike for Box<T> {
  #[inline]
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError> { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

impl<T: SubscriptionLike> SubscriptionLike for Option<T> {
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError> {
    self.as_ref().map_or(Ok(()), SubscriptionLike::unsubscribe)
  }

  fn is_closed(&self) -> bool { self.as_ref().is_none_or(SubscriptionLike::is_closed) }
}

/// Unsubscribes where no caller can receive the failure; failures are logged.
pub(crate) fn dispose(subscription: &impl SubscriptionLike, site: &'static str) {
  if let Err(err) = subscription.unsubscribe() {
    tracing::warn!(site, error = %err, "teardown failed while disposing");
  }
}

// ============================================================================
// Teardown
// ============================================================================

/// One entry of a subscription's teardown list.
pub enum Teardown {
  /// Infallible cleanup closure.
  Fn(Box<dyn FnOnce()>),
  /// Cleanup closure that may fail.
  TryFn(Box<dyn FnOnce() -> Result<(), BoxError>>),
  /// Nested subscription owned by the parent.
  Subscription(Subscription),
  /// Any other object exposing an unsubscribe capability.
  Boxed(Box<dyn SubscriptionLike>),
}

impl Teardown {
  pub fn try_from_fn<F, E>(f: F) -> Self
  where
    F: FnOnce() -> Result<(), E> + 'static,
    E: Into<BoxError>,
  {
    Teardown::TryFn(Box::new(move || f().map_err(Into::into)))
  }

  pub fn boxed(subscription: impl SubscriptionLike + 'static) -> Self {
    Teardown::Boxed(Box::new(subscription))
  }

  fn execute(self, errors: &mut Vec<TeardownError>) {
    match self {
      Teardown::Fn(f) => f(),
      Teardown::TryFn(f) => {
        if let Err(e) = f() {
          errors.push(TeardownError::new(e));
        }
      }
      Teardown::Subscription(s) => {
        if let Err(agg) = s.unsubscribe() {
          errors.extend(agg.errors);
        }
      }
      Teardown::Boxed(b) => {
        if let Err(agg) = b.unsubscribe() {
          errors.extend(agg.errors);
        }
      }
    }
  }
}

impl<F: FnOnce() + 'static> From<F> for Teardown {
  fn from(f: F) -> Self { Teardown::Fn(Box::new(f)) }
}

impl From<Subscription> for Teardown {
  fn from(s: Subscription) -> Self { Teardown::Subscription(s) }
}

impl Debug for Teardown {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Teardown::Fn(_) => f.write_str("Teardown::Fn"),
      Teardown::TryFn(_) => f.write_str("Teardown::TryFn"),
      Teardown::Subscription(s) => f.debug_tuple("Teardown::Subscription").field(s).finish(),
      Teardown::Boxed(b) => f
        .debug_struct("Teardown::Boxed")
        .field("is_closed", &b.is_closed())
        .finish(),
    }
  }
}

/// Handle returned by [`Subscription::add`], used to `remove` the entry again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TeardownKey(usize);

// ============================================================================
// Subscription
// ============================================================================

#[derive(Default)]
struct Inner {
  closed: bool,
  next_key: usize,
  teardowns: SmallVec<[(TeardownKey, Teardown); 2]>,
  parents: SmallVec<[(WeakMutRc<Inner>, TeardownKey); 1]>,
}

impl Inner {
  fn take_entry(&mut self, key: TeardownKey) -> Option<Teardown> {
    let pos = self.teardowns.iter().position(|(k, _)| *k == key)?;
    Some(self.teardowns.remove(pos).1)
  }
}

/// The resource handle of one execution.
#[derive(Clone, Default)]
pub struct Subscription(MutRc<Inner>);

impl Subscription {
  pub fn new() -> Self { Self::default() }

  /// A subscription that is already closed.
  pub fn closed() -> Self {
    let s = Self::default();
    s.0.rc_deref_mut().closed = true;
    s
  }

  /// Creates a subscription whose only teardown is `f`.
  pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
    let s = Self::default();
    s.add(f);
    s
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { self.0.ptr_eq(&other.0) }

  /// Number of teardowns currently stored.
  pub fn teardown_size(&self) -> usize { self.0.rc_deref().teardowns.len() }

  /// Adds a teardown.
  ///
  /// If this subscription is already closed the teardown runs right away and
  /// is not stored. Adding a subscription to itself, or adding a child that is
  /// already closed, does nothing.
  pub fn add(&self, teardown: impl Into<Teardown>) -> TeardownKey {
    let teardown = teardown.into();
    if let Teardown::Subscription(child) = &teardown {
      if child.ptr_eq(self) || child.is_closed() {
        return TeardownKey(usize::MAX);
      }
    }

    let mut inner = self.0.rc_deref_mut();
    if inner.closed {
      drop(inner);
      let mut errors = vec![];
      teardown.execute(&mut errors);
      if !errors.is_empty() {
        let err = UnsubscriptionError::new(errors);
        tracing::warn!(error = %err, "teardown added to a closed subscription failed");
      }
      return TeardownKey(usize::MAX);
    }

    let key = TeardownKey(inner.next_key);
    inner.next_key += 1;
    if let Teardown::Subscription(child) = &teardown {
      child.0.rc_deref_mut().parents.push((self.0.downgrade(), key));
    }
    inner.teardowns.push((key, teardown));
    key
  }

  /// Detaches a previously added teardown without running it.
  pub fn remove(&self, key: TeardownKey) -> bool {
    let removed = self.0.rc_deref_mut().take_entry(key);
    match removed {
      Some(Teardown::Subscription(child)) => {
        child.forget_parent(&self.0);
        true
      }
      Some(_) => true,
      None => false,
    }
  }

  /// Detaches `child` without unsubscribing it.
  pub fn remove_child(&self, child: &Subscription) -> bool {
    let key = self.0.rc_deref().teardowns.iter().find_map(|(k, t)| match t {
      Teardown::Subscription(s) if s.ptr_eq(child) => Some(*k),
      _ => None,
    });
    key.is_some_and(|key| self.remove(key))
  }

  fn forget_parent(&self, parent: &MutRc<Inner>) {
    if let Some(mut inner) = self.0.try_rc_deref_mut() {
      inner
        .parents
        .retain(|(p, _)| p.upgrade().is_some_and(|p| !p.ptr_eq(parent)));
    }
  }

  /// Activates "RAII" behavior for this subscription: `unsubscribe()` is
  /// called as soon as the returned guard goes out of scope.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self> { SubscriptionGuard(self) }
}

impl SubscriptionLike for Subscription {
  fn unsubscribe(&self) -> Result<(), UnsubscriptionError> {
    let (teardowns, parents) = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        return Ok(());
      }
      inner.closed = true;
      (std::mem::take(&mut inner.teardowns), std::mem::take(&mut inner.parents))
    };

    // Detach from long-lived parents first so they stop referencing us.
    for (parent, key) in parents {
      if let Some(parent) = parent.upgrade() {
        if let Some(mut parent) = parent.try_rc_deref_mut() {
          let _ = parent.take_entry(key);
        }
      }
    }

    let mut errors = vec![];
    for (_, teardown) in teardowns {
      teardown.execute(&mut errors);
    }
    if errors.is_empty() { Ok(()) } else { Err(UnsubscriptionError::new(errors)) }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.rc_deref().closed }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.0.try_rc_deref_mut() {
      Some(inner) => f
        .debug_struct("Subscription")
        .field("closed", &inner.closed)
        .field("teardown_count", &inner.teardowns.len())
        .finish(),
      None => f.write_str("Subscription(<busy>)"),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;

  fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce()>) {
    let log = Rc::new(RefCell::new(vec![]));
    let c_log = log.clone();
    let make = move |name: &'static str| {
      let log = c_log.clone();
      Box::new(move || log.borrow_mut().push(name)) as Box<dyn FnOnce()>
    };
    (log, make)
  }

  #[test]
  fn add_remove() {
    let local = Subscription::default();
    let l1 = Subscription::default();
    let l2 = Subscription::default();
    let l3 = Subscription::default();
    local.add(l1.clone());
    assert_eq!(local.teardown_size(), 1);
    let k2 = local.add(l2);
    assert_eq!(local.teardown_size(), 2);
    local.add(l3);
    assert_eq!(local.teardown_size(), 3);

    assert!(local.remove(k2));
    assert!(local.remove_child(&l1));
    assert_eq!(local.teardown_size(), 1);
    assert!(!l1.is_closed());
  }

  #[test]
  fn unsubscribe_runs_teardowns_once_in_declaration_order() {
    let (log, make) = recorder();
    let s = Subscription::new();
    s.add(make("a"));
    s.add(make("b"));
    let child = Subscription::from_fn(make("child"));
    s.add(child);
    s.add(make("c"));

    s.unsubscribe().unwrap();
    s.unsubscribe().unwrap();
    assert_eq!(*log.borrow(), vec!["a", "b", "child", "c"]);
    assert!(s.is_closed());
  }

  #[test]
  fn add_after_close_runs_immediately() {
    let (log, make) = recorder();
    let s = Subscription::closed();
    s.add(make("late"));
    assert_eq!(*log.borrow(), vec!["late"]);
    assert_eq!(s.teardown_size(), 0);
  }

  #[test]
  fn failing_teardown_does_not_stop_others() {
    let (log, make) = recorder();
    let s = Subscription::new();
    s.add(make("first"));
    s.add(Teardown::try_from_fn(|| Err::<(), _>("second failed")));
    s.add(make("third"));

    let err = s.unsubscribe().unwrap_err();
    assert_eq!(*log.borrow(), vec!["first", "third"]);
    assert_eq!(err.len(), 1);
    assert_eq!(err.errors[0].inner().to_string(), "second failed");
  }

  #[test]
  fn nested_errors_are_flattened() {
    let parent = Subscription::new();
    let child = Subscription::new();
    child.add(Teardown::try_from_fn(|| Err::<(), _>("inner")));
    parent.add(child);
    parent.add(Teardown::try_from_fn(|| Err::<(), _>("outer")));

    let err = parent.unsubscribe().unwrap_err();
    let msgs: Vec<_> = err.errors.iter().map(|e| e.inner().to_string()).collect();
    assert_eq!(msgs, vec!["inner", "outer"]);
  }

  #[test]
  fn child_detaches_from_parent_when_closed_alone() {
    let parent = Subscription::new();
    let child = Subscription::new();
    parent.add(child.clone());
    assert_eq!(parent.teardown_size(), 1);

    child.unsubscribe().unwrap();
    assert_eq!(parent.teardown_size(), 0);
    assert!(!parent.is_closed());
  }

  #[test]
  fn adding_self_is_ignored() {
    let s = Subscription::new();
    s.add(s.clone());
    assert_eq!(s.teardown_size(), 0);
  }

  #[test]
  fn guard_unsubscribes_on_drop() {
    let (log, make) = recorder();
    {
      let _guard = Subscription::from_fn(make("dropped")).unsubscribe_when_dropped();
    }
    assert_eq!(*log.borrow(), vec!["dropped"]);
  }

  #[test]
  fn boxed_subscription_like_is_accepted() {
    let inner = Subscription::new();
    let s = Subscription::new();
    s.add(Teardown::boxed(inner.clone()));
    s.unsubscribe().unwrap();
    assert!(inner.is_closed());
  }
}
