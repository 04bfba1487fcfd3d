use super::{dispose, SubscriptionLike};

/// Unsubscribes the wrapped subscription when dropped.
///
/// Failures during that unsubscription have no caller to return to and are
/// logged instead.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }

  pub fn inner(&self) -> &T { &self.0 }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { dispose(&self.0, "subscription guard") }
}
