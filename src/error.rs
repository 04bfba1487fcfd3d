use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error returned by a fallible teardown.
pub type BoxError = Box<dyn StdError + 'static>;

/// One teardown that failed while its subscription was being disposed.
#[derive(Debug, Error)]
#[error("teardown failed: {source}")]
pub struct TeardownError {
  #[source]
  source: BoxError,
}

impl TeardownError {
  pub fn new(source: impl Into<BoxError>) -> Self { Self { source: source.into() } }

  pub fn inner(&self) -> &(dyn StdError + 'static) { &*self.source }

  pub fn into_inner(self) -> BoxError { self.source }
}

/// Aggregate of every teardown that failed during a single `unsubscribe`.
///
/// All teardowns still run when one of them fails; the failures are collected
/// in the order they happened.
#[derive(Debug, Error)]
#[error("{} error(s) occurred during unsubscription: {}", .errors.len(), display_list(.errors))]
pub struct UnsubscriptionError {
  pub errors: Vec<TeardownError>,
}

impl UnsubscriptionError {
  pub fn new(errors: Vec<TeardownError>) -> Self { Self { errors } }

  pub fn len(&self) -> usize { self.errors.len() }

  pub fn is_empty(&self) -> bool { self.errors.is_empty() }
}

fn display_list(errors: &[TeardownError]) -> String {
  errors
    .iter()
    .enumerate()
    .map(|(idx, e)| format!("{}) {}", idx + 1, e.inner()))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Emitted by the `timeout` operator when the source stays silent too long.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value arrived within {millis} ms")]
pub struct TimeoutError {
  pub millis: u128,
}

/// Malformed marble diagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarbleError {
  #[error("unexpected character `{ch}` at position {pos}")]
  UnexpectedChar { ch: char, pos: usize },
  #[error("unbalanced group at position {pos}")]
  UnbalancedGroup { pos: usize },
  #[error("found a second subscription point `^` at position {pos}")]
  DuplicateSubscriptionPoint { pos: usize },
  #[error("found a second unsubscription point `!` at position {pos}")]
  DuplicateUnsubscriptionPoint { pos: usize },
  #[error("subscription marbles need a subscription point `^`")]
  MissingSubscriptionPoint,
  #[error("no value was provided for marble `{key}`")]
  UnknownValue { key: char },
  #[error("marble diagram emits an error `#` but no error value was provided")]
  MissingErrorValue,
  #[error("`^` is not allowed in a cold observable")]
  SubscriptionPointInCold,
}
