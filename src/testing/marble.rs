//! Marble diagram parsing.
//!
//! | Marble | Meaning |
//! |--------|---------|
//! | `-` | one frame of virtual time (1 ms) passes |
//! | ` ` | ignored, use it to align diagrams |
//! | `a`..`z`, `0`..`9` | a value, looked up by key |
//! | `\|` | completion |
//! | `#` | error |
//! | `(ab)` | a synchronous group, all in one frame |
//! | `^` | subscription point of a hot observable |
//! | `!` | unsubscription point, subscription marbles only |
//! | `10ms`, `2s` | time progression, must stand between spaces |
//!
//! Every value, terminal and `^` outside of a group occupies one frame. A group
//! occupies one frame as a whole.

use crate::{error::MarbleError, observer::Notification};

/// A notification at a virtual frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMessage<Item, Err> {
  pub frame: u64,
  pub notification: Notification<Item, Err>,
}

impl<Item, Err> TestMessage<Item, Err> {
  pub fn next(frame: u64, value: Item) -> Self {
    Self { frame, notification: Notification::Next(value) }
  }

  pub fn error(frame: u64, err: Err) -> Self {
    Self { frame, notification: Notification::Error(err) }
  }

  pub fn complete(frame: u64) -> Self { Self { frame, notification: Notification::Complete } }
}

/// When a test observable was subscribed and unsubscribed, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionLog {
  pub subscribed: u64,
  pub unsubscribed: Option<u64>,
}

/// A parsed observable diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marbles<Item, Err> {
  /// Messages with frames relative to the subscription point.
  pub messages: Vec<TestMessage<Item, Err>>,
  /// Frame of `^`, if the diagram has one.
  pub subscription_frame: Option<u64>,
}

enum Token {
  Frame,
  Progress(u64),
  Key(char),
  Complete,
  Error,
  GroupStart,
  GroupEnd,
  Subscribe,
  Unsubscribe,
}

/// Splits a diagram into tokens with their character positions.
fn tokenize(marbles: &str) -> Vec<(usize, Token)> {
  let chars: Vec<char> = marbles.chars().collect();
  let mut tokens = vec![];
  let mut pos = 0;
  while pos < chars.len() {
    let ch = chars[pos];
    let at_boundary = pos == 0 || chars[pos - 1] == ' ';
    if ch.is_ascii_digit() && at_boundary {
      if let Some((millis, len)) = time_progression(&chars[pos..]) {
        tokens.push((pos, Token::Progress(millis)));
        pos += len;
        continue;
      }
    }
    let token = match ch {
      ' ' => None,
      '-' => Some(Token::Frame),
      '|' => Some(Token::Complete),
      '#' => Some(Token::Error),
      '(' => Some(Token::GroupStart),
      ')' => Some(Token::GroupEnd),
      '^' => Some(Token::Subscribe),
      '!' => Some(Token::Unsubscribe),
      c => Some(Token::Key(c)),
    };
    if let Some(token) = token {
      tokens.push((pos, token));
    }
    pos += 1;
  }
  tokens
}

/// Matches `<digits>ms` or `<digits>s` followed by a space or the end.
fn time_progression(chars: &[char]) -> Option<(u64, usize)> {
  let digits = chars.iter().take_while(|c| c.is_ascii_digit()).count();
  let number: u64 = chars[..digits].iter().collect::<String>().parse().ok()?;
  let rest = &chars[digits..];
  let (scale, unit_len) = match rest {
    ['m', 's', ..] => (1, 2),
    ['s', ..] => (1000, 1),
    _ => return None,
  };
  let len = digits + unit_len;
  match chars.get(len) {
    None | Some(' ') => Some((number.checked_mul(scale)?, len)),
    _ => None,
  }
}

/// Parses an observable diagram.
///
/// `values` maps keys to values and `error` is the value `#` stands for. With
/// `allow_subscription_point` unset, `^` is rejected, which is what cold
/// observables and expectations want. Messages before `^` are dropped since
/// no subscriber can observe them.
pub fn parse_marbles<Item: Clone, Err: Clone>(
  marbles: &str,
  values: &[(char, Item)],
  error: Option<Err>,
  allow_subscription_point: bool,
) -> Result<Marbles<Item, Err>, MarbleError> {
  let mut frame = 0u64;
  let mut group: Option<usize> = None;
  let mut subscription_frame = None;
  let mut raw = vec![];

  for (pos, token) in tokenize(marbles) {
    let notification = match token {
      Token::Frame => {
        if group.is_none() {
          frame += 1;
        }
        continue;
      }
      Token::Progress(millis) => {
        frame += millis;
        continue;
      }
      Token::GroupStart => {
        if group.is_some() {
          return Err(MarbleError::UnbalancedGroup { pos });
        }
        group = Some(pos);
        continue;
      }
      Token::GroupEnd => {
        if group.take().is_none() {
          return Err(MarbleError::UnbalancedGroup { pos });
        }
        frame += 1;
        continue;
      }
      Token::Subscribe => {
        if !allow_subscription_point {
          return Err(MarbleError::SubscriptionPointInCold);
        }
        if subscription_frame.is_some() {
          return Err(MarbleError::DuplicateSubscriptionPoint { pos });
        }
        subscription_frame = Some(frame);
        if group.is_none() {
          frame += 1;
        }
        continue;
      }
      Token::Unsubscribe => return Err(MarbleError::UnexpectedChar { ch: '!', pos }),
      Token::Key(key) if key.is_ascii_alphanumeric() => {
        let value = values
          .iter()
          .find(|(k, _)| *k == key)
          .map(|(_, v)| v.clone())
          .ok_or(MarbleError::UnknownValue { key })?;
        Notification::Next(value)
      }
      Token::Key(ch) => return Err(MarbleError::UnexpectedChar { ch, pos }),
      Token::Complete => Notification::Complete,
      Token::Error => Notification::Error(error.clone().ok_or(MarbleError::MissingErrorValue)?),
    };
    raw.push(TestMessage { frame, notification });
    if group.is_none() {
      frame += 1;
    }
  }
  if let Some(pos) = group {
    return Err(MarbleError::UnbalancedGroup { pos });
  }

  let origin = subscription_frame.unwrap_or(0);
  let messages = raw
    .into_iter()
    .filter(|m| m.frame >= origin)
    .map(|m| TestMessage { frame: m.frame - origin, ..m })
    .collect();
  Ok(Marbles { messages, subscription_frame })
}

/// Parses a subscription diagram such as `"--^---!"`.
pub fn parse_subscription_marbles(marbles: &str) -> Result<SubscriptionLog, MarbleError> {
  let mut frame = 0u64;
  let mut group: Option<usize> = None;
  let mut subscribed = None;
  let mut unsubscribed = None;

  for (pos, token) in tokenize(marbles) {
    match token {
      Token::Frame => {}
      Token::Progress(millis) => {
        frame += millis;
        continue;
      }
      Token::GroupStart => {
        if group.is_some() {
          return Err(MarbleError::UnbalancedGroup { pos });
        }
        group = Some(pos);
        continue;
      }
      Token::GroupEnd => {
        if group.take().is_none() {
          return Err(MarbleError::UnbalancedGroup { pos });
        }
      }
      Token::Subscribe => {
        if subscribed.is_some() {
          return Err(MarbleError::DuplicateSubscriptionPoint { pos });
        }
        subscribed = Some(frame);
      }
      Token::Unsubscribe => {
        if unsubscribed.is_some() {
          return Err(MarbleError::DuplicateUnsubscriptionPoint { pos });
        }
        unsubscribed = Some(frame);
      }
      Token::Key(ch) => return Err(MarbleError::UnexpectedChar { ch, pos }),
      Token::Complete => return Err(MarbleError::UnexpectedChar { ch: '|', pos }),
      Token::Error => return Err(MarbleError::UnexpectedChar { ch: '#', pos }),
    }
    if group.is_none() {
      frame += 1;
    }
  }
  if let Some(pos) = group {
    return Err(MarbleError::UnbalancedGroup { pos });
  }
  let subscribed = subscribed.ok_or(MarbleError::MissingSubscriptionPoint)?;
  Ok(SubscriptionLog { subscribed, unsubscribed })
}
