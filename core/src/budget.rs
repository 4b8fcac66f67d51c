/// Optional cap on how many messages a run processes.
///
/// `None` means unbounded. A bounded budget counts down once per fully
/// processed message (or per completed request/reply exchange).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageBudget {
  remaining: Option<u64>,
}

impl MessageBudget {
  pub fn unbounded() -> Self {
    Self { remaining: None }
  }

  pub fn limited(count: u64) -> Self {
    Self {
      remaining: Some(count),
    }
  }

  pub fn from_limit(limit: Option<u64>) -> Self {
    Self { remaining: limit }
  }

  pub fn remaining(&self) -> Option<u64> {
    self.remaining
  }

  /// True once a bounded budget has reached zero. Never true for an unbounded one.
  pub fn is_exhausted(&self) -> bool {
    self.remaining == Some(0)
  }

  /// Records one processed message. Returns `true` if that used up the budget.
  pub fn consume(&mut self) -> bool {
    match self.remaining.as_mut() {
      Some(left) => {
        *left = left.saturating_sub(1);
        *left == 0
      }
      None => false,
    }
  }
}
