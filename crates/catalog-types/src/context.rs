use std::fmt;
use std::time::{Duration, Instant};

/// Per-request context carrying an optional deadline.
///
/// The catalog store does not observe the deadline while it works; callers
/// use it to bound how long they wait for a result. A context without a
/// deadline never expires.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no deadline.
    pub const fn background() -> Self {
        Self { deadline: None }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remaining() {
            Some(left) => write!(f, "RequestContext(remaining={left:?})"),
            None => write!(f, "RequestContext(background)"),
        }
    }
}
