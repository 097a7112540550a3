//! Monotonic request id counter for correlating requests with replies.
//!
//! # What is a request id? (for beginners)
//!
//! Some requests are answered *asynchronously*: the client sends
//! `{"type":"request","request":"group-list","group":"team","id":7}` and, an
//! unknown number of records later, the server answers with
//! `{"type":"group-list","id":7,"message":[...]}`.  The id is the only thing
//! that ties the reply back to the request, so it must never be handed out
//! twice during a session.
//!
//! The counter is owned by exactly one session and only ever touched from the
//! client's single event-loop thread, so a plain integer behind `&mut self`
//! is enough; no atomics or locks are needed.

/// A monotonically increasing, never-reused request id source.
///
/// Ids start at 0 and increment by 1 with each call to [`next`].  Once
/// `u64::MAX` has been handed out the counter is exhausted and returns
/// `None` from then on.
///
/// # Examples
///
/// ```rust
/// use sechat_core::protocol::RequestIdCounter;
///
/// let mut ids = RequestIdCounter::new();
/// assert_eq!(ids.next(), Some(0));
/// assert_eq!(ids.next(), Some(1));
/// ```
///
/// [`next`]: RequestIdCounter::next
#[derive(Debug, Default)]
pub struct RequestIdCounter {
    next: u64,
    exhausted: bool,
}

impl RequestIdCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: first,
            exhausted: false,
        }
    }

    /// Returns a fresh id and advances the counter, or `None` once every
    /// `u64` has been used.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<u64> {
        if self.exhausted {
            return None;
        }
        let id = self.next;
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => self.exhausted = true,
        }
        Some(id)
    }

    /// Returns the id the next call to [`next`](Self::next) will hand out.
    pub fn peek(&self) -> Option<u64> {
        (!self.exhausted).then_some(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_counter_starts_at_zero() {
        // Arrange
        let mut counter = RequestIdCounter::new();

        // Act
        let first = counter.next();

        // Assert
        assert_eq!(first, Some(0));
    }

    #[test]
    fn test_request_ids_are_unique_and_increasing() {
        let mut counter = RequestIdCounter::new();
        let values: Vec<u64> = (0..100).map(|_| counter.next().unwrap()).collect();
        for window in values.windows(2) {
            assert!(window[1] > window[0], "ids must be strictly increasing");
        }
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut counter = RequestIdCounter::new();
        counter.next();
        assert_eq!(counter.peek(), Some(1));
        assert_eq!(counter.next(), Some(1));
    }

    #[test]
    fn test_exhausted_counter_never_repeats_the_last_id() {
        // Arrange
        let mut counter = RequestIdCounter::starting_at(u64::MAX - 1);

        // Act
        let ids = [counter.next(), counter.next(), counter.next(), counter.next()];

        // Assert
        assert_eq!(ids, [Some(u64::MAX - 1), Some(u64::MAX), None, None]);
        assert_eq!(counter.peek(), None);
    }
}
