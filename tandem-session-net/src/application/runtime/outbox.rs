use crate::domain::Payload;
use std::collections::VecDeque;

/// Chat payloads accepted from the UI but not yet written to the partner
///
/// Bounded so a stalled link pushes back on the user instead of growing
/// without limit. Drained in order by the event loop or the close teardown.
#[derive(Debug)]
pub struct Outbox {
    pending: VecDeque<Payload>,
    limit: usize,
}

impl Outbox {
    pub fn new(limit: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, payload: Payload) -> Result<(), QueueError> {
        if self.pending.len() >= self.limit {
            return Err(QueueError::Full { max: self.limit });
        }
        self.pending.push_back(payload);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Payload> {
        self.pending.pop_front()
    }

    /// Everything still waiting, oldest first
    pub fn drain(&mut self) -> Vec<Payload> {
        self.pending.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Too many messages waiting to be sent (limit {max})")]
    Full { max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Payload {
        Payload::Text(s.to_string())
    }

    #[test]
    fn test_push_pop() {
        let mut outbox = Outbox::new(10);

        outbox.push(text("hi")).unwrap();
        assert!(!outbox.is_empty());

        assert_eq!(outbox.pop(), Some(text("hi")));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_full_outbox_refuses() {
        let mut outbox = Outbox::new(2);

        outbox.push(text("a")).unwrap();
        outbox.push(text("b")).unwrap();

        assert_eq!(outbox.push(text("c")), Err(QueueError::Full { max: 2 }));
        outbox.pop();
        assert!(outbox.push(text("c")).is_ok());
    }

    #[test]
    fn test_drain_keeps_order_and_frees_slots() {
        let mut outbox = Outbox::new(3);
        outbox.push(Payload::Name("Alice".to_string())).unwrap();
        for s in ["a", "b"] {
            outbox.push(text(s)).unwrap();
        }

        assert_eq!(
            outbox.drain(),
            vec![Payload::Name("Alice".to_string()), text("a"), text("b")]
        );
        assert!(outbox.is_empty());
        assert!(outbox.push(text("c")).is_ok());
    }
}
