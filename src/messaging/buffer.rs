//! Bounded FIFO buffer with drop-oldest eviction

use std::collections::VecDeque;

/// Messages waiting for the next `subscribe` call
#[derive(Debug)]
pub struct MessageBuffer {
    messages: VecDeque<String>,
    capacity: usize,
}

impl MessageBuffer {
    /// Create a buffer holding at most `capacity` messages (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, returning the evicted oldest one when full
    pub fn push(&mut self, message: String) -> Option<String> {
        self.messages.push_back(message);
        if self.messages.len() > self.capacity {
            self.messages.pop_front()
        } else {
            None
        }
    }

    /// Take every buffered message, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<String> {
        self.messages.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut buffer = MessageBuffer::new(100);
        let mut evicted = Vec::new();

        for i in 1..=101 {
            if let Some(old) = buffer.push(format!("m{}", i)) {
                evicted.push(old);
            }
        }

        assert_eq!(evicted, vec!["m1".to_string()]);
        assert_eq!(buffer.len(), 100);

        let drained = buffer.drain();
        let expected: Vec<String> = (2..=101).map(|i| format!("m{}", i)).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn test_drain_resets() {
        let mut buffer = MessageBuffer::new(3);
        buffer.push("a".to_string());
        buffer.push("b".to_string());

        assert_eq!(buffer.drain(), vec!["a".to_string(), "b".to_string()]);
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = MessageBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.push("a".to_string()), None);
        assert_eq!(buffer.push("b".to_string()), Some("a".to_string()));
    }
}
