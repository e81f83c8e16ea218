use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Lock-guarded ring that evicts the oldest items instead of blocking the
/// decoder when the audio device falls behind.
pub struct CircularBuffer<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        })
    }

    pub fn push_slice(&self, items: &[T])
    where
        T: Clone,
    {
        let mut buf = self.inner.lock();
        // Only the newest `capacity` items can survive
        let keep = &items[items.len().saturating_sub(self.capacity)..];
        let overflow = (buf.len() + keep.len()).saturating_sub(self.capacity);
        buf.drain(..overflow.min(buf.len()));
        buf.extend(keep.iter().cloned());
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_keeps_newest() {
        let buf = CircularBuffer::new(3);
        buf.push_slice(&[1, 2]);
        buf.push_slice(&[3, 4]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.try_pop(), Some(2));
        assert_eq!(buf.try_pop(), Some(3));
        assert_eq!(buf.try_pop(), Some(4));
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_slice_is_truncated_from_the_front() {
        let buf = CircularBuffer::new(2);
        buf.push_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(buf.try_pop(), Some(4));
        assert_eq!(buf.try_pop(), Some(5));
        assert_eq!(buf.try_pop(), None);
    }
}
