use crossbeam_channel::Receiver;
use std::collections::VecDeque;

use super::decoder::DecodedVideoFrame;

/// Frames this far behind the clock are dropped (seconds)
const DROP_THRESHOLD: f64 = 0.02;
/// Frames up to this far ahead of the clock are shown early (seconds)
const HOLD_THRESHOLD: f64 = 0.02;
/// Tolerance when picking the first frame after a seek (seconds)
const SEEK_TOLERANCE: f64 = 0.5;

/// Buffers decoded frames and hands out the one matching the clock.
pub struct VideoFrameQueue {
    receiver: Receiver<DecodedVideoFrame>,
    buffer: VecDeque<DecodedVideoFrame>,
    current: Option<DecodedVideoFrame>,
    capacity: usize,
}

impl VideoFrameQueue {
    pub fn new(receiver: Receiver<DecodedVideoFrame>, capacity: usize) -> Self {
        Self {
            receiver,
            buffer: VecDeque::with_capacity(capacity),
            current: None,
            capacity,
        }
    }

    fn fill(&mut self) {
        while self.buffer.len() < self.capacity {
            match self.receiver.try_recv() {
                Ok(frame) => self.buffer.push_back(frame),
                Err(_) => break,
            }
        }
    }

    fn drop_before(&mut self, time: f64) {
        while self.buffer.front().is_some_and(|f| f.pts < time) {
            self.buffer.pop_front();
        }
    }

    /// Advance to the frame due at `clock` and return it when it changed.
    pub fn next_due(&mut self, clock: f64) -> Option<&DecodedVideoFrame> {
        self.fill();
        self.drop_before(clock - DROP_THRESHOLD);

        if self.buffer.front().is_some_and(|f| f.pts <= clock + HOLD_THRESHOLD) {
            self.current = self.buffer.pop_front();
            return self.current.as_ref();
        }
        None
    }

    /// Any frame at or near `target`; used to show the picture after a seek.
    pub fn first_after_seek(&mut self, target: f64) -> Option<&DecodedVideoFrame> {
        self.fill();
        self.drop_before(target - SEEK_TOLERANCE);

        if self.buffer.front().is_some() {
            self.current = self.buffer.pop_front();
            return self.current.as_ref();
        }
        None
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.current = None;
        while self.receiver.try_recv().is_ok() {}
    }

    /// No frame left to show, buffered or in flight.
    pub fn is_drained(&self) -> bool {
        self.buffer.is_empty() && self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    fn frame(pts: f64) -> DecodedVideoFrame {
        DecodedVideoFrame {
            rgba: vec![0; 4],
            width: 1,
            height: 1,
            pts,
        }
    }

    #[test]
    fn late_frames_are_skipped() {
        let (tx, rx) = bounded(8);
        let mut queue = VideoFrameQueue::new(rx, 8);
        for pts in [0.0, 0.04, 0.08, 0.12] {
            tx.send(frame(pts)).unwrap();
        }
        let shown = queue.next_due(0.08).map(|f| f.pts);
        assert_eq!(shown, Some(0.08));
        assert!(!queue.is_drained());
    }

    #[test]
    fn early_frame_is_held() {
        let (tx, rx) = bounded(8);
        let mut queue = VideoFrameQueue::new(rx, 8);
        tx.send(frame(1.0)).unwrap();
        assert!(queue.next_due(0.5).is_none());
        assert!(queue.next_due(0.99).is_some());
        assert!(queue.is_drained());
    }

    #[test]
    fn seek_accepts_first_frame_near_target() {
        let (tx, rx) = bounded(8);
        let mut queue = VideoFrameQueue::new(rx, 8);
        for pts in [1.0, 9.7, 10.1] {
            tx.send(frame(pts)).unwrap();
        }
        assert_eq!(queue.first_after_seek(10.0).map(|f| f.pts), Some(9.7));
    }
}
