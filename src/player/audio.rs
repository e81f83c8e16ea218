use rodio::Source;
use std::sync::Arc;
use std::time::Duration;

use super::circular_buffer::CircularBuffer;
use super::clock::AudioClock;

/// Samples between clock updates
const CLOCK_BATCH: u64 = 256;

/// Endless rodio source fed by the decoder's circular buffer.
///
/// Underruns play silence. When the media has no audio track every silent
/// sample still counts toward the clock, so the video keeps its pace.
pub struct AudioSource {
    buffer: Arc<CircularBuffer<f32>>,
    clock: AudioClock,
    silent_track: bool,
    pending: u64,
}

impl AudioSource {
    pub fn new(buffer: Arc<CircularBuffer<f32>>, clock: AudioClock, has_audio: bool) -> Self {
        Self {
            buffer,
            clock,
            silent_track: !has_audio,
            pending: 0,
        }
    }

    fn count(&mut self) {
        self.pending += 1;
        if self.pending == CLOCK_BATCH {
            self.clock.advance_samples(CLOCK_BATCH);
            self.pending = 0;
        }
    }
}

impl Iterator for AudioSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.clock.should_clear_buffer() {
            self.buffer.clear();
            self.pending = 0;
            return Some(0.0);
        }

        match self.buffer.try_pop() {
            Some(sample) => {
                self.count();
                Some(sample)
            }
            None => {
                if self.silent_track {
                    self.count();
                }
                Some(0.0)
            }
        }
    }
}

impl Source for AudioSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.clock.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
