//! Fixed-capacity EEG sample accumulator

/// A completed analysis window, owned by value
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Ordinal of this window since the buffer was created, starting at 0
    pub sequence: u64,
    /// Exactly `capacity` samples in arrival order
    pub samples: Vec<f32>,
}

/// Collects EEG samples until a window is full, then hands the window out
///
/// Draining and resetting happen in the same `push` call that fills the
/// buffer: the full `Vec` is moved out and replaced by a fresh allocation,
/// so the returned window is never aliased with the buffer that keeps
/// receiving samples.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    capacity: usize,
    samples: Vec<f32>,
    windows_emitted: u64,
}

impl SampleBuffer {
    /// Create a buffer emitting windows of `capacity` samples
    ///
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SampleBuffer {
            capacity,
            samples: Vec::with_capacity(capacity),
            windows_emitted: 0,
        }
    }

    /// Append one sample; returns the full window when this sample completes it
    pub fn push(&mut self, sample: f32) -> Option<Window> {
        self.samples.push(sample);
        if self.samples.len() < self.capacity {
            return None;
        }

        let samples = std::mem::replace(&mut self.samples, Vec::with_capacity(self.capacity));
        let window = Window {
            sequence: self.windows_emitted,
            samples,
        };
        self.windows_emitted += 1;
        Some(window)
    }

    /// Samples waiting for the current window
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of windows handed out so far
    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    /// Discard a partially filled window
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_tracks_count_mod_capacity() {
        let mut buffer = SampleBuffer::new(64);
        let mut drains = 0;

        for n in 1..=300u32 {
            if buffer.push(n as f32).is_some() {
                drains += 1;
            }
            assert_eq!(buffer.len(), n as usize % 64);
            assert!(buffer.len() < buffer.capacity());
        }

        assert_eq!(drains, 300 / 64);
        assert_eq!(buffer.windows_emitted(), 4);
    }

    #[test]
    fn test_no_sample_lost_or_duplicated() {
        let mut buffer = SampleBuffer::new(64);
        let mut drained = Vec::new();

        for n in 0..640 {
            if let Some(window) = buffer.push(n as f32) {
                assert_eq!(window.samples.len(), 64);
                assert_eq!(window.sequence as usize, drained.len() / 64);
                drained.extend(window.samples);
            }
        }

        let expected: Vec<f32> = (0..640).map(|n| n as f32).collect();
        assert_eq!(drained, expected);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_window_is_independent_of_buffer() {
        let mut buffer = SampleBuffer::new(2);
        buffer.push(1.0);
        let window = buffer.push(2.0).unwrap();

        buffer.push(3.0);
        assert_eq!(window.samples, vec![1.0, 2.0]);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_clear_discards_partial_window() {
        let mut buffer = SampleBuffer::new(4);
        buffer.push(1.0);
        buffer.push(2.0);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.windows_emitted(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = SampleBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.push(1.0).is_some());
    }
}
