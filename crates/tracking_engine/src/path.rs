//! PathBuffer - append-only session path
//!
//! Full chunks are sealed into `Arc<[PositionSample]>` and never touched again,
//! so a [`PathView`] snapshot clones a few `Arc`s plus the short tail.

use contracts::{GeoBounds, PathView, PositionSample};
use std::sync::Arc;

/// Samples per sealed chunk
pub const CHUNK_SIZE: usize = 256;

#[derive(Debug, Default)]
pub struct PathBuffer {
    sealed: Vec<Arc<[PositionSample]>>,
    tail: Vec<PositionSample>,
    len: usize,
    bounds: Option<GeoBounds>,
}

impl PathBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: PositionSample) {
        let point = sample.point();
        match self.bounds.as_mut() {
            Some(bounds) => bounds.extend(point),
            None => self.bounds = Some(GeoBounds::around(point)),
        }

        self.tail.push(sample);
        self.len += 1;

        if self.tail.len() >= CHUNK_SIZE {
            let chunk: Arc<[PositionSample]> = std::mem::take(&mut self.tail).into();
            self.sealed.push(chunk);
        }
    }

    /// Read-only view; shares sealed chunks
    pub fn snapshot(&self) -> PathView {
        PathView::from_parts(self.sealed.clone(), &self.tail)
    }

    pub fn last(&self) -> Option<&PositionSample> {
        self.tail
            .last()
            .or_else(|| self.sealed.last().and_then(|chunk| chunk.last()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounding box of every appended sample
    pub fn bounds(&self) -> Option<GeoBounds> {
        self.bounds
    }

    pub fn clear(&mut self) {
        self.sealed.clear();
        self.tail.clear();
        self.len = 0;
        self.bounds = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> PositionSample {
        PositionSample::new(0.0, i as f64 * 1e-5, 5.0, i as f64)
    }

    #[test]
    fn test_push_and_snapshot() {
        let mut buffer = PathBuffer::new();
        for i in 0..3 {
            buffer.push(sample(i));
        }
        let view = buffer.snapshot();
        assert_eq!(view.len(), 3);
        assert_eq!(buffer.last().map(|s| s.captured_at), Some(2.0));
    }

    #[test]
    fn test_chunks_are_shared_between_snapshots() {
        let mut buffer = PathBuffer::new();
        for i in 0..CHUNK_SIZE + 10 {
            buffer.push(sample(i));
        }
        assert_eq!(buffer.sealed.len(), 1);
        assert_eq!(buffer.tail.len(), 10);

        let first = buffer.snapshot();
        buffer.push(sample(CHUNK_SIZE + 10));
        let second = buffer.snapshot();

        // older snapshot is unaffected by later appends
        assert_eq!(first.len(), CHUNK_SIZE + 10);
        assert_eq!(second.len(), CHUNK_SIZE + 11);
        assert_eq!(first.get(5), second.get(5));
    }

    #[test]
    fn test_last_after_seal() {
        let mut buffer = PathBuffer::new();
        for i in 0..CHUNK_SIZE {
            buffer.push(sample(i));
        }
        assert!(buffer.tail.is_empty());
        assert_eq!(
            buffer.last().map(|s| s.captured_at),
            Some((CHUNK_SIZE - 1) as f64)
        );
    }

    #[test]
    fn test_bounds_track_extent() {
        let mut buffer = PathBuffer::new();
        assert!(buffer.bounds().is_none());
        buffer.push(PositionSample::new(1.0, 2.0, 5.0, 0.0));
        buffer.push(PositionSample::new(-1.0, 3.0, 5.0, 1.0));
        let bounds = buffer.bounds().unwrap();
        assert_eq!((bounds.south, bounds.north), (-1.0, 1.0));
        assert_eq!((bounds.west, bounds.east), (2.0, 3.0));
    }

    #[test]
    fn test_clear() {
        let mut buffer = PathBuffer::new();
        buffer.push(sample(0));
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_empty());
        assert!(buffer.bounds().is_none());
    }
}
