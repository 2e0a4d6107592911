//! PathView - read-only snapshot of a session path
//!
//! The path buffer seals full chunks into `Arc<[PositionSample]>`; a view shares
//! the sealed chunks and copies only the short unsealed tail.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::sync::Arc;

use crate::{GeoBounds, GeoPoint, PositionSample};

/// Immutable view over an append-only path
#[derive(Debug, Clone)]
pub struct PathView {
    chunks: Vec<Arc<[PositionSample]>>,
    tail: Arc<[PositionSample]>,
    len: usize,
}

impl PathView {
    /// Assemble a view from sealed chunks and the current tail
    pub fn from_parts(chunks: Vec<Arc<[PositionSample]>>, tail: &[PositionSample]) -> Self {
        let len = chunks.iter().map(|c| c.len()).sum::<usize>() + tail.len();
        Self {
            chunks,
            tail: Arc::from(tail),
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Samples in append order
    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> + '_ {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    /// Lat/lng pairs in append order
    pub fn points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.iter().map(PositionSample::point)
    }

    pub fn last(&self) -> Option<&PositionSample> {
        self.tail
            .last()
            .or_else(|| self.chunks.last().and_then(|chunk| chunk.last()))
    }

    pub fn get(&self, index: usize) -> Option<&PositionSample> {
        let mut offset = index;
        for chunk in &self.chunks {
            if offset < chunk.len() {
                return chunk.get(offset);
            }
            offset -= chunk.len();
        }
        self.tail.get(offset)
    }

    /// Bounding box of every point, `None` for an empty path
    pub fn bounds(&self) -> Option<GeoBounds> {
        let mut points = self.points();
        let mut bounds = GeoBounds::around(points.next()?);
        for point in points {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Copy the whole path (used once, for the summary)
    pub fn to_vec(&self) -> Vec<PositionSample> {
        let mut out = Vec::with_capacity(self.len);
        out.extend(self.iter().copied());
        out
    }
}

impl Default for PathView {
    fn default() -> Self {
        Self::from_parts(Vec::new(), &[])
    }
}

impl PartialEq for PathView {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Serialize for PathView {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // explicit length: binary formats reject unsized sequences
        let mut seq = serializer.serialize_seq(Some(self.len))?;
        for sample in self.iter() {
            seq.serialize_element(sample)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> PositionSample {
        PositionSample::new(i as f64 * 0.001, 0.0, 5.0, i as f64)
    }

    #[test]
    fn test_view_over_chunks_and_tail() {
        let chunk: Arc<[PositionSample]> = (0..3).map(sample).collect::<Vec<_>>().into();
        let tail: Vec<_> = (3..5).map(sample).collect();
        let view = PathView::from_parts(vec![chunk], &tail);

        assert_eq!(view.len(), 5);
        assert_eq!(view.get(0).map(|s| s.captured_at), Some(0.0));
        assert_eq!(view.get(3).map(|s| s.captured_at), Some(3.0));
        assert_eq!(view.get(5), None);
        assert_eq!(view.last().map(|s| s.captured_at), Some(4.0));
        assert_eq!(view.to_vec().len(), 5);
    }

    #[test]
    fn test_last_with_empty_tail() {
        let chunk: Arc<[PositionSample]> = (0..2).map(sample).collect::<Vec<_>>().into();
        let view = PathView::from_parts(vec![chunk], &[]);
        assert_eq!(view.last().map(|s| s.captured_at), Some(1.0));
    }

    #[test]
    fn test_empty_view() {
        let view = PathView::default();
        assert!(view.is_empty());
        assert!(view.bounds().is_none());
        assert!(view.last().is_none());
    }

    #[test]
    fn test_bounds() {
        let view = PathView::from_parts(vec![], &[sample(0), sample(4)]);
        let bounds = view.bounds().unwrap();
        assert_eq!(bounds.south, 0.0);
        assert!((bounds.north - 0.004).abs() < 1e-12);
    }

    #[test]
    fn test_serializes_as_sequence() {
        let view = PathView::from_parts(vec![], &[sample(1)]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(1));
    }
}
