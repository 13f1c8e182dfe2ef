//! Jagged shapes.
//!
//! A [`JaggedShape`] of rank `n` is a list of `n` [`Edge`]s. Each edge maps a
//! parent dimension to a child dimension by split points: parent `i` owns the
//! children in `split_points[i]..split_points[i + 1]`. The first edge always
//! has a single parent, and the child size of each edge is the parent size of
//! the next one. A rank-0 shape describes a scalar.

use crate::error::{DataError, DataResult};

/// Split-point descriptor of one dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    split_points: Vec<i64>,
}

impl Edge {
    /// Build from split points `[0, ..., child_size]` (non-decreasing)
    pub fn from_split_points(split_points: Vec<i64>) -> DataResult<Self> {
        match split_points.first() {
            None => {
                return Err(DataError::invalid_argument(
                    "split points must be non-empty",
                ))
            }
            Some(&first) if first != 0 => {
                return Err(DataError::invalid_argument(format!(
                    "split points must start with 0, got {first}"
                )))
            }
            Some(_) => {}
        }
        if split_points.windows(2).any(|w| w[0] > w[1]) {
            return Err(DataError::invalid_argument(
                "split points must be sorted",
            ));
        }
        Ok(Edge { split_points })
    }

    /// Build from per-parent child counts
    pub fn from_sizes<I: IntoIterator<Item = usize>>(sizes: I) -> Self {
        let mut split_points = vec![0i64];
        let mut acc = 0i64;
        for size in sizes {
            acc += size as i64;
            split_points.push(acc);
        }
        Edge { split_points }
    }

    /// `parent_size` parents with `group_size` children each
    pub fn uniform(parent_size: usize, group_size: usize) -> Self {
        Self::from_sizes(std::iter::repeat(group_size).take(parent_size))
    }

    pub fn split_points(&self) -> &[i64] {
        &self.split_points
    }

    pub fn parent_size(&self) -> usize {
        self.split_points.len() - 1
    }

    pub fn child_size(&self) -> usize {
        self.split_points.last().copied().unwrap_or(0) as usize
    }

    /// Child range owned by parent `i`
    pub fn range(&self, i: usize) -> std::ops::Range<usize> {
        self.split_points[i] as usize..self.split_points[i + 1] as usize
    }

    /// Edge from this edge's parents directly to `child`'s children
    fn compose(&self, child: &Edge) -> Edge {
        Edge {
            split_points: self
                .split_points
                .iter()
                .map(|&p| child.split_points[p as usize])
                .collect(),
        }
    }
}

/// Shape of a (possibly ragged) multi-dimensional slice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JaggedShape {
    edges: Vec<Edge>,
}

impl JaggedShape {
    /// Rank-0 shape
    pub fn scalar() -> Self {
        JaggedShape { edges: Vec::new() }
    }

    /// Rank-1 shape of `size` elements
    pub fn flat(size: usize) -> Self {
        JaggedShape {
            edges: vec![Edge::uniform(1, size)],
        }
    }

    pub fn from_edges(edges: Vec<Edge>) -> DataResult<Self> {
        JaggedShape::scalar().add_dims(edges)
    }

    pub fn rank(&self) -> usize {
        self.edges.len()
    }

    /// Number of elements in the innermost dimension
    pub fn size(&self) -> usize {
        self.edges.last().map_or(1, Edge::child_size)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Keep only the first `from` dimensions
    pub fn remove_dims(&self, from: usize) -> Self {
        JaggedShape {
            edges: self.edges[..from.min(self.rank())].to_vec(),
        }
    }

    /// Append dimensions; each new edge's parent size must match the current size
    pub fn add_dims(&self, edges: Vec<Edge>) -> DataResult<Self> {
        let mut shape = self.clone();
        for edge in edges {
            let expected = shape.size();
            if edge.parent_size() != expected {
                return Err(DataError::invalid_argument(format!(
                    "incompatible dimensions: edge parent size {} != shape size {}",
                    edge.parent_size(),
                    expected
                )));
            }
            shape.edges.push(edge);
        }
        Ok(shape)
    }

    /// Merge dimensions `[from, to)` into one
    ///
    /// With `from == to` a unit dimension is inserted at `from`.
    pub fn flatten_dims(&self, from: usize, to: usize) -> Self {
        let to = to.min(self.rank());
        let from = from.min(to);
        let mut edges = self.edges[..from].to_vec();
        if from == to {
            let size = if from == 0 { 1 } else { self.edges[from - 1].child_size() };
            edges.push(Edge::uniform(size, 1));
        } else {
            let mut merged = self.edges[from].clone();
            for edge in &self.edges[from + 1..to] {
                merged = merged.compose(edge);
            }
            edges.push(merged);
        }
        edges.extend_from_slice(&self.edges[to..]);
        JaggedShape { edges }
    }

    pub fn is_equivalent_to(&self, other: &JaggedShape) -> bool {
        self.edges == other.edges
    }

    /// True if every dimension of `self` is a prefix dimension of `other`
    pub fn is_broadcastable_to(&self, other: &JaggedShape) -> bool {
        self.rank() <= other.rank() && self.edges[..] == other.edges[..self.rank()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(points: &[i64]) -> Edge {
        Edge::from_split_points(points.to_vec()).unwrap()
    }

    #[test]
    fn test_edge_validation() {
        assert!(Edge::from_split_points(vec![]).is_err());
        assert!(Edge::from_split_points(vec![1, 2]).is_err());
        assert!(Edge::from_split_points(vec![0, 3, 2]).is_err());
        let e = edge(&[0, 2, 5]);
        assert_eq!(e.parent_size(), 2);
        assert_eq!(e.child_size(), 5);
        assert_eq!(e.range(1), 2..5);
    }

    #[test]
    fn test_shape_basics() {
        let shape = JaggedShape::from_edges(vec![edge(&[0, 2]), edge(&[0, 3, 5])]).unwrap();
        assert_eq!(shape.rank(), 2);
        assert_eq!(shape.size(), 5);
        assert_eq!(JaggedShape::scalar().size(), 1);
        assert!(JaggedShape::from_edges(vec![edge(&[0, 2]), edge(&[0, 3])]).is_err());
    }

    #[test]
    fn test_remove_and_add_dims() {
        let shape = JaggedShape::from_edges(vec![edge(&[0, 2]), edge(&[0, 3, 5])]).unwrap();
        let outer = shape.remove_dims(1);
        assert_eq!(outer.rank(), 1);
        let back = outer.add_dims(vec![edge(&[0, 3, 5])]).unwrap();
        assert!(back.is_equivalent_to(&shape));
    }

    #[test]
    fn test_flatten_dims() {
        let shape = JaggedShape::from_edges(vec![
            edge(&[0, 2]),
            edge(&[0, 1, 3]),
            edge(&[0, 2, 3, 6]),
        ])
        .unwrap();
        let flat = shape.flatten_dims(1, 3);
        assert_eq!(flat.rank(), 2);
        assert_eq!(flat.edges()[1].split_points(), &[0, 2, 6]);

        let unit = shape.flatten_dims(1, 1);
        assert_eq!(unit.rank(), 4);
        assert_eq!(unit.edges()[1].split_points(), &[0, 1, 2]);
    }

    #[test]
    fn test_broadcastable() {
        let outer = JaggedShape::flat(2);
        let inner = outer.add_dims(vec![edge(&[0, 1, 3])]).unwrap();
        assert!(outer.is_broadcastable_to(&inner));
        assert!(!inner.is_broadcastable_to(&outer));
        assert!(JaggedShape::scalar().is_broadcastable_to(&inner));
    }
}
