use std::fmt;

// Shape — N-dimensional shape representation
//
// A Shape is an ordered tuple of dimension sizes:
//   - Vector: Shape([5])           — 1 dimension, 5 elements
//   - Matrix: Shape([3, 4])        — 2 dimensions, 12 elements
//   - Batch:  Shape([2, 1, 1, 3])  — 4 dimensions, 6 elements
//
// Operators never see strides: every buffer handed to a kernel is dense and
// row-major, so the shape alone determines the memory layout. What the
// kernels *do* need is the flat 2-D view of a tensor, where the first
// dimension is kept and everything after it is collapsed into columns.

/// N-dimensional shape of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions).
    /// A rank-0 shape has 1 element.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Collapse the shape into `(rows, cols)`: rows is the first dimension,
    /// cols is the product of the rest.
    ///
    /// `[2, 1, 1, 3]` → `(2, 3)`, `[5]` → `(5, 1)`.
    pub fn flat_2d(&self) -> crate::Result<(usize, usize)> {
        match self.0.split_first() {
            Some((&rows, rest)) => Ok((rows, rest.iter().product())),
            None => Err(crate::Error::RankMismatch {
                expected: 1,
                got: 0,
            }),
        }
    }

    /// A copy of this shape with the last dimension replaced by `size`.
    pub fn with_last_dim(&self, size: usize) -> crate::Result<Shape> {
        let mut dims = self.0.clone();
        match dims.last_mut() {
            Some(last) => *last = size,
            None => {
                return Err(crate::Error::RankMismatch {
                    expected: 1,
                    got: 0,
                })
            }
        }
        Ok(Shape(dims))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

// These let you write: Shape::from((4, 3)) instead of Shape::new(vec![4, 3])

impl From<usize> for Shape {
    /// 1-D shape.
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize,)> for Shape {
    fn from((d0,): (usize,)) -> Self {
        Shape(vec![d0])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((d0, d1): (usize, usize)) -> Self {
        Shape(vec![d0, d1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((d0, d1, d2): (usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2])
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((d0, d1, d2, d3): (usize, usize, usize, usize)) -> Self {
        Shape(vec![d0, d1, d2, d3])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_shape() {
        let s = Shape::from(5usize);
        assert_eq!(s.rank(), 1);
        assert_eq!(s.elem_count(), 5);
        assert_eq!(s.flat_2d().unwrap(), (5, 1));
    }

    #[test]
    fn test_flat_2d_batch() {
        let s = Shape::from((2, 1, 1, 3));
        assert_eq!(s.elem_count(), 6);
        assert_eq!(s.flat_2d().unwrap(), (2, 3));
    }

    #[test]
    fn test_flat_2d_empty_rank_fails() {
        let s = Shape::new(vec![]);
        assert!(s.flat_2d().is_err());
    }

    #[test]
    fn test_with_last_dim() {
        let s = Shape::from((2, 1, 1, 3));
        assert_eq!(s.with_last_dim(4).unwrap(), Shape::from((2, 1, 1, 4)));
        assert!(Shape::new(vec![]).with_last_dim(4).is_err());
    }

    #[test]
    fn test_display() {
        let s = Shape::from((3, 4));
        assert_eq!(format!("{}", s), "[3, 4]");
    }
}
