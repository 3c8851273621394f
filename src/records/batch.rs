use crate::math::matrix::Matrix;

/// One fetch from a record stream: `inputs` holds one flattened patch per
/// row and `labels` the matching class indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn new(inputs: Matrix, labels: Vec<usize>) -> Batch {
        Batch { inputs, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
