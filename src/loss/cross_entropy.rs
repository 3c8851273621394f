use crate::math::matrix::Matrix;

/// Softmax cross-entropy computed directly on logits with integer class
/// labels (the one-hot encoding is implicit).
pub struct SoftmaxCrossEntropy;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl SoftmaxCrossEntropy {
    /// Row-wise softmax, shifted by the row max for numerical stability.
    pub fn softmax(logits: &Matrix) -> Matrix {
        let data = logits.data.iter()
            .map(|row| {
                let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let exps: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
                let sum: f64 = exps.iter().sum();
                exps.into_iter().map(|e| e / sum).collect()
            })
            .collect();
        Matrix { rows: logits.rows, cols: logits.cols, data }
    }

    /// Mean over the batch of `-log(softmax(logits)[label])`.
    pub fn loss(logits: &Matrix, labels: &[usize]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let probs = SoftmaxCrossEntropy::softmax(logits);
        let total: f64 = probs.data.iter().zip(labels.iter())
            .map(|(row, &label)| -(row[label] + EPS).ln())
            .sum();
        total / labels.len() as f64
    }

    /// Gradient of the mean loss w.r.t. the logits:
    ///   (softmax(logits) - onehot(labels)) / batch
    pub fn gradient(logits: &Matrix, labels: &[usize]) -> Matrix {
        let mut grad = SoftmaxCrossEntropy::softmax(logits);
        let inv_batch = 1.0 / labels.len().max(1) as f64;
        for (row, &label) in grad.data.iter_mut().zip(labels.iter()) {
            row[label] -= 1.0;
            for g in row.iter_mut() {
                *g *= inv_batch;
            }
        }
        grad
    }

    /// Fraction of rows whose argmax equals the label.
    pub fn accuracy(logits: &Matrix, labels: &[usize]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let correct = logits.data.iter().zip(labels.iter())
            .filter(|(row, &label)| argmax(row) == label)
            .count();
        correct as f64 / labels.len() as f64
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
