use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Gradients of the loss w.r.t. one layer's parameters.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

/// Activations remembered from the last forward pass, needed for backprop.
#[derive(Debug, Clone, Default)]
struct ForwardCache {
    input: Matrix,
    pre_activation: Matrix,
    dropout_mask: Option<Matrix>,
}

/// Fully connected layer operating on a whole batch, one sample per row.
///
/// `weights` has shape (input_size, size) and `biases` (1, size). When
/// `dropout` is set the layer applies inverted dropout to its own output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
    pub dropout: bool,
    #[serde(skip)]
    cache: Option<ForwardCache>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        dropout: bool,
        rng: &mut R,
    ) -> Dense {
        let weights = if activation.prefers_he_init() {
            Matrix::he(input_size, size, rng)
        } else {
            Matrix::xavier(input_size, size, rng)
        };

        Dense {
            size,
            weights,
            biases: Matrix::zeros(1, size),
            activator: activation,
            dropout,
            cache: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// Batched forward pass. `dropout_rate` is the probability of zeroing a
    /// unit; survivors are scaled by `1 / (1 - rate)` so that a rate of 0.0
    /// is an exact identity.
    pub fn forward<R: Rng + ?Sized>(
        &mut self,
        input: &Matrix,
        dropout_rate: f64,
        rng: &mut R,
    ) -> Matrix {
        let z = (input * &self.weights).add_row(&self.biases);
        let a = z.map(|x| self.activator.function(x));

        let dropout_mask = if self.dropout && dropout_rate > 0.0 {
            let keep = 1.0 - dropout_rate;
            let mut mask = Matrix::zeros(a.rows, a.cols);
            for row in mask.data.iter_mut() {
                for m in row.iter_mut() {
                    if rng.gen::<f64>() < keep {
                        *m = 1.0 / keep;
                    }
                }
            }
            Some(mask)
        } else {
            None
        };

        let output = match &dropout_mask {
            Some(mask) => a.hadamard(mask),
            None => a,
        };

        self.cache = Some(ForwardCache {
            input: input.clone(),
            pre_activation: z,
            dropout_mask,
        });
        output
    }

    /// Backward pass for the most recent `forward` call.
    ///
    /// `output_grad` is dL/d(output) with shape (batch, size). Returns the
    /// parameter gradients and dL/d(input).
    ///
    /// # Panics
    /// Panics if called before `forward`.
    pub fn backward(&self, output_grad: &Matrix) -> (LayerGradients, Matrix) {
        let cache = self.cache.as_ref()
            .expect("Dense::backward called before forward");

        let grad_a = match &cache.dropout_mask {
            Some(mask) => output_grad.hadamard(mask),
            None => output_grad.clone(),
        };
        let act_derivative = cache.pre_activation.map(|x| self.activator.derivative(x));
        let delta = grad_a.hadamard(&act_derivative);

        let weights = &cache.input.transpose() * &delta;
        let biases = delta.sum_rows();
        let input_grad = &delta * &self.weights.transpose();

        (LayerGradients { weights, biases }, input_grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn layer(activation: ActivationFunction, dropout: bool) -> Dense {
        let mut rng = StdRng::seed_from_u64(3);
        let mut l = Dense::new(2, 2, activation, dropout, &mut rng);
        l.weights = Matrix::from_data(vec![vec![1.0, -1.0], vec![0.5, 2.0]]);
        l.biases = Matrix::from_data(vec![vec![0.1, 0.0]]);
        l
    }

    #[test]
    fn forward_applies_affine_then_activation() {
        let mut l = layer(ActivationFunction::ReLU, false);
        let x = Matrix::from_data(vec![vec![1.0, 1.0], vec![2.0, 0.0]]);
        let out = l.forward(&x, 0.5, &mut StdRng::seed_from_u64(0));
        assert_eq!(out.data, vec![vec![1.6, 1.0], vec![2.1, 0.0]]);
    }

    #[test]
    fn zero_rate_disables_dropout() {
        let mut l = layer(ActivationFunction::Identity, true);
        let x = Matrix::from_data(vec![vec![1.0, 1.0]]);
        let out = l.forward(&x, 0.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(out.data, vec![vec![1.6, 1.0]]);
    }

    #[test]
    fn dropout_zeroes_or_rescales_units() {
        let mut l = layer(ActivationFunction::Identity, true);
        let x = Matrix::from_data(vec![vec![1.0, 1.0]; 64]);
        let out = l.forward(&x, 0.5, &mut StdRng::seed_from_u64(9));
        for row in &out.data {
            assert!(row[0] == 0.0 || (row[0] - 3.2).abs() < 1e-12);
            assert!(row[1] == 0.0 || (row[1] - 2.0).abs() < 1e-12);
        }
        assert!(out.data.iter().any(|r| r[0] == 0.0));
        assert!(out.data.iter().any(|r| r[0] != 0.0));
    }

    #[test]
    fn backward_matches_finite_difference() {
        let mut l = layer(ActivationFunction::Tanh, false);
        let x = Matrix::from_data(vec![vec![0.3, -0.7]]);
        let mut rng = StdRng::seed_from_u64(0);
        // Loss = sum of outputs, so dL/d(output) is all ones.
        l.forward(&x, 0.0, &mut rng);
        let (grads, _) = l.backward(&Matrix::from_data(vec![vec![1.0, 1.0]]));

        let eps = 1e-6;
        let base: f64 = l.forward(&x, 0.0, &mut rng).data[0].iter().sum();
        l.weights.data[1][0] += eps;
        let bumped: f64 = l.forward(&x, 0.0, &mut rng).data[0].iter().sum();
        let numeric = (bumped - base) / eps;
        assert!((numeric - grads.weights.data[1][0]).abs() < 1e-4);
    }
}
