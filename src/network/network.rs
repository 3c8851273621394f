use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::layers::dense::{Dense, LayerGradients};
use crate::math::matrix::Matrix;

/// Stack of dense layers mapping flattened patches to class logits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Dense>,
}

impl Network {
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size())
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    /// Batched forward pass; each layer caches what it needs for backprop.
    pub fn forward<R: Rng + ?Sized>(&mut self, input: &Matrix, dropout_rate: f64, rng: &mut R) -> Matrix {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current, dropout_rate, rng);
        }
        current
    }

    /// Backpropagates dL/d(logits) through every layer of the last forward
    /// pass. Gradients are returned in layer order.
    pub fn backward(&self, logits_grad: &Matrix) -> Vec<LayerGradients> {
        let mut grads = Vec::with_capacity(self.layers.len());
        let mut delta = logits_grad.clone();
        for layer in self.layers.iter().rev() {
            let (g, input_grad) = layer.backward(&delta);
            grads.push(g);
            delta = input_grad;
        }
        grads.reverse();
        grads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::spec::NetworkSpec;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn spec_builds_expected_shapes() {
        let spec = NetworkSpec { hidden_layers: vec![8, 4], ..NetworkSpec::default() };
        let net = spec.build(27, 3, &mut StdRng::seed_from_u64(1));
        assert_eq!(net.layers.len(), 3);
        assert_eq!(net.input_size(), 27);
        assert_eq!(net.output_size(), 3);
        assert!(net.layers[0].dropout);
        assert!(!net.layers[2].dropout);
    }

    #[test]
    fn backward_returns_one_gradient_per_layer() {
        let mut net = NetworkSpec::default().build(6, 3, &mut StdRng::seed_from_u64(2));
        let mut rng = StdRng::seed_from_u64(5);
        let logits = net.forward(&Matrix::zeros(4, 6), 0.0, &mut rng);
        assert_eq!((logits.rows, logits.cols), (4, 3));
        let grads = net.backward(&Matrix::zeros(4, 3));
        assert_eq!(grads.len(), 3);
        assert_eq!(grads[0].weights.rows, 6);
    }
}
