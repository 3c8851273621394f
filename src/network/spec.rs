use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::dense::Dense;
use crate::network::network::Network;

/// Architecture of the patch classifier, independent of trained weights.
///
/// The input width is the flattened patch size and the output width the
/// class count; both come from the run parameters, so only the hidden
/// stack is described here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Hidden layer widths, input side first.
    pub hidden_layers: Vec<usize>,
    pub hidden_activation: ActivationFunction,
}

impl Default for NetworkSpec {
    fn default() -> Self {
        NetworkSpec {
            hidden_layers: vec![64, 32],
            hidden_activation: ActivationFunction::ReLU,
        }
    }
}

impl NetworkSpec {
    /// Builds a freshly initialised network. Hidden layers carry dropout,
    /// the output layer emits logits.
    pub fn build<R: Rng + ?Sized>(&self, input_size: usize, classes: usize, rng: &mut R) -> Network {
        let mut layers = Vec::with_capacity(self.hidden_layers.len() + 1);
        let mut fan_in = input_size;
        for &size in &self.hidden_layers {
            layers.push(Dense::new(size, fan_in, self.hidden_activation, true, rng));
            fan_in = size;
        }
        layers.push(Dense::new(classes, fan_in, ActivationFunction::Identity, false, rng));
        Network { layers }
    }
}
