use crate::layers::dense::{Dense, LayerGradients};

pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one SGD weight update to a layer given its pre-computed gradients.
    pub fn step(&self, layer: &mut Dense, grads: &LayerGradients) {
        let lr = self.learning_rate;
        layer.weights = layer.weights.clone() - grads.weights.map(|x| x * lr);
        layer.biases = layer.biases.clone() - grads.biases.map(|x| x * lr);
    }
}
