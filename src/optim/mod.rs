pub mod adam;
pub mod sgd;

use serde::{Serialize, Deserialize};

use crate::layers::dense::{Dense, LayerGradients};

pub use adam::Adam;
pub use sgd::Sgd;

/// Serializable optimizer choice, read from the run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Sgd { learning_rate: f64 },
    Adam { learning_rate: f64 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam { learning_rate: 1e-2 }
    }
}

impl OptimizerConfig {
    pub fn learning_rate(&self) -> f64 {
        match *self {
            OptimizerConfig::Sgd { learning_rate } | OptimizerConfig::Adam { learning_rate } => learning_rate,
        }
    }

    pub fn build(&self) -> Optimizer {
        match *self {
            OptimizerConfig::Sgd { learning_rate } => Optimizer::Sgd(Sgd::new(learning_rate)),
            OptimizerConfig::Adam { learning_rate } => Optimizer::Adam(Adam::new(learning_rate)),
        }
    }
}

pub enum Optimizer {
    Sgd(Sgd),
    Adam(Adam),
}

impl Optimizer {
    /// Applies one update to every layer.
    pub fn step(&mut self, layers: &mut [Dense], grads: &[LayerGradients]) {
        match self {
            Optimizer::Sgd(sgd) => {
                for (layer, g) in layers.iter_mut().zip(grads.iter()) {
                    sgd.step(layer, g);
                }
            }
            Optimizer::Adam(adam) => adam.step(layers, grads),
        }
    }
}
