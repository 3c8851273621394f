//! The explicit training context: network parameters, optimizer state and
//! the RNG behind dropout masks, owned together and passed to the trainer.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::ModelError;
use crate::loss::cross_entropy::SoftmaxCrossEntropy;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::network::spec::NetworkSpec;
use crate::optim::{Optimizer, OptimizerConfig};
use crate::records::batch::Batch;
use crate::train::metrics::StepMetrics;

/// What the trainer needs from a classifier.
pub trait Model {
    /// Class logits for `batch`, one row per sample.
    fn forward(&mut self, batch: &Batch, dropout_rate: f64) -> Result<Matrix, ModelError>;

    /// Loss and accuracy on `batch` under the current parameters. Does not
    /// update anything.
    fn evaluate(&mut self, batch: &Batch, dropout_rate: f64) -> Result<StepMetrics, ModelError>;

    /// One optimizer update on `batch`.
    fn optimizer_step(&mut self, batch: &Batch, dropout_rate: f64) -> Result<(), ModelError>;

    /// Current parameters, for checkpointing.
    fn parameters(&self) -> &Network;
}

pub struct Session {
    network: Network,
    optimizer: Optimizer,
    classes: usize,
    rng: StdRng,
    steps: u64,
}

impl Session {
    /// Builds a freshly initialised session. The same `seed` drives weight
    /// init and dropout masks.
    pub fn new(
        spec: &NetworkSpec,
        optimizer: &OptimizerConfig,
        input_size: usize,
        classes: usize,
        seed: Option<u64>,
    ) -> Session {
        let mut rng = seeded(seed);
        let network = spec.build(input_size, classes, &mut rng);
        Session { network, optimizer: optimizer.build(), classes, rng, steps: 0 }
    }

    /// Wraps restored parameters. Optimizer state starts fresh.
    pub fn from_network(network: Network, optimizer: &OptimizerConfig, seed: Option<u64>) -> Session {
        let classes = network.output_size();
        Session { network, optimizer: optimizer.build(), classes, rng: seeded(seed), steps: 0 }
    }

    /// Optimizer updates applied so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn check(&self, batch: &Batch, dropout_rate: f64) -> Result<(), ModelError> {
        if !(0.0..1.0).contains(&dropout_rate) {
            return Err(ModelError::InvalidDropout(dropout_rate));
        }
        if batch.is_empty() {
            return Err(ModelError::EmptyBatch);
        }
        if batch.inputs.rows != batch.labels.len() {
            return Err(ModelError::LabelCount { inputs: batch.inputs.rows, labels: batch.labels.len() });
        }
        let expected = self.network.input_size();
        if batch.inputs.cols != expected {
            return Err(ModelError::ShapeMismatch { expected, found: batch.inputs.cols });
        }
        if let Some(&label) = batch.labels.iter().find(|&&l| l >= self.classes) {
            return Err(ModelError::LabelOutOfRange { label, classes: self.classes });
        }
        Ok(())
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

impl Model for Session {
    fn forward(&mut self, batch: &Batch, dropout_rate: f64) -> Result<Matrix, ModelError> {
        self.check(batch, dropout_rate)?;
        Ok(self.network.forward(&batch.inputs, dropout_rate, &mut self.rng))
    }

    fn evaluate(&mut self, batch: &Batch, dropout_rate: f64) -> Result<StepMetrics, ModelError> {
        let logits = self.forward(batch, dropout_rate)?;
        Ok(StepMetrics {
            loss: SoftmaxCrossEntropy::loss(&logits, &batch.labels),
            accuracy: SoftmaxCrossEntropy::accuracy(&logits, &batch.labels),
        })
    }

    fn optimizer_step(&mut self, batch: &Batch, dropout_rate: f64) -> Result<(), ModelError> {
        let logits = self.forward(batch, dropout_rate)?;
        let grad = SoftmaxCrossEntropy::gradient(&logits, &batch.labels);
        let grads = self.network.backward(&grad);
        self.optimizer.step(&mut self.network.layers, &grads);
        self.steps += 1;
        Ok(())
    }

    fn parameters(&self) -> &Network {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let spec = NetworkSpec { hidden_layers: vec![16], ..NetworkSpec::default() };
        Session::new(&spec, &OptimizerConfig::Adam { learning_rate: 0.05 }, 2, 2, Some(1))
    }

    /// Linearly separable: class 1 iff x0 > x1.
    fn batch() -> Batch {
        let rows = vec![
            vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.2], vec![0.1, 0.8],
            vec![0.7, 0.3], vec![0.2, 0.6], vec![0.8, 0.1], vec![0.3, 0.9],
        ];
        let labels = rows.iter().map(|r| usize::from(r[0] > r[1])).collect();
        Batch::new(Matrix::from_data(rows), labels)
    }

    #[test]
    fn training_reduces_loss() {
        let mut s = session();
        let b = batch();
        let before = s.evaluate(&b, 0.0).unwrap().loss;
        for _ in 0..200 {
            s.optimizer_step(&b, 0.0).unwrap();
        }
        let after = s.evaluate(&b, 0.0).unwrap();
        assert!(after.loss < before, "loss {} -> {}", before, after.loss);
        assert_eq!(after.accuracy, 1.0);
        assert_eq!(s.steps(), 200);
    }

    #[test]
    fn evaluate_leaves_parameters_untouched() {
        let mut s = session();
        let before = s.parameters().layers[0].weights.clone();
        s.evaluate(&batch(), 0.5).unwrap();
        assert_eq!(s.parameters().layers[0].weights, before);
    }

    #[test]
    fn rejects_malformed_batches() {
        let mut s = session();
        let wide = Batch::new(Matrix::zeros(1, 3), vec![0]);
        assert!(matches!(s.evaluate(&wide, 0.0), Err(ModelError::ShapeMismatch { .. })));

        let bad_label = Batch::new(Matrix::zeros(1, 2), vec![5]);
        assert!(matches!(s.evaluate(&bad_label, 0.0), Err(ModelError::LabelOutOfRange { .. })));

        assert!(matches!(s.evaluate(&batch(), 1.0), Err(ModelError::InvalidDropout(_))));
    }
}
