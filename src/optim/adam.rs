use crate::layers::dense::{Dense, LayerGradients};
use crate::math::matrix::Matrix;

/// First and second moment estimates for one parameter matrix.
struct Moments {
    m: Matrix,
    v: Matrix,
}

impl Moments {
    fn zeros_like(p: &Matrix) -> Moments {
        Moments { m: Matrix::zeros(p.rows, p.cols), v: Matrix::zeros(p.rows, p.cols) }
    }
}

/// Adam optimizer with bias correction. Moment state is allocated lazily,
/// two entries (weights, biases) per layer.
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    moments: Vec<Moments>,
    t: u32,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            moments: Vec::new(),
            t: 0,
        }
    }

    pub fn step(&mut self, layers: &mut [Dense], grads: &[LayerGradients]) {
        assert_eq!(layers.len(), grads.len(), "one gradient per layer");
        if self.moments.is_empty() {
            for layer in layers.iter() {
                self.moments.push(Moments::zeros_like(&layer.weights));
                self.moments.push(Moments::zeros_like(&layer.biases));
            }
        }

        self.t += 1;
        let k = Coefficients {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            bc1: 1.0 - self.beta1.powi(self.t as i32),
            bc2: 1.0 - self.beta2.powi(self.t as i32),
        };

        for ((layer, g), state) in layers.iter_mut()
            .zip(grads.iter())
            .zip(self.moments.chunks_exact_mut(2))
        {
            k.update(&mut layer.weights, &g.weights, &mut state[0]);
            k.update(&mut layer.biases, &g.biases, &mut state[1]);
        }
    }
}

/// Per-step constants shared by every parameter update.
#[derive(Clone, Copy)]
struct Coefficients {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    bc1: f64,
    bc2: f64,
}

impl Coefficients {
    fn update(&self, param: &mut Matrix, grad: &Matrix, state: &mut Moments) {
        for r in 0..param.rows {
            for c in 0..param.cols {
                let g = grad.data[r][c];
                let m = self.beta1 * state.m.data[r][c] + (1.0 - self.beta1) * g;
                let v = self.beta2 * state.v.data[r][c] + (1.0 - self.beta2) * g * g;
                state.m.data[r][c] = m;
                state.v.data[r][c] = v;
                let m_hat = m / self.bc1;
                let v_hat = v / self.bc2;
                param.data[r][c] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
    }
}
