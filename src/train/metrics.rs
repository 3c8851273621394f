/// Loss and accuracy measured on one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetrics {
    pub loss: f64,
    pub accuracy: f64,
}

/// Per-segment collection of step metrics, reduced to means when the
/// segment closes.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    losses: Vec<f64>,
    accuracies: Vec<f64>,
}

/// Means of a closed segment. Both are `None` for an empty segment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentMeans {
    pub loss: Option<f64>,
    pub accuracy: Option<f64>,
    pub batches: usize,
}

impl MetricAccumulator {
    pub fn push(&mut self, m: StepMetrics) {
        self.losses.push(m.loss);
        self.accuracies.push(m.accuracy);
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn means(&self) -> SegmentMeans {
        SegmentMeans {
            loss: mean(&self.losses),
            accuracy: mean(&self.accuracies),
            batches: self.len(),
        }
    }

    /// Reduces to means and empties the accumulator.
    pub fn take_means(&mut self) -> SegmentMeans {
        let means = self.means();
        self.losses.clear();
        self.accuracies.clear();
        means
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn means_then_reset() {
        let mut acc = MetricAccumulator::default();
        acc.push(StepMetrics { loss: 1.0, accuracy: 0.5 });
        acc.push(StepMetrics { loss: 3.0, accuracy: 1.0 });
        let means = acc.take_means();
        assert_eq!(means.loss, Some(2.0));
        assert_eq!(means.accuracy, Some(0.75));
        assert_eq!(means.batches, 2);
        assert!(acc.is_empty());
    }

    #[test]
    fn empty_segment_has_no_mean() {
        let means = MetricAccumulator::default().take_means();
        assert_eq!(means, SegmentMeans { loss: None, accuracy: None, batches: 0 });
    }
}
