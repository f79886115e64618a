//! Per-example SGD on a [`Network`] with squared-error loss.

use crate::engine::{Graph, NodeId, ValueType};
use crate::error::{Error, Result};
use crate::nn::{Module, Network};
use log::info;

#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: ValueType,
    /// Log the epoch loss every this many epochs. Zero disables reporting.
    pub report_every: usize,
    /// Seed for the generator that initializes the parameters.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 4000,
            learning_rate: 0.1,
            report_every: 200,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub inputs: Vec<ValueType>,
    pub target: ValueType,
}

impl Sample {
    pub fn new(inputs: &[ValueType], target: ValueType) -> Self {
        Self {
            inputs: inputs.to_vec(),
            target,
        }
    }
}

pub fn xor_dataset() -> Vec<Sample> {
    vec![
        Sample::new(&[0., 0.], 0.),
        Sample::new(&[0., 1.], 1.),
        Sample::new(&[1., 0.], 1.),
        Sample::new(&[1., 1.], 0.),
    ]
}

/// `(prediction - target)^2`
pub fn squared_error(graph: &mut Graph, prediction: NodeId, target: ValueType) -> Result<NodeId> {
    let diff = graph.sub(prediction, target);
    graph.pow(diff, 2.)
}

/// `value -= lr * grad` for every parameter.
pub fn sgd_step(graph: &mut Graph, params: &[NodeId], learning_rate: ValueType) -> Result<()> {
    for p in params {
        let value = graph.value(*p) - learning_rate * graph.grad(*p);
        graph.set_value(*p, value)?;
    }

    Ok(())
}

/// Trains `model` one sample at a time and returns the summed loss of every
/// epoch. Only the first output of the network is compared to the target.
///
/// Every expression node built here is dropped again before returning, so the
/// graph ends up holding exactly what it held on entry.
pub fn train(
    graph: &mut Graph,
    model: &Network,
    data: &[Sample],
    config: &TrainConfig,
) -> Result<Vec<ValueType>> {
    if data.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let params = model.parameters();
    let checkpoint = graph.checkpoint();
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 0..config.epochs {
        let mut total_loss = 0.;
        for sample in data {
            let x = graph.leaves(&sample.inputs);
            let step = model.evaluate(graph, &x).and_then(|y| {
                let loss = squared_error(graph, y[0], sample.target)?;
                total_loss += graph.value(loss);

                model.zero_grad(graph);
                graph.backward(loss);
                sgd_step(graph, &params, config.learning_rate)
            });
            graph.rewind(checkpoint);
            step?;
        }

        if config.report_every > 0 && epoch % config.report_every == 0 {
            info!("Epoch {epoch}, loss: {total_loss:.4}");
        }
        history.push(total_loss);
    }

    Ok(history)
}

/// Values of the network outputs for `inputs`. Leaves no nodes behind.
pub fn predict(graph: &mut Graph, model: &Network, inputs: &[ValueType]) -> Result<Vec<ValueType>> {
    let checkpoint = graph.checkpoint();
    let x = graph.leaves(inputs);
    let out = model
        .evaluate(graph, &x)
        .map(|y| y.iter().map(|n| graph.value(*n)).collect());
    graph.rewind(checkpoint);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Op;
    use float_eq::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn squared_error_grad() {
        let mut g = Graph::new();
        let p = g.leaf(0.25);
        let loss = squared_error(&mut g, p, 1.0).unwrap();
        g.backward(loss);

        assert_eq!(g.op(loss), Op::Pow(2.));
        assert_float_eq!(g.value(loss), 0.5625, abs <= 1e-12);
        assert_float_eq!(g.grad(p), -1.5, abs <= 1e-12);
    }

    #[test]
    fn sgd_step_moves_against_grad() {
        let mut g = Graph::new();
        let w = g.leaf(1.0);
        let y = g.mul(w, 3.0);
        g.backward(y);
        sgd_step(&mut g, &[w], 0.1).unwrap();

        assert_float_eq!(g.value(w), 0.7, abs <= 1e-12);
        assert!(sgd_step(&mut g, &[y], 0.1).is_err());
    }

    #[test]
    fn train_leaves_only_parameters() {
        let mut g = Graph::new();
        let mut rng = StdRng::seed_from_u64(5);
        let net = Network::new(&mut g, &mut rng, 2, &[3, 1]).unwrap();
        let len = g.len();
        let config = TrainConfig {
            epochs: 5,
            ..Default::default()
        };

        let history = train(&mut g, &net, &xor_dataset(), &config).unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(g.len(), len);

        let out = predict(&mut g, &net, &[1.0, 0.0]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(g.len(), len);
    }

    #[test]
    fn train_rejects_bad_input() {
        let mut g = Graph::new();
        let mut rng = StdRng::seed_from_u64(5);
        let net = Network::new(&mut g, &mut rng, 2, &[1]).unwrap();
        let len = g.len();
        let config = TrainConfig::default();

        assert_eq!(train(&mut g, &net, &[], &config), Err(Error::EmptyDataset));
        let bad = [Sample::new(&[1.0], 1.0)];
        assert!(matches!(
            train(&mut g, &net, &bad, &config),
            Err(Error::InputWidth { .. })
        ));
        assert_eq!(g.len(), len);
    }
}
