use crate::engine::*;
use crate::error::{Error, Result};
use itertools::Itertools;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use std::iter::zip;

pub trait Module {
    fn zero_grad(&self, graph: &mut Graph) {
        self.parameters().into_iter().for_each(|p| graph.reset_grad(p))
    }

    fn parameters(&self) -> Vec<NodeId>;
}

/// `tanh(w . x + b)` over `nin` inputs.
pub struct Neuron {
    w: Vec<NodeId>,
    b: NodeId,
}

impl Neuron {
    /// Weights are drawn uniformly from `[-1/sqrt(nin), 1/sqrt(nin)]`, the bias
    /// starts at zero.
    pub fn new<R: Rng + ?Sized>(graph: &mut Graph, rng: &mut R, nin: usize) -> Result<Self> {
        if nin == 0 {
            return Err(Error::InvalidWidth {
                what: "neuron input count",
            });
        }

        let bound = 1. / (nin as ValueType).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let w = (0..nin).map(|_| graph.leaf(dist.sample(rng))).collect();
        Ok(Self {
            w,
            b: graph.leaf(Default::default()),
        })
    }

    pub fn nin(&self) -> usize {
        self.w.len()
    }

    pub fn evaluate(&self, graph: &mut Graph, x: &[NodeId]) -> Result<NodeId> {
        if x.len() != self.w.len() {
            return Err(Error::InputWidth {
                expected: self.w.len(),
                actual: x.len(),
            });
        }

        let mut act = self.b;
        for (wi, xi) in zip(&self.w, x) {
            let term = graph.mul(*wi, *xi);
            act = graph.add(act, term);
        }

        Ok(graph.tanh(act))
    }
}

impl Module for Neuron {
    fn parameters(&self) -> Vec<NodeId> {
        let mut params = self.w.clone();
        params.push(self.b);

        params
    }
}

impl std::fmt::Display for Neuron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("TanhNeuron({})", self.w.len()))
    }
}

pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        graph: &mut Graph,
        rng: &mut R,
        nin: usize,
        nout: usize,
    ) -> Result<Self> {
        if nout == 0 {
            return Err(Error::InvalidWidth {
                what: "layer output count",
            });
        }

        let neurons = (0..nout)
            .map(|_| Neuron::new(graph, rng, nin))
            .collect::<Result<_>>()?;

        Ok(Self { neurons })
    }

    pub fn nout(&self) -> usize {
        self.neurons.len()
    }

    pub fn evaluate(&self, graph: &mut Graph, x: &[NodeId]) -> Result<Vec<NodeId>> {
        self.neurons.iter().map(|n| n.evaluate(graph, x)).collect()
    }
}

impl Module for Layer {
    fn parameters(&self) -> Vec<NodeId> {
        self.neurons.iter().flat_map(|n| n.parameters()).collect()
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("Layer of [{}]", self.neurons.iter().join(", ")))
    }
}

/// Fully connected feed-forward network. Every layer, the last one included,
/// ends in tanh, so outputs lie in (-1, 1).
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    pub fn new<R: Rng + ?Sized>(
        graph: &mut Graph,
        rng: &mut R,
        nin: usize,
        nouts: &[usize],
    ) -> Result<Self> {
        if nouts.is_empty() {
            return Err(Error::InvalidWidth {
                what: "network layer count",
            });
        }

        let sizes = std::iter::once(nin).chain(nouts.iter().copied());
        let layers = sizes
            .tuple_windows()
            .map(|(i, o)| Layer::new(graph, rng, i, o))
            .collect::<Result<_>>()?;

        Ok(Self { layers })
    }

    /// Input width followed by each layer's output width.
    pub fn widths(&self) -> Vec<usize> {
        let nin = self.layers[0].neurons[0].nin();
        std::iter::once(nin)
            .chain(self.layers.iter().map(Layer::nout))
            .collect()
    }

    pub fn evaluate(&self, graph: &mut Graph, x: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut x = x.to_vec();
        for layer in &self.layers {
            x = layer.evaluate(graph, &x)?;
        }

        Ok(x)
    }
}

impl Module for Network {
    fn parameters(&self) -> Vec<NodeId> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("Network of [{}]", self.layers.iter().join(", ")))
    }
}
