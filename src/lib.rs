//! Scalar reverse-mode automatic differentiation over an arena-backed
//! computation graph, plus a small tanh feed-forward network built on it.

pub mod engine;
pub mod error;
pub mod nn;
pub mod train;

pub use crate::engine::{Graph, NodeId, Op, Operand};
pub use crate::error::{Error, Result};
pub use crate::nn::{Layer, Module, Network, Neuron};
