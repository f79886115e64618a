use crate::error::{Error, Result};
use log::{debug, trace};
use std::collections::HashSet;
use std::fmt;

pub type ValueType = f64;

/// Backward rule of a derived node.
///
/// Called with the node itself and the arena prefix holding every node created
/// before it, which always includes all of its parents. The rule adds the
/// node's contribution into each parent's gradient.
pub type BackwardFn = fn(&Node, &mut [Node]);

/// Index of a node inside its [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Leaf,
    Add,
    Mul,
    Pow(ValueType),
    Tanh,
}

impl Op {
    pub fn name(&self) -> String {
        match self {
            Op::Leaf => String::new(),
            Op::Add => "+".to_string(),
            Op::Mul => "*".to_string(),
            Op::Pow(exponent) => format!("^{exponent}"),
            Op::Tanh => "tanh".to_string(),
        }
    }
}

/// Either an existing node or a constant that still has to become one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    Node(NodeId),
    Const(ValueType),
}

impl From<NodeId> for Operand {
    fn from(id: NodeId) -> Self {
        Operand::Node(id)
    }
}

impl From<ValueType> for Operand {
    fn from(value: ValueType) -> Self {
        Operand::Const(value)
    }
}

#[derive(Clone)]
pub struct Node {
    value: ValueType,
    grad: ValueType,
    op: Op,
    parents: Vec<NodeId>,
    backward: Option<BackwardFn>,
}

impl Node {
    pub fn value(&self) -> ValueType {
        self.value
    }

    pub fn grad(&self) -> ValueType {
        self.grad
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn is_leaf(&self) -> bool {
        self.parents.is_empty()
    }

    fn unary(&self) -> usize {
        self.parents[0].0
    }

    fn binary(&self) -> (usize, usize) {
        (self.parents[0].0, self.parents[1].0)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value)
            .field("grad", &self.grad)
            .field("op", &self.op)
            .field("parents", &self.parents)
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "Value({:.06}, grad={:.06})",
            self.value, self.grad
        ))
    }
}

/// Marks the arena length at some point in time, see [`Graph::rewind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Arena of scalar nodes forming a computation graph.
///
/// Nodes only ever refer to nodes created before them, so the parent relation
/// cannot contain a cycle. Long-lived nodes (parameters) are created first;
/// per-example expressions are built above a [`Checkpoint`] and dropped in one
/// go with [`Graph::rewind`].
///
/// Every method taking a [`NodeId`] panics if the id does not belong to this
/// graph or was dropped by a rewind.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn value(&self, id: NodeId) -> ValueType {
        self.nodes[id.0].value
    }

    pub fn grad(&self, id: NodeId) -> ValueType {
        self.nodes[id.0].grad
    }

    pub fn op(&self, id: NodeId) -> Op {
        self.nodes[id.0].op
    }

    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].parents
    }

    /// Overwrites the value of a leaf. Derived nodes keep the value they were
    /// built with.
    pub fn set_value(&mut self, id: NodeId, value: ValueType) -> Result<()> {
        let node = &mut self.nodes[id.0];
        if !node.is_leaf() {
            return Err(Error::ImmutableNode(id));
        }
        node.value = value;
        Ok(())
    }

    pub fn reset_grad(&mut self, id: NodeId) {
        self.nodes[id.0].grad = Default::default()
    }

    pub fn zero_grad(&mut self) {
        self.nodes.iter_mut().for_each(|n| n.grad = Default::default())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.nodes.len())
    }

    /// Drops every node created after `checkpoint`.
    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        trace!(
            "rewinding graph from {} to {} nodes",
            self.nodes.len(),
            checkpoint.0
        );
        self.nodes.truncate(checkpoint.0);
    }

    fn push(
        &mut self,
        value: ValueType,
        op: Op,
        parents: Vec<NodeId>,
        backward: Option<BackwardFn>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        debug_assert!(parents.iter().all(|p| *p < id));
        self.nodes.push(Node {
            value,
            grad: 0.,
            op,
            parents,
            backward,
        });
        id
    }

    pub fn leaf(&mut self, value: ValueType) -> NodeId {
        self.push(value, Op::Leaf, vec![], None)
    }

    pub fn leaves(&mut self, values: &[ValueType]) -> Vec<NodeId> {
        values.iter().map(|v| self.leaf(*v)).collect()
    }

    /// Turns an operand into a node, allocating a leaf for constants.
    pub fn as_node(&mut self, operand: impl Into<Operand>) -> NodeId {
        match operand.into() {
            Operand::Node(id) => {
                assert!(id.0 < self.nodes.len(), "Node {id} is not in this graph.");
                id
            }
            Operand::Const(value) => self.leaf(value),
        }
    }

    pub fn add(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> NodeId {
        let a = self.as_node(a);
        let b = self.as_node(b);
        let value = self.value(a) + self.value(b);
        self.push(value, Op::Add, vec![a, b], Some(add_backward))
    }

    pub fn sub(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> NodeId {
        let a = self.as_node(a);
        let b = self.neg(b);
        self.add(a, b)
    }

    pub fn mul(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> NodeId {
        let a = self.as_node(a);
        let b = self.as_node(b);
        let value = self.value(a) * self.value(b);
        self.push(value, Op::Mul, vec![a, b], Some(mul_backward))
    }

    pub fn neg(&mut self, a: impl Into<Operand>) -> NodeId {
        self.mul(a, -1.)
    }

    /// Raises `base` to a constant power.
    ///
    /// Fails with [`Error::InvalidOperand`] when the exponent is a node.
    pub fn pow(&mut self, base: impl Into<Operand>, exponent: impl Into<Operand>) -> Result<NodeId> {
        match exponent.into() {
            Operand::Const(exponent) => {
                let base = self.as_node(base);
                Ok(self.powf(base, exponent))
            }
            Operand::Node(id) => Err(Error::InvalidOperand {
                op: "pow",
                reason: format!("exponent must be a constant, got node {id}"),
            }),
        }
    }

    fn powf(&mut self, base: NodeId, exponent: ValueType) -> NodeId {
        let value = self.value(base).powf(exponent);
        self.push(value, Op::Pow(exponent), vec![base], Some(pow_backward))
    }

    /// `a * b^-1`. Dividing by zero yields an infinite or NaN value, which is
    /// propagated as is.
    pub fn div(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> NodeId {
        let a = self.as_node(a);
        let b = self.as_node(b);
        let inv = self.powf(b, -1.);
        self.mul(a, inv)
    }

    pub fn tanh(&mut self, a: impl Into<Operand>) -> NodeId {
        let a = self.as_node(a);
        // (e^2a - 1) / (e^2a + 1); overflow of e^2a yields NaN
        let e = (2. * self.value(a)).exp_m1();
        let value = e / (e + 2.);
        self.push(value, Op::Tanh, vec![a], Some(tanh_backward))
    }

    /// Nodes reachable from `root`, each listed once and after all of its
    /// parents. Parents are explored in the order they were recorded.
    pub fn topological_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = vec![];
        let mut visited = HashSet::<NodeId>::new();
        let mut stack = vec![(root, 0)];
        visited.insert(root);

        while let Some(frame) = stack.last_mut() {
            let (id, next) = *frame;
            match self.nodes[id.0].parents.get(next) {
                Some(&parent) => {
                    frame.1 += 1;
                    if visited.insert(parent) {
                        stack.push((parent, 0));
                    }
                }
                None => {
                    stack.pop();
                    order.push(id);
                }
            }
        }

        order
    }

    /// Accumulates d(root)/d(node) into the grad of every node reachable from
    /// `root`. Grads are expected to be zero beforehand; they are not reset.
    pub fn backward(&mut self, root: NodeId) {
        self.nodes[root.0].grad = 1.0;
        if self.nodes[root.0].is_leaf() {
            debug!("backward() called on leaf {root}. Nothing to propagate.");
            return;
        }

        let topo = self.topological_order(root);
        trace!("backward pass from {root} over {} nodes", topo.len());
        for id in topo.into_iter().rev() {
            let (arena, rest) = self.nodes.split_at_mut(id.0);
            let node = &rest[0];
            if let Some(backward) = node.backward {
                backward(node, arena);
            }
        }
    }
}

fn add_backward(out: &Node, arena: &mut [Node]) {
    let (a, b) = out.binary();
    arena[a].grad += out.grad;
    arena[b].grad += out.grad;
}

fn mul_backward(out: &Node, arena: &mut [Node]) {
    let (a, b) = out.binary();
    let (a_value, b_value) = (arena[a].value, arena[b].value);
    arena[a].grad += b_value * out.grad;
    arena[b].grad += a_value * out.grad;
}

fn pow_backward(out: &Node, arena: &mut [Node]) {
    if let Op::Pow(exponent) = out.op {
        let a = out.unary();
        arena[a].grad += exponent * arena[a].value.powf(exponent - 1.) * out.grad;
    }
}

fn tanh_backward(out: &Node, arena: &mut [Node]) {
    let a = out.unary();
    arena[a].grad += (1. - out.value * out.value) * out.grad;
}

pub mod viz {
    use super::*;
    use itertools::Itertools;

    /// Renders the subgraph reachable from `root` in Graphviz DOT format.
    pub fn render_dot(graph: &Graph, root: NodeId) -> String {
        let mut nodes_str = String::new();
        let mut edges_str = String::new();
        for id in graph.topological_order(root) {
            let node = graph.node(id);
            let id_str = format!("{:08}", id.index());
            nodes_str += &format!(
                "    \"{}\" [label=\"{{ data {:.06} | grad {:.06} }}\" shape=record]\n",
                id_str,
                node.value(),
                node.grad(),
            );
            if node.is_leaf() {
                continue;
            }

            let op_name = node.op().name();
            nodes_str += &format!("    \"{}{}\" [label=\"{}\"]\n", id_str, op_name, op_name);
            edges_str += &format!("    \"{}{}\" -> \"{}\"\n", id_str, op_name, id_str);
            for parent in node.parents().iter().unique() {
                edges_str += &format!(
                    "    \"{:08}\" -> \"{}{}\"\n",
                    parent.index(),
                    id_str,
                    op_name
                );
            }
        }

        format!(
            "strict digraph {{\n    graph [rankdir=LR]\n\n{}{}}}",
            nodes_str, edges_str
        )
    }
}
