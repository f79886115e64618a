extern crate microdiff;

use float_eq::*;
use microdiff::engine::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EPS: f64 = 1e-6;

type Expr = fn(&mut Graph, &[NodeId]) -> NodeId;

/// Compares the gradients from `backward` against central differences.
fn check(expr: Expr, inputs: &[f64], tol: f64) {
    let mut g = Graph::new();
    let leaves = g.leaves(inputs);
    let out = expr(&mut g, &leaves);
    g.backward(out);

    for (i, leaf) in leaves.iter().enumerate() {
        let eval_at = |delta: f64| {
            let mut shifted = inputs.to_vec();
            shifted[i] += delta;
            let mut g = Graph::new();
            let leaves = g.leaves(&shifted);
            let out = expr(&mut g, &leaves);
            g.value(out)
        };
        let numeric = (eval_at(EPS) - eval_at(-EPS)) / (2. * EPS);
        assert_float_eq!(g.grad(*leaf), numeric, abs <= tol);
    }
}

fn polynomial(g: &mut Graph, x: &[NodeId]) -> NodeId {
    // x0 * x1 - x2 * x0 + (x1 * x1) * -3
    let a = g.mul(x[0], x[1]);
    let b = g.mul(x[2], x[0]);
    let b = g.neg(b);
    let c = g.mul(x[1], x[1]);
    let c = g.mul(c, -3.);
    let s = g.add(a, b);
    g.add(s, c)
}

fn chained_products(g: &mut Graph, x: &[NodeId]) -> NodeId {
    let mut acc = g.leaf(1.0);
    for xi in x {
        let sum = g.add(acc, *xi);
        acc = g.mul(sum, *xi);
    }
    acc
}

fn rational_tanh(g: &mut Graph, x: &[NodeId]) -> NodeId {
    let num = g.tanh(x[0]);
    let sq = g.pow(x[1], 2.).unwrap();
    let den = g.add(sq, 1.);
    let q = g.div(num, den);
    g.sub(q, x[0])
}

#[test]
fn add_mul_neg_match_finite_differences() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let inputs: Vec<f64> = (0..3).map(|_| rng.gen_range(-2.0..2.0)).collect();
        check(polynomial, &inputs, 1e-6);
        check(chained_products, &inputs, 1e-6);
    }
}

#[test]
fn pow_div_tanh_match_finite_differences() {
    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..20 {
        let inputs: Vec<f64> = (0..2).map(|_| rng.gen_range(-2.0..2.0)).collect();
        check(rational_tanh, &inputs, 1e-6);
    }
}

#[test]
fn tanh_derivative_at_sampled_points() {
    for x in [-3.0f64, -0.5, 0.0, 0.5, 2.0] {
        let mut g = Graph::new();
        let leaf = g.leaf(x);
        let t = g.tanh(leaf);
        g.backward(t);
        let expected: f64 = 1. - x.tanh().powi(2);
        assert_float_eq!(g.grad(leaf), expected, abs <= 1e-12);
    }
}
