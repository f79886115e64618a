extern crate microdiff;

use microdiff::engine::*;

fn main() -> microdiff::Result<()> {
    let mut g = Graph::new();
    let a = g.leaf(2.0);
    let b = g.leaf(-3.0);
    let ab = g.mul(a, b);
    let c = g.add(ab, a);
    let d = g.pow(c, 2.)?;
    let y = g.tanh(d);
    g.backward(y);

    println!("a = {}", g.node(a));
    println!("b = {}", g.node(b));
    println!("{}", viz::render_dot(&g, y));

    Ok(())
}
