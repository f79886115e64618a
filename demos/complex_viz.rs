extern crate microdiff;

use microdiff::engine::*;

fn main() -> microdiff::Result<()> {
    let mut g = Graph::new();
    let a = g.leaf(-4.0);
    let b = g.leaf(2.0);
    let mut c = g.add(a, b);
    let ab = g.mul(a, b);
    let b3 = g.pow(b, 3.)?;
    let mut d = g.add(ab, b3);
    let c1 = g.add(c, 1.);
    c = g.add(c, c1);
    let c1 = g.add(1., c);
    let na = g.neg(a);
    let c1 = g.add(c1, na);
    c = g.add(c, c1);
    let d2 = g.mul(d, 2.);
    let ba = g.add(b, a);
    let t = g.tanh(ba);
    let d2 = g.add(d2, t);
    d = g.add(d, d2);
    let e = g.sub(c, d);
    let f = g.pow(e, 2.)?;
    let mut h = g.div(f, 2.0);
    let ten_f = g.div(10.0, f);
    h = g.add(h, ten_f);
    g.backward(h);

    println!("{}", viz::render_dot(&g, h));

    Ok(())
}
