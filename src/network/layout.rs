//! Seeded force-directed (Fruchterman-Reingold) layout.
//!
//! Stochastic only in its initial placement: positions are drawn from a
//! seeded generator, so a fixed seed gives a bit-identical layout.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ITERATIONS: usize = 50;
const INITIAL_TEMPERATURE: f64 = 0.1;
const MIN_DISTANCE: f64 = 1e-9;

/// Compute 2D positions for `node_count` nodes connected by weighted
/// `edges` (index pairs with spring strength). Isolated nodes keep their
/// initial random placement. Output is rescaled so coordinates span
/// roughly [-1, 1].
pub fn spring_layout(node_count: usize, edges: &[(usize, usize, f64)], seed: u64) -> Vec<(f64, f64)> {
    if node_count == 0 {
        return Vec::new();
    }
    if node_count == 1 {
        return vec![(0.0, 0.0)];
    }

    let n = node_count;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut xs: Array1<f64> = (0..n).map(|_| rng.gen::<f64>() - 0.5).collect();
    let mut ys: Array1<f64> = (0..n).map(|_| rng.gen::<f64>() - 0.5).collect();

    // Optimal pairwise distance for a unit layout area.
    let k = (1.0 / n as f64).sqrt();
    let mut temperature = INITIAL_TEMPERATURE;
    let cooling = temperature / (ITERATIONS as f64 + 1.0);

    let mut dx = vec![0.0f64; n];
    let mut dy = vec![0.0f64; n];

    for _ in 0..ITERATIONS {
        dx.iter_mut().for_each(|v| *v = 0.0);
        dy.iter_mut().for_each(|v| *v = 0.0);

        // Repulsion between every pair.
        for i in 0..n {
            for j in (i + 1)..n {
                let delta_x = xs[i] - xs[j];
                let delta_y = ys[i] - ys[j];
                let dist = (delta_x * delta_x + delta_y * delta_y)
                    .sqrt()
                    .max(MIN_DISTANCE);
                let force = k * k / (dist * dist);
                dx[i] += delta_x * force;
                dy[i] += delta_y * force;
                dx[j] -= delta_x * force;
                dy[j] -= delta_y * force;
            }
        }

        // Attraction along edges, scaled by spring strength.
        for &(a, b, weight) in edges {
            let delta_x = xs[a] - xs[b];
            let delta_y = ys[a] - ys[b];
            let dist = (delta_x * delta_x + delta_y * delta_y)
                .sqrt()
                .max(MIN_DISTANCE);
            let force = weight * dist / k;
            dx[a] -= delta_x / dist * force;
            dy[a] -= delta_y / dist * force;
            dx[b] += delta_x / dist * force;
            dy[b] += delta_y / dist * force;
        }

        // Displace, capped by the current temperature.
        for i in 0..n {
            let len = (dx[i] * dx[i] + dy[i] * dy[i]).sqrt().max(MIN_DISTANCE);
            let step = len.min(temperature);
            xs[i] += dx[i] / len * step;
            ys[i] += dy[i] / len * step;
        }
        temperature -= cooling;
    }

    rescale(&mut xs, &mut ys);
    (0..n).map(|i| (xs[i], ys[i])).collect()
}

/// Center on the origin and scale the largest coordinate magnitude to 1.
fn rescale(xs: &mut Array1<f64>, ys: &mut Array1<f64>) {
    let n = xs.len() as f64;
    let mx = xs.sum() / n;
    let my = ys.sum() / n;
    let mut limit: f64 = 0.0;
    for i in 0..xs.len() {
        xs[i] -= mx;
        ys[i] -= my;
        limit = limit.max(xs[i].abs()).max(ys[i].abs());
    }
    if limit > 0.0 {
        xs.mapv_inplace(|v| v / limit);
        ys.mapv_inplace(|v| v / limit);
    }
}
