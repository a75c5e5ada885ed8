//! Noise oracle used by terrain generation.
//!
//! The generator only ever sees the [`NoiseSource`] trait, so tests can swap in
//! a deterministic or call-counting stub.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin, Worley};

/// Deterministic scalar noise in `[-1, 1]`.
pub trait NoiseSource: Send + Sync {
    /// Cave and overhang shape.
    fn noise3d(&self, x: f64, y: f64, z: f64) -> f64;

    /// Cellular ground-height noise.
    fn noise2d(&self, x: f64, z: f64) -> f64;
}

/// `noise`-crate backed oracle: fractal Perlin for 3D, Worley cells for 2D.
///
/// `Worley` keeps its distance function behind an `Rc` and is not `Send`, so
/// only its seed is stored and the function is rebuilt per sample.
pub struct NoiseOracle {
    shape: Fbm<Perlin>,
    cell_seed: u32,
}

impl NoiseOracle {
    pub fn new(seed: u64) -> Self {
        let seed = (seed ^ (seed >> 32)) as u32;
        NoiseOracle {
            shape: Fbm::<Perlin>::new(seed).set_octaves(3),
            cell_seed: seed.wrapping_add(1),
        }
    }
}

impl NoiseSource for NoiseOracle {
    fn noise3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.shape.get([x, y, z]).clamp(-1.0, 1.0)
    }

    fn noise2d(&self, x: f64, z: f64) -> f64 {
        Worley::new(self.cell_seed).get([x, z]).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_values() {
        let a = NoiseOracle::new(11);
        let b = NoiseOracle::new(11);
        for i in 0..16 {
            let p = i as f64 * 0.37;
            assert_eq!(a.noise3d(p, -p, p * 2.0), b.noise3d(p, -p, p * 2.0));
            assert_eq!(a.noise2d(p, p + 1.0), b.noise2d(p, p + 1.0));
        }
    }

    fn assert_thread_safe<T: Send + Sync>() {}

    #[test]
    fn oracle_is_shared_across_workers() {
        assert_thread_safe::<NoiseOracle>();

        let oracle = std::sync::Arc::new(NoiseOracle::new(5));
        let expected = oracle.noise2d(1.5, -2.25);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let oracle = oracle.clone();
                std::thread::spawn(move || oracle.noise2d(1.5, -2.25))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn values_stay_in_range() {
        let oracle = NoiseOracle::new(3);
        for i in 0..64 {
            let p = i as f64 * 0.71 - 20.0;
            assert!((-1.0..=1.0).contains(&oracle.noise3d(p, p * 0.5, -p)));
            assert!((-1.0..=1.0).contains(&oracle.noise2d(p, -p)));
        }
    }
}
