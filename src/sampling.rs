//! Drawing a generation from the search distribution, with bound repair.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

/// One generation of noise vectors `z` and the candidates `x = mean + A z`.
///
/// After repair `x[i]` may differ from `mean + A z[i]` in the coordinates that
/// fell outside the box; `z[i]` is kept as drawn and is what the update uses.
#[derive(Debug, Clone)]
pub struct Generation {
    pub z: Vec<DVector<f64>>,
    pub x: Vec<DVector<f64>>,
}

/// Draws `lam` candidates and repairs out-of-box coordinates.
///
/// For every individual the `n` normal draws come first, followed by one uniform
/// draw per coordinate that needs repair, so the random stream only depends on
/// the seed and the distribution.
pub fn sample_generation<R: Rng + ?Sized>(
    mean: &DVector<f64>,
    a: &DMatrix<f64>,
    lb: &[f64],
    ub: &[f64],
    lam: usize,
    rng: &mut R,
) -> Generation {
    let n = mean.len();
    let mut z = Vec::with_capacity(lam);
    let mut x = Vec::with_capacity(lam);
    for _ in 0..lam {
        let zi = DVector::from_fn(n, |_, _| rng.sample::<f64, _>(StandardNormal));
        let mut xi = mean + a * &zi;
        repair_bounds(xi.as_mut_slice(), lb, ub, rng);
        z.push(zi);
        x.push(xi);
    }
    Generation { z, x }
}

/// Replaces every coordinate outside `[lb, ub]` with a uniform draw inside it.
/// Returns the number of repaired coordinates.
pub fn repair_bounds<R: Rng + ?Sized>(x: &mut [f64], lb: &[f64], ub: &[f64], rng: &mut R) -> usize {
    let mut repaired = 0;
    for ((xj, &l), &u) in x.iter_mut().zip(lb).zip(ub) {
        if *xj < l || *xj > u {
            *xj = l + rng.gen::<f64>() * (u - l);
            repaired += 1;
        }
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn inside_box_is_untouched() {
        let mean = DVector::from_vec(vec![0.0, 0.0]);
        let a = DMatrix::identity(2, 2) * 1e-3;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let g = sample_generation(&mean, &a, &[-1.0, -1.0], &[1.0, 1.0], 6, &mut rng);
        assert_eq!(g.z.len(), 6);
        for (z, x) in g.z.iter().zip(&g.x) {
            let expected = &mean + &a * z;
            assert_eq!(x, &expected);
        }
    }

    #[test]
    fn repair_leaves_noise_alone() {
        // mean sits on the upper corner, roughly half the draws leave the box
        let mean = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        let a = DMatrix::identity(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let g = sample_generation(&mean, &a, &[0.0; 3], &[1.0; 3], 10, &mut rng);
        let mut repaired = 0;
        for (z, x) in g.z.iter().zip(&g.x) {
            let raw = &mean + &a * z;
            for j in 0..3 {
                if raw[j] > 1.0 || raw[j] < 0.0 {
                    repaired += 1;
                    assert_ne!(x[j], raw[j]);
                } else {
                    assert_eq!(x[j], raw[j]);
                }
            }
        }
        assert!(repaired > 0);
    }

    #[test]
    fn same_seed_same_generation() {
        let mean = DVector::from_vec(vec![0.5, -0.5]);
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.0, 2.0]);
        let mut r1 = ChaCha8Rng::seed_from_u64(99);
        let mut r2 = ChaCha8Rng::seed_from_u64(99);
        let g1 = sample_generation(&mean, &a, &[-1.0; 2], &[1.0; 2], 8, &mut r1);
        let g2 = sample_generation(&mean, &a, &[-1.0; 2], &[1.0; 2], 8, &mut r2);
        assert_eq!(g1.x, g2.x);
        assert_eq!(g1.z, g2.z);
    }

    #[test]
    fn degenerate_box_pins_coordinate() {
        let mut x = [3.0, -2.0];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let n = repair_bounds(&mut x, &[0.5, -1.0], &[0.5, 1.0], &mut rng);
        assert_eq!(n, 2);
        assert_eq!(x[0], 0.5);
        assert!((-1.0..=1.0).contains(&x[1]));
    }

    proptest! {
        #[test]
        fn candidates_always_inside_box(
            seed in any::<u64>(),
            scale in 1e-3f64..1e3,
            shift in -50.0f64..50.0,
        ) {
            let lb = [-1.0, 0.0, 2.0];
            let ub = [1.0, 0.1, 10.0];
            let mean = DVector::from_element(3, shift);
            let a = DMatrix::identity(3, 3) * scale;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let g = sample_generation(&mean, &a, &lb, &ub, 12, &mut rng);
            for x in &g.x {
                for j in 0..3 {
                    prop_assert!(x[j] >= lb[j] && x[j] <= ub[j]);
                }
            }
        }
    }
}
