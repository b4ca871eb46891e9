//! Sample positions on rectangular area lights.
//!
//! A table holds `samples` points in `[-size / 2, size / 2]`, spread out by
//! a few rounds of repulsion on a torus so neighbouring tiles of the light
//! push back across the edges. Three shifted copies let adjacent pixels use
//! different patterns.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RELAX_ITERATIONS: usize = 12;

/// Shifts of the dithered copies, as fractions of the light size.
const PHASE_SHIFTS: [Vec2; 3] = [Vec2::new(0.5, 0.0), Vec2::new(0.5, 0.5), Vec2::new(0.0, 0.5)];

/// Jittered sample positions of one light.
#[derive(Clone, Debug)]
pub struct JitterTable {
    size: Vec2,
    phases: [Vec<Vec2>; 4],
}

impl JitterTable {
    /// Build the table. The pattern depends only on the sample count, so
    /// every render of a light sees the same positions.
    pub fn new(samples: u32, size: Vec2) -> Self {
        let mut rng = StdRng::seed_from_u64(samples as u64);
        let mut base: Vec<Vec2> = (0..samples)
            .map(|_| (Vec2::new(rng.gen(), rng.gen()) - 0.5) * size)
            .collect();

        for _ in 0..RELAX_ITERATIONS {
            for i in 0..base.len() {
                base[i] = relax(&base, base[i], size);
            }
        }

        let [a, b, c] = PHASE_SHIFTS.map(|shift| shifted(&base, shift, size).collect::<Vec<_>>());
        Self {
            size,
            phases: [base, a, b, c],
        }
    }

    pub fn len(&self) -> usize {
        self.phases[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases[0].is_empty()
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// One of the four patterns; 0 is the unshifted one.
    pub fn phase(&self, index: usize) -> &[Vec2] {
        &self.phases[index & 3]
    }

    /// Pattern for a pixel, picked by the parity of its coordinates.
    pub fn dithered(&self, x: u32, y: u32) -> &[Vec2] {
        self.phase(dither_phase(x, y))
    }

    /// Write the base pattern shifted by `shift` (fractions of the size)
    /// into `out`.
    pub fn shift_into(&self, shift: Vec2, out: &mut Vec<Vec2>) {
        out.clear();
        out.extend(shifted(&self.phases[0], shift, self.size));
    }
}

pub fn dither_phase(x: u32, y: u32) -> usize {
    (x & 1) as usize + 2 * (y & 1) as usize
}

/// Push `point` away from its close neighbours, then wrap it back into the
/// light.
fn relax(table: &[Vec2], point: Vec2, size: Vec2) -> Vec2 {
    let reach = size.min_element().powi(2);
    let mut force = Vec2::ZERO;

    for ty in -1..=1 {
        for tx in -1..=1 {
            let tile = Vec2::new(tx as f32, ty as f32) * size;
            for &other in table {
                let d = point - other - tile;
                let dist = d.length_squared();
                if dist > 0.0 && dist < reach {
                    force += d / dist;
                }
            }
        }
    }

    let moved = point + 0.1 * reach * force / table.len() as f32;
    Vec2::new(wrap(moved.x, size.x), wrap(moved.y, size.y))
}

fn wrap(value: f32, size: f32) -> f32 {
    if size > 0.0 {
        value - size * (value / size + 0.5).floor()
    } else {
        value
    }
}

fn shifted(table: &[Vec2], shift: Vec2, size: Vec2) -> impl Iterator<Item = Vec2> + '_ {
    let delta = shift * size;
    let half = 0.5 * size;
    table.iter().map(move |&p| {
        let mut q = p + delta;
        if q.x > half.x {
            q.x -= size.x;
        }
        if q.y > half.y {
            q.y -= size.y;
        }
        q
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inside(points: &[Vec2], size: Vec2) -> bool {
        let half = 0.5 * size + Vec2::splat(1e-4);
        points.iter().all(|p| p.abs().cmple(half).all())
    }

    #[test]
    fn test_points_stay_on_light() {
        let size = Vec2::new(2.0, 0.5);
        let table = JitterTable::new(16, size);

        assert_eq!(table.len(), 16);
        for phase in 0..4 {
            assert_eq!(table.phase(phase).len(), 16);
            assert!(inside(table.phase(phase), size), "phase {phase}");
        }
    }

    #[test]
    fn test_table_is_deterministic() {
        let a = JitterTable::new(9, Vec2::ONE);
        let b = JitterTable::new(9, Vec2::ONE);
        for phase in 0..4 {
            assert_eq!(a.phase(phase), b.phase(phase));
        }
    }

    #[test]
    fn test_phases_are_shifted_copies() {
        let size = Vec2::new(1.0, 2.0);
        let table = JitterTable::new(8, size);

        for (base, moved) in table.phase(0).iter().zip(table.phase(2)) {
            let d = *moved - *base;
            // Half the size, modulo the size
            assert!((d.x.abs() - 0.5).abs() < 1e-4);
            assert!((d.y.abs() - 1.0).abs() < 1e-4);
        }

        let mut scratch = Vec::new();
        table.shift_into(Vec2::new(0.5, 0.0), &mut scratch);
        assert_eq!(scratch.as_slice(), table.phase(1));
    }

    #[test]
    fn test_dither_phase() {
        assert_eq!(dither_phase(0, 0), 0);
        assert_eq!(dither_phase(1, 0), 1);
        assert_eq!(dither_phase(0, 1), 2);
        assert_eq!(dither_phase(3, 5), 3);

        let table = JitterTable::new(4, Vec2::ONE);
        assert_eq!(table.dithered(2, 1), table.phase(2));
    }

    #[test]
    fn test_zero_size_light() {
        let table = JitterTable::new(4, Vec2::ZERO);
        assert!(table.phase(3).iter().all(|p| *p == Vec2::ZERO));
    }
}
