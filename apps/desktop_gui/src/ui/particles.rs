//! Ambient background particles for the drop surface.

use std::f32::consts::TAU;

use eframe::egui;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const PARTICLE_COUNT: usize = 12;

/// One drifting dot. Anchors are normalized to the panel rect so the field
/// survives window resizes without re-rolling.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub radius: f32,
    pub drift: f32,
    pub speed: f32,
}

/// Deterministic field so the layout is stable across restarts.
pub fn particle_field(seed: u64, count: usize) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Particle {
            anchor_x: rng.random_range(0.0..1.0),
            anchor_y: rng.random_range(0.0..1.0),
            radius: rng.random_range(2.0..5.0),
            drift: rng.random_range(0.0..TAU),
            speed: rng.random_range(0.15..0.45),
        })
        .collect()
}

pub fn particle_pos(particle: &Particle, rect: egui::Rect, time: f64) -> egui::Pos2 {
    let phase = time as f32 * particle.speed + particle.drift;
    let sway_x = phase.sin() * 14.0;
    let sway_y = (phase * 0.7).cos() * 10.0;
    egui::pos2(
        rect.left() + particle.anchor_x * rect.width() + sway_x,
        rect.top() + particle.anchor_y * rect.height() + sway_y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_is_deterministic_for_a_seed() {
        let a = particle_field(7, PARTICLE_COUNT);
        let b = particle_field(7, PARTICLE_COUNT);
        assert_eq!(a.len(), PARTICLE_COUNT);
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(left.anchor_x, right.anchor_x);
            assert_eq!(left.anchor_y, right.anchor_y);
            assert_eq!(left.radius, right.radius);
            assert_eq!(left.drift, right.drift);
            assert_eq!(left.speed, right.speed);
        }
    }

    #[test]
    fn particles_stay_inside_unit_anchors() {
        for particle in particle_field(42, 64) {
            assert!((0.0..1.0).contains(&particle.anchor_x));
            assert!((0.0..1.0).contains(&particle.anchor_y));
            assert!(particle.radius >= 2.0 && particle.radius < 5.0);
            assert!(particle.speed >= 0.15 && particle.speed < 0.45);
        }
    }
}
