use deadeye_core::settings::{Difficulty, GameSettings};
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TargetTuning;

/// A practice target. Moves on a deterministic path around its anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    pub anchor: Vec3,
    pub position: Vec3,
    pub size: f32,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    /// Per-instance phase offset, in `[0, 1000)`.
    pub seed: f32,
}

impl Target {
    /// Collision radius.
    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }
}

/// Result of damaging a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetDamage {
    Damaged { id: Uuid, health: f32 },
    /// The target hit zero health and was replaced in its slot.
    Destroyed { old: Uuid, new: Uuid },
}

fn size_and_speed(difficulty: Difficulty) -> (f32, f32) {
    match difficulty {
        Difficulty::Easy => (1.5, 0.3),
        Difficulty::Medium => (1.0, 0.5),
        Difficulty::Hard => (0.8, 0.8),
    }
}

/// Draw a UUID v4 from the session RNG so seeded sessions stay reproducible.
pub fn random_uuid(rng: &mut impl Rng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}

/// Spawns, moves and replaces practice targets.
#[derive(Debug, Clone)]
pub struct TargetManager {
    targets: Vec<Target>,
    tuning: TargetTuning,
}

impl TargetManager {
    pub fn new(tuning: TargetTuning) -> Self {
        Self {
            targets: Vec::new(),
            tuning,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn get(&self, id: Uuid) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    /// Replace the population with `count` fresh targets.
    pub fn spawn(&mut self, count: usize, settings: &GameSettings, rng: &mut impl Rng) {
        let fresh: Vec<Target> = (0..count).map(|_| self.fresh(settings, rng)).collect();
        self.targets = fresh;
    }

    fn fresh(&self, settings: &GameSettings, rng: &mut impl Rng) -> Target {
        let t = &self.tuning;
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let radius = rng.random_range(t.spawn_min_radius..=t.spawn_max_radius);
        let height = rng.random_range(t.min_height..=t.max_height);
        let anchor = Vec3::new(angle.cos() * radius, height, angle.sin() * radius);
        let (size, speed) = size_and_speed(settings.difficulty);
        Target {
            id: random_uuid(rng),
            anchor,
            position: anchor,
            size,
            speed,
            health: t.max_health,
            max_health: t.max_health,
            seed: rng.random_range(0.0..1000.0),
        }
    }

    /// Move every target along its path for simulation time `now_ms`.
    pub fn advance(&mut self, now_ms: f64, settings: &GameSettings) {
        let max_distance = self.tuning.max_distance;
        for target in &mut self.targets {
            target.position = oscillate(
                target.anchor,
                target.seed,
                now_ms,
                settings.target_speed,
                settings.target_movement_range,
                max_distance,
            );
        }
    }

    /// Apply damage to the target with `id`. Unknown ids are ignored, which
    /// happens when two impacts in one tick name a target the first already
    /// destroyed.
    pub fn apply_damage(
        &mut self,
        id: Uuid,
        amount: f32,
        settings: &GameSettings,
        rng: &mut impl Rng,
    ) -> Option<TargetDamage> {
        let Some(idx) = self.targets.iter().position(|t| t.id == id) else {
            tracing::debug!(%id, "Damage for unknown target ignored");
            return None;
        };
        let target = &mut self.targets[idx];
        target.health = (target.health - amount).clamp(0.0, target.max_health);
        if target.health > 0.0 {
            return Some(TargetDamage::Damaged {
                id,
                health: target.health,
            });
        }
        let replacement = self.fresh(settings, rng);
        let new = replacement.id;
        self.targets[idx] = replacement;
        Some(TargetDamage::Destroyed { old: id, new })
    }
}

/// Position on a target's path at `now_ms`.
///
/// The offset from the anchor is a sum of slow sines keyed by the target's
/// seed; the result is pulled back onto a sphere of `max_distance` around the
/// origin if it strays past it.
pub fn oscillate(
    anchor: Vec3,
    seed: f32,
    now_ms: f64,
    target_speed: f32,
    movement_range: f32,
    max_distance: f32,
) -> Vec3 {
    let t = (now_ms / 1000.0) as f32 + seed;
    let s = target_speed * 0.1;
    let r = movement_range * 0.5;
    let offset = Vec3::new(
        (t * s).sin() * r,
        (t * s * 0.5).sin().abs() * r * 0.5,
        (t * s * 0.3).cos() * r * 0.3,
    );
    let p = anchor + offset;
    let distance = p.length();
    if distance > max_distance {
        p * (max_distance / distance)
    } else {
        p
    }
}
