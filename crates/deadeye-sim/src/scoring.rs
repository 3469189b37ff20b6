use serde::{Deserialize, Serialize};

/// Score for a direct hit whose projectile centre passed `distance` from the
/// entity centre.
///
/// The offset from the projectile's surface is normalised by the entity's
/// own radius (half a target's size, or the fixed agent radius), so a
/// dead-centre hit scores `max` and a graze scores `min`.
pub fn hit_score(
    distance: f32,
    projectile_radius: f32,
    entity_radius: f32,
    min: f32,
    max: f32,
) -> f32 {
    let max_radius = entity_radius;
    if max_radius <= 0.0 {
        return max;
    }
    let offset = (distance - projectile_radius).max(0.0);
    (100.0 * (1.0 - offset / max_radius)).clamp(min, max)
}

/// Blast damage at `distance` from an explosion of radius `radius`.
/// Zero at or beyond the edge.
pub fn explosion_damage(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    (100.0 * (1.0 - distance / radius)).floor()
}

/// Hits as a percentage of shots; 100 before the first shot.
pub fn accuracy(hits: u32, shots: u32) -> f32 {
    if shots == 0 {
        100.0
    } else {
        hits as f32 / shots as f32 * 100.0
    }
}

/// Running tally for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub score: u64,
    pub shots_fired: u32,
    pub hits: u32,
    pub accuracy: f32,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self {
            score: 0,
            shots_fired: 0,
            hits: 0,
            accuracy: 100.0,
        }
    }
}

impl Scoreboard {
    pub fn record_shot(&mut self) {
        self.shots_fired += 1;
        self.accuracy = accuracy(self.hits, self.shots_fired);
    }

    /// Count a hit and add its floored score.
    pub fn record_hit(&mut self, hit_score: f32) {
        self.hits += 1;
        self.score += hit_score.max(0.0).floor() as u64;
        self.accuracy = accuracy(self.hits, self.shots_fired);
    }
}
