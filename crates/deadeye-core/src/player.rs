use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::mode::Team;
use crate::weapon::WeaponKind;

/// Unique identifier for a player.
pub type PlayerId = u64;

/// Eye height of the character controller above the ground.
pub const EYE_HEIGHT: f32 = 1.6;

/// Starting and maximum player health.
pub const PLAYER_MAX_HEALTH: f32 = 100.0;

/// A weapon change in flight. Firing is refused until `ready_at`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponSwap {
    pub weapon: WeaponKind,
    pub ready_at: f64,
}

/// The local player as seen by the simulation.
///
/// Pose fields are pushed in by the character controller; the simulation
/// only reads them (aim origin and direction included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub username: String,
    pub position: Vec3,
    /// Euler angles (pitch, yaw, roll) in radians.
    pub rotation: Vec3,
    pub aim_origin: Vec3,
    pub aim_direction: Vec3,
    pub health: f32,
    pub max_health: f32,
    pub weapon: WeaponKind,
    pub swap: Option<WeaponSwap>,
    pub trigger_held: bool,
    pub score: u64,
    pub kills: u32,
    pub team: Option<Team>,
}

impl PlayerState {
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        let position = Vec3::new(0.0, EYE_HEIGHT, 0.0);
        Self {
            id,
            username: username.into(),
            position,
            rotation: Vec3::ZERO,
            aim_origin: position,
            aim_direction: Vec3::NEG_Z,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            weapon: WeaponKind::default(),
            swap: None,
            trigger_held: false,
            score: 0,
            kills: 0,
            team: None,
        }
    }

    /// Restore per-session fields; identity and pose survive.
    pub fn reset_for_session(&mut self) {
        self.health = self.max_health;
        self.swap = None;
        self.trigger_held = false;
        self.score = 0;
        self.kills = 0;
        self.team = None;
    }

    /// Subtract damage, clamped to `[0, max_health]`. Returns the new health.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        self.health
    }

    pub fn is_swapping(&self) -> bool {
        self.swap.is_some()
    }
}
