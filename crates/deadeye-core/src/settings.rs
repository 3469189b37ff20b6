use serde::{Deserialize, Serialize};

/// Difficulty tier for practice targets and agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    #[default]
    Day,
    Night,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Cloudy,
    Rainy,
}

/// Player-facing settings.
///
/// The settings collaborator owns this record and clamps values before
/// injecting it; the simulation reads it but never validates or mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    pub sensitivity: f32,
    /// Master volume in `0.0..=1.0`.
    pub volume: f32,
    pub fov: f32,
    pub difficulty: Difficulty,
    /// Character controller walk speed.
    pub speed: f32,
    pub graphics_quality: u8,
    pub gravity: f32,
    /// Oscillation speed of practice targets.
    pub target_speed: f32,
    /// Oscillation amplitude of practice targets.
    pub target_movement_range: f32,
    pub crosshair_style: String,
    pub colorblind_mode: String,
    pub bullet_trail_enabled: bool,
    pub time_of_day: TimeOfDay,
    pub weather_condition: WeatherCondition,
    pub npc_count: u32,
    pub npc_difficulty: Difficulty,
    /// Whether agents return fire at the player.
    pub npc_shoot_back: bool,
    pub npc_movement_speed: f32,
    /// Agent hit probability at point-blank range, `0.0..=1.0`.
    pub npc_accuracy: f32,
    /// Delay in milliseconds before a freshly spawned agent may fire.
    pub npc_reaction_time: f32,
    /// Per-tick chance that an agent swaps to a random weapon.
    pub npc_weapon_change_probability: f32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            volume: 0.5,
            fov: 75.0,
            difficulty: Difficulty::default(),
            speed: 5.0,
            graphics_quality: 2,
            gravity: 9.8,
            target_speed: 1.0,
            target_movement_range: 2.0,
            crosshair_style: "default".to_string(),
            colorblind_mode: "none".to_string(),
            bullet_trail_enabled: true,
            time_of_day: TimeOfDay::default(),
            weather_condition: WeatherCondition::default(),
            npc_count: 5,
            npc_difficulty: Difficulty::default(),
            npc_shoot_back: true,
            npc_movement_speed: 3.0,
            npc_accuracy: 0.5,
            npc_reaction_time: 500.0,
            npc_weapon_change_probability: 0.001,
        }
    }
}
