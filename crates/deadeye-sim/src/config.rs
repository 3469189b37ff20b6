use serde::{Deserialize, Serialize};

/// A parsed config whose values would break sampling or scoring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{min_field} ({min}) exceeds {max_field} ({max})")]
    InvertedRange {
        min_field: &'static str,
        max_field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
}

fn check_range(
    min_field: &'static str,
    min: f64,
    max_field: &'static str,
    max: f64,
) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange {
            min_field,
            max_field,
            min,
            max,
        })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// Data-driven tuning for the simulation. Every field has a default, so a
/// TOML file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed tick cadence the host drives `tick` at (Hz).
    pub tick_rate_hz: u32,
    pub agents: AgentTuning,
    pub ballistics: BallisticsTuning,
    pub targets: TargetTuning,
    pub session: SessionTuning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Beyond this planar distance an agent closes on the player.
    pub far_threshold: f32,
    /// Inside this planar distance an agent backs away.
    pub near_threshold: f32,
    /// Length of one approach/evade waypoint step.
    pub waypoint_step: f32,
    /// Half-width of the random patrol offset.
    pub patrol_radius: f32,
    pub decision_min_ms: f64,
    pub decision_max_ms: f64,
    /// Distance from a waypoint at which the agent counts as arrived.
    pub arrival_radius: f32,
    /// Collision radius used by ballistics.
    pub radius: f32,
    /// Agents never fire beyond this distance.
    pub range: f32,
    /// Distance scale of the exponential hit and damage falloff.
    pub hit_falloff: f32,
    /// Per grounded tick probability of a jump.
    pub jump_chance: f64,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub respawn_min_radius: f32,
    pub respawn_max_radius: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallisticsTuning {
    pub projectile_radius: f32,
    /// Age at which an unexploded area-effect round detonates on its own.
    pub explosion_trigger_ms: f64,
    /// How long an explosion effect stays on its projectile.
    pub explosion_duration_ms: f64,
    pub min_hit_score: f32,
    pub max_hit_score: f32,
    /// Trail points kept per projectile.
    pub max_trail_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetTuning {
    pub spawn_min_radius: f32,
    pub spawn_max_radius: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Oscillating targets are pulled back onto a sphere of this radius.
    pub max_distance: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    pub start_countdown_secs: u32,
    pub resume_countdown_secs: u32,
    pub weapon_swap_ms: f64,
    pub timed_secs: u32,
    pub precision_secs: u32,
    pub deathmatch_secs: u32,
    pub timed_targets: usize,
    pub endurance_targets: usize,
    pub precision_targets: usize,
    /// Length of the persisted recent high-score list.
    pub recent_score_count: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            agents: AgentTuning::default(),
            ballistics: BallisticsTuning::default(),
            targets: TargetTuning::default(),
            session: SessionTuning::default(),
        }
    }
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            far_threshold: 30.0,
            near_threshold: 4.0,
            waypoint_step: 5.0,
            patrol_radius: 3.0,
            decision_min_ms: 500.0,
            decision_max_ms: 2000.0,
            arrival_radius: 0.5,
            radius: 1.0,
            range: 50.0,
            hit_falloff: 80.0,
            jump_chance: 0.005,
            gravity: -9.8,
            jump_velocity: 5.0,
            respawn_min_radius: 10.0,
            respawn_max_radius: 20.0,
            max_health: 100.0,
        }
    }
}

impl Default for BallisticsTuning {
    fn default() -> Self {
        Self {
            projectile_radius: 0.05,
            explosion_trigger_ms: 1500.0,
            explosion_duration_ms: 2000.0,
            min_hit_score: 10.0,
            max_hit_score: 100.0,
            max_trail_points: 64,
        }
    }
}

impl Default for TargetTuning {
    fn default() -> Self {
        Self {
            spawn_min_radius: 15.0,
            spawn_max_radius: 25.0,
            min_height: 1.5,
            max_height: 3.5,
            max_distance: 20.0,
            max_health: 100.0,
        }
    }
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            start_countdown_secs: 3,
            resume_countdown_secs: 3,
            weapon_swap_ms: 500.0,
            timed_secs: 60,
            precision_secs: 60,
            deathmatch_secs: 300,
            timed_targets: 10,
            endurance_targets: 10,
            precision_targets: 5,
            recent_score_count: 5,
        }
    }
}

impl SimConfig {
    /// Load config from `$DEADEYE_CONFIG` or `config/deadeye.toml`, falling
    /// back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("DEADEYE_CONFIG")
            && let Some(config) = Self::load_from_path(&path)
        {
            return config;
        }
        Self::load_from_path("config/deadeye.toml").unwrap_or_default()
    }

    /// Read and parse one TOML file. A missing file is silent; a malformed
    /// one is logged.
    pub fn load_from_path(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        let config = match toml::from_str::<Self>(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to parse {path}: {e}");
                return None;
            },
        };
        match config.validate() {
            Ok(()) => Some(config),
            Err(e) => {
                tracing::warn!("Ignoring {path}: {e}");
                None
            },
        }
    }

    /// Reject ranges the samplers cannot draw from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.agents;
        let t = &self.targets;
        let b = &self.ballistics;
        check_range(
            "agents.respawn_min_radius",
            f64::from(a.respawn_min_radius),
            "agents.respawn_max_radius",
            f64::from(a.respawn_max_radius),
        )?;
        check_range(
            "agents.decision_min_ms",
            a.decision_min_ms,
            "agents.decision_max_ms",
            a.decision_max_ms,
        )?;
        check_non_negative("agents.patrol_radius", f64::from(a.patrol_radius))?;
        check_range(
            "targets.spawn_min_radius",
            f64::from(t.spawn_min_radius),
            "targets.spawn_max_radius",
            f64::from(t.spawn_max_radius),
        )?;
        check_range(
            "targets.min_height",
            f64::from(t.min_height),
            "targets.max_height",
            f64::from(t.max_height),
        )?;
        check_range(
            "ballistics.min_hit_score",
            f64::from(b.min_hit_score),
            "ballistics.max_hit_score",
            f64::from(b.max_hit_score),
        )?;
        Ok(())
    }

    /// Milliseconds per tick at the configured cadence.
    pub fn tick_interval_ms(&self) -> f64 {
        1000.0 / f64::from(self.tick_rate_hz.max(1))
    }
}
