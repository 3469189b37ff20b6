use deadeye_core::mode::GameMode;
use deadeye_core::net::messages::EntityRef;
use deadeye_core::settings::{TimeOfDay, WeatherCondition};
use deadeye_core::weapon::WeaponKind;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::projectile::HitCause;
use crate::session::Phase;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    TimeExpired,
    Quit,
    /// `end_game` was called locally.
    Ended,
    /// A peer announced the end of the shared session.
    Remote,
}

/// Something that happened during a session operation or tick, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    SessionStarted {
        mode: GameMode,
        multiplayer: bool,
    },
    /// One second of a start or resume countdown elapsed.
    CountdownTick {
        remaining: u32,
    },
    /// One second of the session timer elapsed.
    TimerTick {
        remaining: u32,
    },
    SessionEnded {
        reason: EndReason,
        score: u64,
        kills: u32,
    },
    ShotFired {
        weapon: WeaponKind,
        projectiles: usize,
    },
    /// A local shot connected and was scored.
    HitLanded {
        entity: EntityRef,
        hit_score: f32,
        cause: HitCause,
    },
    /// A peer's hit was applied without scoring.
    RemoteHitApplied {
        entity: EntityRef,
        amount: f32,
    },
    TargetDestroyed {
        old: Uuid,
        new: Uuid,
    },
    AgentKilled {
        agent: AgentId,
    },
    PlayerDamaged {
        agent: AgentId,
        damage: f32,
        health: f32,
    },
    GroundImpact {
        position: Vec3,
    },
    Explosion {
        position: Vec3,
        radius: f32,
    },
    WeaponSwapStarted {
        weapon: WeaponKind,
        ready_at: f64,
    },
    WeaponReady {
        weapon: WeaponKind,
    },
}

/// Side effects addressed to named collaborators outside the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SetVolume(f32),
    ApplyGraphics {
        quality: u8,
        time_of_day: TimeOfDay,
        weather: WeatherCondition,
    },
    SetColorblindMode(String),
    SetCrosshairStyle(String),
    ConnectSync,
    DisconnectSync,
}
