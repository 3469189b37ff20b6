use deadeye_core::mode::{GameMode, Team};
use deadeye_core::net::messages::SyncMessage;
use deadeye_core::settings::GameSettings;
use deadeye_core::weapon::WeaponKind;
use glam::Vec3;
use serde::Serialize;

use crate::agent::Agent;
use crate::arena::{MapBounds, load_bounds};
use crate::config::SimConfig;
use crate::events::{EndReason, GameEvent, SessionCommand};
use crate::hotbar::CycleDirection;
use crate::persistence::{ProfileRepository, UserProfile};
use crate::projectile::Projectile;
use crate::session::{CountdownKind, Phase, PostGameAction, Session};
use crate::sync::SyncAdapter;
use crate::target::Target;

/// Read-only projection of the session for the HUD.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub phase: Phase,
    pub mode: GameMode,
    pub score: u64,
    pub accuracy: f32,
    pub time_remaining: Option<u32>,
    /// Seconds left before the session starts.
    pub countdown: Option<u32>,
    /// Seconds left before a paused session resumes.
    pub resume_countdown: Option<u32>,
    pub health: f32,
    pub max_health: f32,
    pub weapon: WeaponKind,
    pub kills: u32,
    pub team: Option<Team>,
}

/// Owns one session and routes its events to the sync adapter, the profile
/// repository and the command queue.
#[derive(Debug)]
pub struct Trainer {
    session: Session,
    sync: Option<SyncAdapter>,
    profiles: ProfileRepository,
    commands: Vec<SessionCommand>,
}

impl Trainer {
    pub fn new(
        config: SimConfig,
        settings: GameSettings,
        bounds: MapBounds,
        profiles: ProfileRepository,
    ) -> Self {
        let profiles = profiles.with_max_scores(config.session.recent_score_count);
        Self {
            session: Session::new(config, settings, bounds),
            sync: None,
            profiles,
            commands: Vec::new(),
        }
    }

    /// Build from `SimConfig::load()` and the named map's bounds.
    pub fn load(map: &str, settings: GameSettings, profiles: ProfileRepository) -> Self {
        Self::new(SimConfig::load(), settings, load_bounds(map), profiles)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.session = self.session.with_seed(seed);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    pub fn sync(&self) -> Option<&SyncAdapter> {
        self.sync.as_ref()
    }

    pub fn attach_sync(&mut self, adapter: SyncAdapter) {
        tracing::info!(peer = adapter.peer_id(), "Sync attached");
        self.sync = Some(adapter);
    }

    pub fn detach_sync(&mut self) -> Option<SyncAdapter> {
        self.sync.take()
    }

    /// Load the stored profile, adopting its username and settings.
    pub fn restore_profile(&mut self) -> Option<UserProfile> {
        match self.profiles.load_profile() {
            Ok(Some(profile)) => {
                self.session.set_username(profile.username.clone());
                self.apply_settings(profile.settings.clone());
                Some(profile)
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load profile");
                None
            },
        }
    }

    /// Take every command queued since the last call.
    pub fn drain_commands(&mut self) -> Vec<SessionCommand> {
        std::mem::take(&mut self.commands)
    }

    // ================================================================
    // Settings
    // ================================================================

    /// Replace the settings, queueing commands for every collaborator whose
    /// inputs changed.
    pub fn apply_settings(&mut self, settings: GameSettings) {
        let old = self.session.settings();
        if old.volume != settings.volume {
            self.commands.push(SessionCommand::SetVolume(settings.volume));
        }
        if old.graphics_quality != settings.graphics_quality
            || old.time_of_day != settings.time_of_day
            || old.weather_condition != settings.weather_condition
        {
            self.commands.push(SessionCommand::ApplyGraphics {
                quality: settings.graphics_quality,
                time_of_day: settings.time_of_day,
                weather: settings.weather_condition,
            });
        }
        if old.colorblind_mode != settings.colorblind_mode {
            self.commands
                .push(SessionCommand::SetColorblindMode(settings.colorblind_mode.clone()));
        }
        if old.crosshair_style != settings.crosshair_style {
            self.commands
                .push(SessionCommand::SetCrosshairStyle(settings.crosshair_style.clone()));
        }
        self.session.set_settings(settings);
    }

    // ================================================================
    // Session operations
    // ================================================================

    pub fn start_game(
        &mut self,
        mode: GameMode,
        multiplayer: bool,
        npc_count: u32,
    ) -> Vec<GameEvent> {
        let events = self.session.start_game(mode, multiplayer, npc_count);
        if multiplayer {
            match self.sync.as_mut() {
                Some(sync) => sync.announce_start(mode, self.session.settings()),
                None => self.commands.push(SessionCommand::ConnectSync),
            }
        }
        self.route(events, true)
    }

    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        let events = self.session.tick(dt);
        self.route(events, true)
    }

    pub fn fire(&mut self) -> Vec<GameEvent> {
        let events = self.session.fire();
        self.route(events, true)
    }

    pub fn press_trigger(&mut self) -> Vec<GameEvent> {
        let events = self.session.press_trigger();
        self.route(events, true)
    }

    pub fn release_trigger(&mut self) {
        self.session.release_trigger();
    }

    pub fn switch_weapon(&mut self, weapon: WeaponKind) -> Vec<GameEvent> {
        self.session.switch_weapon(weapon)
    }

    pub fn select_slot(&mut self, key: char) -> Vec<GameEvent> {
        self.session.select_slot(key)
    }

    pub fn cycle_weapon(&mut self, direction: CycleDirection) -> Vec<GameEvent> {
        self.session.cycle_weapon(direction)
    }

    pub fn set_player_pose(
        &mut self,
        position: Vec3,
        rotation: Vec3,
        aim_origin: Vec3,
        aim_direction: Vec3,
    ) {
        self.session
            .set_player_pose(position, rotation, aim_origin, aim_direction);
    }

    pub fn toggle_pause(&mut self) -> Vec<GameEvent> {
        self.session.toggle_pause()
    }

    pub fn open_settings(&mut self) -> Vec<GameEvent> {
        self.session.open_settings()
    }

    pub fn close_settings(&mut self) -> Vec<GameEvent> {
        self.session.close_settings()
    }

    pub fn quit(&mut self) -> Vec<GameEvent> {
        let events = self.session.quit();
        self.route(events, true)
    }

    pub fn end_game(&mut self) -> Vec<GameEvent> {
        let events = self.session.end_game();
        self.route(events, true)
    }

    pub fn post_game_action(&mut self, action: PostGameAction) -> Vec<GameEvent> {
        let restart = self
            .session
            .params()
            .filter(|_| action == PostGameAction::Restart && self.session.phase() == Phase::PostGame);
        let events = self.session.post_game_action(action);
        if let Some(params) = restart
            && params.multiplayer
            && let Some(sync) = self.sync.as_mut()
        {
            sync.announce_start(params.mode, self.session.settings());
        }
        self.route(events, true)
    }

    // ================================================================
    // Sync
    // ================================================================

    /// Apply every inbound sync message. Call between ticks.
    pub fn pump_sync(&mut self) -> Vec<GameEvent> {
        let Some(sync) = self.sync.as_mut() else {
            return Vec::new();
        };
        let messages = sync.poll();
        let mut out = Vec::new();
        for message in messages {
            let events = match message {
                SyncMessage::GameStart(msg) => {
                    tracing::info!(mode = ?msg.mode, "Peer started a session");
                    let npc_count = msg.settings.npc_count;
                    self.apply_settings(msg.settings);
                    self.session.start_game(msg.mode, true, npc_count)
                },
                SyncMessage::TargetHit(msg) => {
                    self.session.apply_remote_hit(msg.entity, msg.hit_score)
                },
                SyncMessage::GameEnd(msg) => {
                    tracing::info!(
                        score = msg.score,
                        kills = msg.player_kills,
                        "Peer ended the session"
                    );
                    self.session.end_game_with(EndReason::Remote)
                },
            };
            out.extend(self.route(events, false));
        }
        out
    }

    // ================================================================
    // Projections
    // ================================================================

    pub fn hud(&self) -> HudSnapshot {
        let s = &self.session;
        let player = s.player();
        let countdown = s.countdown();
        let remaining_for = |kind: CountdownKind| {
            countdown
                .filter(|c| c.kind == kind)
                .map(|c| c.remaining)
        };
        HudSnapshot {
            phase: s.phase(),
            mode: s.mode(),
            score: s.scoreboard().score,
            accuracy: s.scoreboard().accuracy,
            time_remaining: s.time_remaining(),
            countdown: remaining_for(CountdownKind::Start),
            resume_countdown: remaining_for(CountdownKind::Resume),
            health: player.health,
            max_health: player.max_health,
            weapon: player.weapon,
            kills: player.kills,
            team: player.team,
        }
    }

    pub fn targets(&self) -> &[Target] {
        self.session.targets()
    }

    pub fn agents(&self) -> &[Agent] {
        self.session.agents()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        self.session.projectiles()
    }

    /// Forward session events to collaborators. Events caused by a peer are
    /// not mirrored back out.
    fn route(&mut self, events: Vec<GameEvent>, local: bool) -> Vec<GameEvent> {
        let multiplayer = self.session.is_multiplayer();
        for event in &events {
            match event {
                GameEvent::HitLanded {
                    entity, hit_score, ..
                } if local && multiplayer => {
                    if let Some(sync) = self.sync.as_mut() {
                        sync.announce_hit(*entity, *hit_score);
                    }
                },
                GameEvent::SessionEnded {
                    reason,
                    score,
                    kills,
                } => {
                    if *reason != EndReason::Quit {
                        self.flush(*score);
                    }
                    if multiplayer {
                        if local && let Some(sync) = self.sync.as_mut() {
                            sync.announce_end(*score, *kills);
                        }
                        self.commands.push(SessionCommand::DisconnectSync);
                    }
                },
                _ => {},
            }
        }
        events
    }

    fn flush(&mut self, score: u64) {
        let username = self.session.player().username.clone();
        if let Err(e) = self
            .profiles
            .flush_session(score, &username, self.session.settings())
        {
            tracing::warn!(error = %e, score, "Failed to persist session result");
        }
    }
}
