use deadeye_core::mode::{GameMode, Team};
use deadeye_core::net::messages::EntityRef;
use deadeye_core::player::{PlayerState, WeaponSwap};
use deadeye_core::settings::GameSettings;
use deadeye_core::weapon::WeaponKind;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentContext, AgentController, AgentDamage};
use crate::arena::MapBounds;
use crate::config::SimConfig;
use crate::events::{EndReason, GameEvent};
use crate::hotbar::{self, CycleDirection};
use crate::projectile::{Ballistics, BallisticsEvent, FireRequest, Hittable, Impact, Projectile};
use crate::scoring::Scoreboard;
use crate::target::{Target, TargetDamage, TargetManager};
use crate::weapon::profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    MainMenu,
    Countdown,
    Running,
    Paused,
    Settings,
    PostGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostGameAction {
    Restart,
    Exit,
}

/// Parameters of the last `start_game`, replayed by a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartParams {
    pub mode: GameMode,
    pub multiplayer: bool,
    pub npc_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownKind {
    Start,
    Resume,
}

/// A running countdown. Lives in the session as plain data so leaving the
/// phase drops it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    pub kind: CountdownKind,
    pub remaining: u32,
    elapsed: f32,
}

/// Where closing the settings screen returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsOrigin {
    MainMenu,
    Running,
    Paused,
}

/// One game session: phase machine, clock, scoreboard and every simulated
/// entity.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    mode: GameMode,
    params: Option<StartParams>,
    time_remaining: Option<u32>,
    scoreboard: Scoreboard,
    countdown: Option<Countdown>,
    settings_origin: Option<SettingsOrigin>,
    clock_ms: f64,
    timer_elapsed: f32,
    player: PlayerState,
    ballistics: Ballistics,
    targets: TargetManager,
    agents: AgentController,
    settings: GameSettings,
    bounds: MapBounds,
    config: SimConfig,
    rng: StdRng,
}

impl Session {
    pub fn new(config: SimConfig, settings: GameSettings, bounds: MapBounds) -> Self {
        Self {
            phase: Phase::MainMenu,
            mode: GameMode::default(),
            params: None,
            time_remaining: None,
            scoreboard: Scoreboard::default(),
            countdown: None,
            settings_origin: None,
            clock_ms: 0.0,
            timer_elapsed: 0.0,
            player: PlayerState::new(1, "Player"),
            ballistics: Ballistics::new(config.ballistics.clone()),
            targets: TargetManager::new(config.targets.clone()),
            agents: AgentController::new(config.agents.clone()),
            settings,
            bounds,
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reseed the session RNG for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ================================================================
    // Accessors
    // ================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn params(&self) -> Option<StartParams> {
        self.params
    }

    pub fn is_multiplayer(&self) -> bool {
        self.params.is_some_and(|p| p.multiplayer)
    }

    pub fn time_remaining(&self) -> Option<u32> {
        self.time_remaining
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn targets(&self) -> &[Target] {
        self.targets.targets()
    }

    pub fn agents(&self) -> &[Agent] {
        self.agents.agents()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        self.ballistics.projectiles()
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn bounds(&self) -> &MapBounds {
        &self.bounds
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// True while a session exists, whether or not its clock is running.
    pub fn is_active(&self) -> bool {
        match self.phase {
            Phase::Countdown | Phase::Running | Phase::Paused => true,
            Phase::Settings => self.settings_origin != Some(SettingsOrigin::MainMenu),
            Phase::MainMenu | Phase::PostGame => false,
        }
    }

    // ================================================================
    // Injected state
    // ================================================================

    /// Replace the settings. Takes effect for spawns and motion from now on.
    pub fn set_settings(&mut self, settings: GameSettings) {
        self.settings = settings;
    }

    pub fn set_bounds(&mut self, bounds: MapBounds) {
        self.bounds = bounds;
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.player.username = username.into();
    }

    /// Pose pushed in by the character controller. Non-finite values are
    /// dropped so they cannot poison the simulation.
    pub fn set_player_pose(
        &mut self,
        position: Vec3,
        rotation: Vec3,
        aim_origin: Vec3,
        aim_direction: Vec3,
    ) {
        if ![position, rotation, aim_origin, aim_direction]
            .iter()
            .all(|v| v.is_finite())
        {
            tracing::debug!("Dropped non-finite player pose");
            return;
        }
        self.player.position = position;
        self.player.rotation = rotation;
        self.player.aim_origin = aim_origin;
        self.player.aim_direction = aim_direction.normalize_or(Vec3::NEG_Z);
    }

    // ================================================================
    // Lifecycle
    // ================================================================

    /// Reset and populate a new session for `mode`, entering the start
    /// countdown.
    pub fn start_game(
        &mut self,
        mode: GameMode,
        multiplayer: bool,
        npc_count: u32,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.params = Some(StartParams {
            mode,
            multiplayer,
            npc_count,
        });
        self.mode = mode;
        self.scoreboard = Scoreboard::default();
        self.player.reset_for_session();
        self.ballistics.clear();
        self.targets.clear();
        self.agents.clear();
        self.clock_ms = 0.0;
        self.timer_elapsed = 0.0;
        self.settings_origin = None;

        let s = &self.config.session;
        let (duration, target_count) = match mode {
            GameMode::Timed => (Some(s.timed_secs), s.timed_targets),
            GameMode::Endurance => (None, s.endurance_targets),
            GameMode::Precision => (Some(s.precision_secs), s.precision_targets),
            GameMode::Deathmatch | GameMode::TeamDeathmatch => (Some(s.deathmatch_secs), 0),
        };
        self.time_remaining = duration;

        if mode.is_practice() {
            self.targets
                .spawn(target_count, &self.settings, &mut self.rng);
            self.targets.advance(self.clock_ms, &self.settings);
        }
        if mode.is_team_mode() {
            self.player.team = Some(Team::from_coin(self.rng.random()));
        }
        if mode.is_deathmatch() && !multiplayer {
            let ctx = AgentContext {
                player_position: self.player.position,
                player_team: self.player.team,
                settings: &self.settings,
                bounds: &self.bounds,
            };
            self.agents
                .spawn(npc_count, mode.is_team_mode(), self.clock_ms, &ctx, &mut self.rng);
        }

        tracing::info!(?mode, multiplayer, npc_count, "Session started");
        events.push(GameEvent::SessionStarted { mode, multiplayer });
        self.begin_countdown(CountdownKind::Start, &mut events);
        events
    }

    /// Advance the session by `dt` seconds. Only the countdown and running
    /// phases do anything.
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut events = Vec::new();
        match self.phase {
            Phase::Countdown => self.tick_countdown(dt, &mut events),
            Phase::Running => self.tick_running(dt, &mut events),
            Phase::MainMenu | Phase::Paused | Phase::Settings | Phase::PostGame => {},
        }
        events
    }

    /// Abandon the session and return to the main menu.
    pub fn quit(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.is_active() {
            self.finish(EndReason::Quit, Phase::MainMenu, &mut events);
            self.clear_entities();
        }
        events
    }

    /// End the session explicitly and show the summary.
    pub fn end_game(&mut self) -> Vec<GameEvent> {
        self.end_game_with(EndReason::Ended)
    }

    /// End the session into `PostGame` for the given reason. No-op when no
    /// session is active.
    pub fn end_game_with(&mut self, reason: EndReason) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.is_active() {
            self.finish(reason, Phase::PostGame, &mut events);
        }
        events
    }

    pub fn toggle_pause(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        match (self.phase, self.countdown.map(|c| c.kind)) {
            (Phase::Running, _) | (Phase::Countdown, Some(CountdownKind::Resume)) => {
                self.countdown = None;
                self.set_phase(Phase::Paused, &mut events);
            },
            (Phase::Paused, _) => self.set_phase(Phase::Running, &mut events),
            _ => {},
        }
        events
    }

    pub fn open_settings(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let origin = match (self.phase, self.countdown.map(|c| c.kind)) {
            (Phase::MainMenu, _) => SettingsOrigin::MainMenu,
            (Phase::Running, _) | (Phase::Countdown, Some(CountdownKind::Resume)) => {
                SettingsOrigin::Running
            },
            (Phase::Paused, _) => SettingsOrigin::Paused,
            _ => return events,
        };
        self.countdown = None;
        self.player.trigger_held = false;
        self.settings_origin = Some(origin);
        self.set_phase(Phase::Settings, &mut events);
        events
    }

    pub fn close_settings(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.phase != Phase::Settings {
            return events;
        }
        match self.settings_origin.take() {
            Some(SettingsOrigin::Running) => {
                self.begin_countdown(CountdownKind::Resume, &mut events);
            },
            Some(SettingsOrigin::Paused) => self.set_phase(Phase::Paused, &mut events),
            Some(SettingsOrigin::MainMenu) | None => self.set_phase(Phase::MainMenu, &mut events),
        }
        events
    }

    pub fn post_game_action(&mut self, action: PostGameAction) -> Vec<GameEvent> {
        if self.phase != Phase::PostGame {
            return Vec::new();
        }
        match (action, self.params) {
            (PostGameAction::Restart, Some(p)) => {
                self.start_game(p.mode, p.multiplayer, p.npc_count)
            },
            _ => {
                let mut events = Vec::new();
                self.clear_entities();
                self.set_phase(Phase::MainMenu, &mut events);
                events
            },
        }
    }

    // ================================================================
    // Weapons
    // ================================================================

    /// Pull the trigger once and start holding it.
    pub fn press_trigger(&mut self) -> Vec<GameEvent> {
        self.player.trigger_held = true;
        self.fire()
    }

    pub fn release_trigger(&mut self) {
        self.player.trigger_held = false;
    }

    /// One fire request with the current weapon along the current aim.
    /// Silently dropped outside `Running`, during a swap, or inside the
    /// weapon's fire interval.
    pub fn fire(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.phase == Phase::Running {
            self.fire_into(&mut events);
        }
        events
    }

    fn fire_into(&mut self, events: &mut Vec<GameEvent>) {
        if self.player.is_swapping() {
            return;
        }
        let hittables = self.hittables();
        let request = FireRequest {
            weapon: self.player.weapon,
            origin: self.player.aim_origin,
            direction: self.player.aim_direction,
            trails: self.settings.bullet_trail_enabled,
        };
        let Some(shot) = self
            .ballistics
            .try_fire(request, self.clock_ms, &hittables, &mut self.rng)
        else {
            return;
        };
        self.scoreboard.record_shot();
        events.push(GameEvent::ShotFired {
            weapon: request.weapon,
            projectiles: shot.spawned.len(),
        });
        for impact in shot.impacts {
            self.apply_local_impact(impact, events);
        }
    }

    /// Begin swapping to `weapon`. Outside a running session the swap is
    /// instant since the clock is stopped.
    pub fn switch_weapon(&mut self, weapon: WeaponKind) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let pending = self.player.swap.map(|s| s.weapon);
        if pending == Some(weapon) || (pending.is_none() && self.player.weapon == weapon) {
            return events;
        }
        if self.phase == Phase::Running {
            let ready_at = self.clock_ms + self.config.session.weapon_swap_ms;
            self.player.swap = Some(WeaponSwap { weapon, ready_at });
            events.push(GameEvent::WeaponSwapStarted { weapon, ready_at });
        } else {
            self.player.swap = None;
            self.player.weapon = weapon;
            events.push(GameEvent::WeaponReady { weapon });
        }
        events
    }

    /// Switch to the weapon bound to a hotbar key (`1`..`9`, `0`).
    pub fn select_slot(&mut self, key: char) -> Vec<GameEvent> {
        match hotbar::weapon_for_key(key) {
            Some(weapon) => self.switch_weapon(weapon),
            None => {
                tracing::debug!(%key, "Ignoring unbound hotbar key");
                Vec::new()
            },
        }
    }

    pub fn cycle_weapon(&mut self, direction: CycleDirection) -> Vec<GameEvent> {
        let from = self
            .player
            .swap
            .map_or(self.player.weapon, |s| s.weapon);
        self.switch_weapon(hotbar::cycle(from, direction))
    }

    // ================================================================
    // Remote sync
    // ================================================================

    /// Apply a peer's hit: damage without scoring or kill credit.
    pub fn apply_remote_hit(&mut self, entity: EntityRef, amount: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if !self.is_active() {
            return events;
        }
        match entity {
            EntityRef::Target(id) => {
                let Some(result) =
                    self.targets
                        .apply_damage(id, amount, &self.settings, &mut self.rng)
                else {
                    return events;
                };
                events.push(GameEvent::RemoteHitApplied { entity, amount });
                if let TargetDamage::Destroyed { old, new } = result {
                    events.push(GameEvent::TargetDestroyed { old, new });
                }
            },
            EntityRef::Agent(id) => {
                let ctx = AgentContext {
                    player_position: self.player.position,
                    player_team: self.player.team,
                    settings: &self.settings,
                    bounds: &self.bounds,
                };
                let Some(result) =
                    self.agents
                        .apply_damage(id, amount, self.clock_ms, &ctx, &mut self.rng)
                else {
                    return events;
                };
                events.push(GameEvent::RemoteHitApplied { entity, amount });
                if let AgentDamage::Killed { id } = result {
                    events.push(GameEvent::AgentKilled { agent: id });
                }
            },
        }
        events
    }

    // ================================================================
    // Internals
    // ================================================================

    fn set_phase(&mut self, to: Phase, events: &mut Vec<GameEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        tracing::info!(?from, ?to, "Phase changed");
        events.push(GameEvent::PhaseChanged { from, to });
    }

    fn begin_countdown(&mut self, kind: CountdownKind, events: &mut Vec<GameEvent>) {
        let secs = match kind {
            CountdownKind::Start => self.config.session.start_countdown_secs,
            CountdownKind::Resume => self.config.session.resume_countdown_secs,
        };
        if secs == 0 {
            self.countdown = None;
            self.set_phase(Phase::Running, events);
            return;
        }
        self.countdown = Some(Countdown {
            kind,
            remaining: secs,
            elapsed: 0.0,
        });
        self.set_phase(Phase::Countdown, events);
    }

    fn tick_countdown(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let Some(mut countdown) = self.countdown else {
            self.set_phase(Phase::Running, events);
            return;
        };
        countdown.elapsed += dt;
        while countdown.elapsed >= 1.0 && countdown.remaining > 0 {
            countdown.elapsed -= 1.0;
            countdown.remaining -= 1;
            events.push(GameEvent::CountdownTick {
                remaining: countdown.remaining,
            });
        }
        if countdown.remaining == 0 {
            self.countdown = None;
            self.set_phase(Phase::Running, events);
        } else {
            self.countdown = Some(countdown);
        }
    }

    fn tick_running(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        self.clock_ms += f64::from(dt) * 1000.0;
        let now = self.clock_ms;

        if let Some(swap) = self.player.swap
            && now >= swap.ready_at
        {
            self.player.swap = None;
            self.player.weapon = swap.weapon;
            events.push(GameEvent::WeaponReady {
                weapon: swap.weapon,
            });
        }

        if self.player.trigger_held && profile(self.player.weapon).auto_fire {
            self.fire_into(events);
        }

        let hittables = self.hittables();
        let outcome = self.ballistics.update(dt, now, &hittables);
        for event in outcome.events {
            events.push(match event {
                BallisticsEvent::GroundImpact { position } => GameEvent::GroundImpact { position },
                BallisticsEvent::Exploded { position, radius } => {
                    GameEvent::Explosion { position, radius }
                },
            });
        }
        for impact in outcome.impacts {
            self.apply_local_impact(impact, events);
        }

        self.targets.advance(now, &self.settings);

        let ctx = AgentContext {
            player_position: self.player.position,
            player_team: self.player.team,
            settings: &self.settings,
            bounds: &self.bounds,
        };
        let shots = self.agents.update(dt, now, &ctx, &mut self.rng);
        for shot in shots {
            let health = self.player.take_damage(shot.damage);
            events.push(GameEvent::PlayerDamaged {
                agent: shot.agent,
                damage: shot.damage,
                health,
            });
        }

        self.tick_timer(dt, events);
    }

    fn tick_timer(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        self.timer_elapsed += dt;
        while self.timer_elapsed >= 1.0 {
            self.timer_elapsed -= 1.0;
            let Some(remaining) = self.time_remaining else {
                continue;
            };
            if remaining <= 1 {
                self.time_remaining = Some(0);
                self.finish(EndReason::TimeExpired, Phase::PostGame, events);
                return;
            }
            self.time_remaining = Some(remaining - 1);
            events.push(GameEvent::TimerTick {
                remaining: remaining - 1,
            });
        }
    }

    /// Targets first, then agents not on the player's side.
    fn hittables(&self) -> Vec<Hittable> {
        let targets = self.targets.targets().iter().map(|t| Hittable {
            entity: EntityRef::Target(t.id),
            position: t.position,
            radius: t.radius(),
        });
        let agent_radius = self.config.agents.radius;
        let agents = self
            .agents
            .agents()
            .iter()
            .filter(|a| !a.is_ally_of(self.player.team))
            .map(|a| Hittable {
                entity: EntityRef::Agent(a.id),
                position: a.position,
                radius: agent_radius,
            });
        targets.chain(agents).collect()
    }

    /// Apply and score one of the player's own impacts. Impacts on entities
    /// replaced earlier in the tick are dropped unscored.
    fn apply_local_impact(&mut self, impact: Impact, events: &mut Vec<GameEvent>) {
        let Impact {
            entity,
            amount,
            cause,
        } = impact;
        match entity {
            EntityRef::Target(id) => {
                let Some(result) =
                    self.targets
                        .apply_damage(id, amount, &self.settings, &mut self.rng)
                else {
                    return;
                };
                self.scoreboard.record_hit(amount);
                events.push(GameEvent::HitLanded {
                    entity,
                    hit_score: amount,
                    cause,
                });
                if let TargetDamage::Destroyed { old, new } = result {
                    events.push(GameEvent::TargetDestroyed { old, new });
                }
            },
            EntityRef::Agent(id) => {
                let ctx = AgentContext {
                    player_position: self.player.position,
                    player_team: self.player.team,
                    settings: &self.settings,
                    bounds: &self.bounds,
                };
                let Some(result) =
                    self.agents
                        .apply_damage(id, amount, self.clock_ms, &ctx, &mut self.rng)
                else {
                    return;
                };
                self.scoreboard.record_hit(amount);
                events.push(GameEvent::HitLanded {
                    entity,
                    hit_score: amount,
                    cause,
                });
                if let AgentDamage::Killed { id } = result {
                    self.player.kills += 1;
                    events.push(GameEvent::AgentKilled { agent: id });
                }
            },
        }
        tracing::debug!(cause = cause.label(), amount, "Hit landed");
        self.player.score = self.scoreboard.score;
    }

    fn finish(&mut self, reason: EndReason, to: Phase, events: &mut Vec<GameEvent>) {
        self.countdown = None;
        self.settings_origin = None;
        self.player.trigger_held = false;
        self.player.swap = None;
        self.ballistics.clear();
        self.set_phase(to, events);
        let score = self.scoreboard.score;
        let kills = self.player.kills;
        tracing::info!(?reason, score, kills, "Session ended");
        events.push(GameEvent::SessionEnded {
            reason,
            score,
            kills,
        });
    }

    fn clear_entities(&mut self) {
        self.ballistics.clear();
        self.targets.clear();
        self.agents.clear();
    }
}
