use deadeye_core::mode::Team;
use deadeye_core::settings::GameSettings;
use deadeye_core::weapon::WeaponKind;
use glam::Vec3;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::arena::MapBounds;
use crate::config::AgentTuning;
use crate::weapon::profile;

/// Stable identifier of an agent; survives respawns.
pub type AgentId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    #[default]
    Idle,
    Moving,
    Attacking,
    Evading,
    Patrolling,
}

/// An autonomous opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec3,
    /// Euler angles; only yaw (`y`) is driven.
    pub rotation: Vec3,
    pub vertical_velocity: f32,
    pub grounded: bool,
    pub health: f32,
    pub max_health: f32,
    pub weapon: WeaponKind,
    pub state: AgentState,
    pub speed: f32,
    pub last_shot_at: f64,
    pub shoot_interval: f64,
    pub waypoint: Vec3,
    pub next_decision_at: f64,
    pub accuracy: f32,
    pub reaction_time: f64,
    pub team: Option<Team>,
}

impl Agent {
    /// Whether this agent fights alongside a player on `player_team`.
    pub fn is_ally_of(&self, player_team: Option<Team>) -> bool {
        matches!((self.team, player_team), (Some(a), Some(b)) if a == b)
    }
}

/// What the controller needs to know about the world this tick.
#[derive(Debug, Clone, Copy)]
pub struct AgentContext<'a> {
    pub player_position: Vec3,
    pub player_team: Option<Team>,
    pub settings: &'a GameSettings,
    pub bounds: &'a MapBounds,
}

/// A successful agent shot on the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentShot {
    pub agent: AgentId,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentDamage {
    Damaged { id: AgentId, health: f32 },
    /// Health reached zero; the agent was respawned in place.
    Killed { id: AgentId },
}

fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Drives every agent's movement and fire decisions.
#[derive(Debug, Clone)]
pub struct AgentController {
    agents: Vec<Agent>,
    tuning: AgentTuning,
}

impl AgentController {
    pub fn new(tuning: AgentTuning) -> Self {
        Self {
            agents: Vec::new(),
            tuning,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn clear(&mut self) {
        self.agents.clear();
    }

    /// Replace the population with `count` agents around the player. In team
    /// modes every agent is assigned a random side.
    pub fn spawn(
        &mut self,
        count: u32,
        team_mode: bool,
        now: f64,
        ctx: &AgentContext<'_>,
        rng: &mut impl Rng,
    ) {
        self.agents.clear();
        for id in 1..=u64::from(count) {
            let weapon = WeaponKind::AGENT_ARSENAL
                .choose(rng)
                .copied()
                .unwrap_or_default();
            let team = team_mode.then(|| Team::from_coin(rng.random()));
            let mut agent = Agent {
                id,
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                vertical_velocity: 0.0,
                grounded: true,
                health: self.tuning.max_health,
                max_health: self.tuning.max_health,
                weapon,
                state: AgentState::Idle,
                speed: ctx.settings.npc_movement_speed,
                last_shot_at: now,
                shoot_interval: 0.0,
                waypoint: Vec3::ZERO,
                next_decision_at: now,
                accuracy: ctx.settings.npc_accuracy,
                reaction_time: f64::from(ctx.settings.npc_reaction_time),
                team,
            };
            self.respawn(&mut agent, now, ctx, rng);
            self.agents.push(agent);
        }
    }

    /// Put an agent back on the ring around the player with full health and
    /// fresh timers. Id, weapon and team are kept.
    fn respawn(&self, agent: &mut Agent, now: f64, ctx: &AgentContext<'_>, rng: &mut impl Rng) {
        let t = &self.tuning;
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let radius = rng.random_range(t.respawn_min_radius..=t.respawn_max_radius);
        let ring = planar(ctx.player_position) + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius;
        let position = ctx.bounds.clamp(ring);
        agent.position = position;
        agent.waypoint = position;
        agent.vertical_velocity = 0.0;
        agent.grounded = true;
        agent.health = agent.max_health;
        agent.state = AgentState::Idle;
        agent.next_decision_at = now + rng.random_range(t.decision_min_ms..=t.decision_max_ms);
        // First shot waits out the reaction time.
        agent.last_shot_at = now;
        agent.shoot_interval = agent.reaction_time;
    }

    /// Advance every agent by `dt` seconds. Returns the shots that hit the
    /// player this tick.
    pub fn update(
        &mut self,
        dt: f32,
        now: f64,
        ctx: &AgentContext<'_>,
        rng: &mut impl Rng,
    ) -> Vec<AgentShot> {
        let dt = dt.max(0.0);
        let mut shots = Vec::new();
        let mut agents = std::mem::take(&mut self.agents);
        for agent in &mut agents {
            if now >= agent.next_decision_at {
                self.decide(agent, now, ctx, rng);
            }
            churn_weapon(agent, ctx.settings, rng);
            let attacked = self.fire(agent, now, ctx, rng, &mut shots);
            self.steer(agent, dt, attacked);
            self.integrate_vertical(agent, dt, rng);
            agent.position = ctx.bounds.clamp(agent.position);
        }
        self.agents = agents;
        shots
    }

    fn decide(&self, agent: &mut Agent, now: f64, ctx: &AgentContext<'_>, rng: &mut impl Rng) {
        let t = &self.tuning;
        let player = planar(ctx.player_position);
        let to_player = player - planar(agent.position);
        let distance = to_player.length();
        let toward = to_player.normalize_or(Vec3::X);

        let (state, raw) = if distance > t.far_threshold {
            (AgentState::Moving, agent.position + toward * t.waypoint_step)
        } else if distance < t.near_threshold {
            (AgentState::Evading, agent.position - toward * t.waypoint_step)
        } else {
            let offset = Vec3::new(
                rng.random_range(-t.patrol_radius..=t.patrol_radius),
                0.0,
                rng.random_range(-t.patrol_radius..=t.patrol_radius),
            );
            (AgentState::Patrolling, agent.position + offset)
        };

        let mut waypoint = ctx.bounds.clamp(planar(raw));
        let leash = waypoint - player;
        if leash.length() > t.far_threshold {
            waypoint = player + leash.normalize_or_zero() * t.far_threshold;
        }
        agent.waypoint = ctx.bounds.clamp(waypoint);
        agent.state = state;
        agent.next_decision_at = now + rng.random_range(t.decision_min_ms..=t.decision_max_ms);
    }

    /// Roll for a shot at the player. Returns whether the agent hit.
    fn fire(
        &self,
        agent: &mut Agent,
        now: f64,
        ctx: &AgentContext<'_>,
        rng: &mut impl Rng,
        shots: &mut Vec<AgentShot>,
    ) -> bool {
        if !ctx.settings.npc_shoot_back || agent.is_ally_of(ctx.player_team) {
            return false;
        }
        if now - agent.last_shot_at < agent.shoot_interval {
            return false;
        }
        let distance = agent.position.distance(ctx.player_position);
        if distance > self.tuning.range {
            return false;
        }

        let falloff = (-distance / self.tuning.hit_falloff).exp();
        let hit = rng.random::<f32>() < agent.accuracy * falloff;
        if hit {
            shots.push(AgentShot {
                agent: agent.id,
                damage: profile(agent.weapon).agent_base_damage * falloff,
            });
            agent.state = AgentState::Attacking;
        }
        agent.last_shot_at = now;
        agent.shoot_interval =
            1000.0 / f64::from(agent.accuracy.max(0.01)) * rng.random_range(0.8..=1.2);
        hit
    }

    fn steer(&self, agent: &mut Agent, dt: f32, attacked: bool) {
        let to_waypoint = planar(agent.waypoint - agent.position);
        let remaining = to_waypoint.length();
        if remaining > 0.0 {
            let dir = to_waypoint / remaining;
            agent.position += dir * (agent.speed * dt).min(remaining);
            agent.rotation.y = dir.x.atan2(dir.z);
        }
        let arrived = planar(agent.waypoint - agent.position).length() < self.tuning.arrival_radius;
        if arrived && !attacked {
            agent.state = AgentState::Idle;
        }
    }

    fn integrate_vertical(&self, agent: &mut Agent, dt: f32, rng: &mut impl Rng) {
        let t = &self.tuning;
        if agent.grounded && rng.random::<f64>() < t.jump_chance {
            agent.vertical_velocity = t.jump_velocity;
            agent.grounded = false;
        }
        agent.vertical_velocity += t.gravity * dt;
        agent.position.y += agent.vertical_velocity * dt;
        if agent.position.y <= 0.0 {
            agent.position.y = 0.0;
            agent.vertical_velocity = 0.0;
            agent.grounded = true;
        } else {
            agent.grounded = false;
        }
    }

    /// Apply damage to an agent. At zero health the agent respawns around the
    /// player. Unknown ids are ignored.
    pub fn apply_damage(
        &mut self,
        id: AgentId,
        amount: f32,
        now: f64,
        ctx: &AgentContext<'_>,
        rng: &mut impl Rng,
    ) -> Option<AgentDamage> {
        let Some(idx) = self.agents.iter().position(|a| a.id == id) else {
            tracing::debug!(agent = id, "Damage for unknown agent ignored");
            return None;
        };
        let mut agent = self.agents[idx].clone();
        agent.health = (agent.health - amount).clamp(0.0, agent.max_health);
        let result = if agent.health > 0.0 {
            AgentDamage::Damaged {
                id,
                health: agent.health,
            }
        } else {
            self.respawn(&mut agent, now, ctx, rng);
            AgentDamage::Killed { id }
        };
        self.agents[idx] = agent;
        Some(result)
    }
}

/// With the configured per-tick probability, swap to a random agent weapon.
fn churn_weapon(agent: &mut Agent, settings: &GameSettings, rng: &mut impl Rng) {
    if rng.random::<f32>() < settings.npc_weapon_change_probability
        && let Some(&weapon) = WeaponKind::AGENT_ARSENAL.choose(rng)
    {
        agent.weapon = weapon;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn quiet_settings() -> GameSettings {
        GameSettings {
            npc_shoot_back: false,
            npc_weapon_change_probability: 0.0,
            ..GameSettings::default()
        }
    }

    fn controller_with(agent_at: Vec3, settings: &GameSettings) -> (AgentController, StdRng) {
        let mut rng = StdRng::seed_from_u64(11);
        let mut c = AgentController::new(AgentTuning::default());
        let bounds = MapBounds::default();
        let ctx = AgentContext {
            player_position: Vec3::ZERO,
            player_team: None,
            settings,
            bounds: &bounds,
        };
        c.spawn(1, false, 0.0, &ctx, &mut rng);
        c.agents[0].position = agent_at;
        c.agents[0].waypoint = agent_at;
        c.agents[0].next_decision_at = 0.0;
        (c, rng)
    }

    fn ctx<'a>(settings: &'a GameSettings, bounds: &'a MapBounds) -> AgentContext<'a> {
        AgentContext {
            player_position: Vec3::new(0.0, 1.6, 0.0),
            player_team: None,
            settings,
            bounds,
        }
    }

    // ================================================================
    // Movement decisions
    // ================================================================

    #[test]
    fn far_agent_moves_closer() {
        let settings = quiet_settings();
        let bounds = MapBounds::default();
        let start = Vec3::new(35.0, 0.0, 0.0);
        let (mut c, mut rng) = controller_with(start, &settings);
        c.update(0.0, 0.0, &ctx(&settings, &bounds), &mut rng);
        let a = &c.agents()[0];
        assert_eq!(a.state, AgentState::Moving);
        assert!(planar(a.waypoint).length() < planar(start).length());
        assert!((a.waypoint - Vec3::new(30.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn close_agent_evades() {
        let settings = quiet_settings();
        let bounds = MapBounds::default();
        let start = Vec3::new(0.0, 0.0, 2.0);
        let (mut c, mut rng) = controller_with(start, &settings);
        c.update(0.0, 0.0, &ctx(&settings, &bounds), &mut rng);
        let a = &c.agents()[0];
        assert_eq!(a.state, AgentState::Evading);
        assert!((a.waypoint - Vec3::new(0.0, 0.0, 7.0)).length() < 1e-4);
    }

    #[test]
    fn mid_range_agent_patrols_nearby() {
        let settings = quiet_settings();
        let bounds = MapBounds::default();
        let start = Vec3::new(10.0, 0.0, 0.0);
        let (mut c, mut rng) = controller_with(start, &settings);
        c.update(0.0, 0.0, &ctx(&settings, &bounds), &mut rng);
        let a = &c.agents()[0];
        assert_eq!(a.state, AgentState::Patrolling);
        assert!((a.waypoint.x - 10.0).abs() <= 3.0 && a.waypoint.z.abs() <= 3.0);
        assert!((500.0..=2000.0).contains(&a.next_decision_at));
    }

    #[test]
    fn waypoint_respects_bounds() {
        let settings = quiet_settings();
        let bounds = MapBounds {
            min_x: -5.0,
            max_x: 5.0,
            min_z: -5.0,
            max_z: 5.0,
        };
        let (mut c, mut rng) = controller_with(Vec3::new(0.0, 0.0, 3.0), &settings);
        c.update(0.0, 0.0, &ctx(&settings, &bounds), &mut rng);
        assert_eq!(c.agents()[0].waypoint.z, 5.0);
    }

    #[test]
    fn steering_turns_and_arrives() {
        let settings = quiet_settings();
        let bounds = MapBounds::default();
        let (mut c, mut rng) = controller_with(Vec3::new(10.0, 0.0, 0.0), &settings);
        c.agents[0].next_decision_at = f64::MAX;
        c.agents[0].waypoint = Vec3::new(10.0, 0.0, 1.0);
        c.agents[0].state = AgentState::Patrolling;
        c.update(0.1, 0.0, &ctx(&settings, &bounds), &mut rng);
        let a = &c.agents()[0];
        assert!((a.position.z - 0.3).abs() < 1e-4, "speed 3 for 0.1 s");
        assert!(a.rotation.y.abs() < 1e-6, "facing +z is yaw 0");
        assert_eq!(a.state, AgentState::Patrolling);

        c.update(0.1, 100.0, &ctx(&settings, &bounds), &mut rng);
        assert_eq!(c.agents()[0].state, AgentState::Idle, "within 0.5 of waypoint");
    }

    // ================================================================
    // Firing
    // ================================================================

    fn sharpshooter() -> GameSettings {
        GameSettings {
            npc_accuracy: 1.0,
            npc_reaction_time: 0.0,
            npc_weapon_change_probability: 0.0,
            ..GameSettings::default()
        }
    }

    #[test]
    fn reaction_time_delays_first_shot() {
        let settings = GameSettings {
            npc_reaction_time: 800.0,
            ..sharpshooter()
        };
        let bounds = MapBounds::default();
        let (mut c, mut rng) = controller_with(Vec3::new(10.0, 0.0, 0.0), &settings);
        assert!(c.update(0.0, 799.0, &ctx(&settings, &bounds), &mut rng).is_empty());
        assert_eq!(c.agents()[0].last_shot_at, 0.0);
    }

    #[test]
    fn shot_interval_rerolled_after_every_attempt() {
        let settings = sharpshooter();
        let bounds = MapBounds::default();
        let (mut c, mut rng) = controller_with(Vec3::new(10.0, 0.0, 0.0), &settings);
        c.update(0.0, 1.0, &ctx(&settings, &bounds), &mut rng);
        let a = &c.agents()[0];
        assert_eq!(a.last_shot_at, 1.0);
        assert!((800.0..=1200.0).contains(&a.shoot_interval), "{}", a.shoot_interval);
    }

    #[test]
    fn hits_fall_off_with_distance() {
        let settings = GameSettings {
            npc_accuracy: 1.0,
            npc_reaction_time: 0.0,
            npc_weapon_change_probability: 0.0,
            ..GameSettings::default()
        };
        let bounds = MapBounds::default();
        let (mut c, _) = controller_with(Vec3::new(0.0, 1.6, 0.0), &settings);
        c.agents[0].weapon = WeaponKind::Sniper;
        c.agents[0].next_decision_at = f64::MAX;
        // Point blank: probability exp(0) * 1.0 == 1, so every roll hits.
        let mut rng = StdRng::seed_from_u64(5);
        let shots = c.update(0.0, 1.0, &ctx(&settings, &bounds), &mut rng);
        assert_eq!(shots.len(), 1);
        assert!((shots[0].damage - 40.0).abs() < 1e-4);
        assert_eq!(c.agents()[0].state, AgentState::Attacking);
    }

    #[test]
    fn out_of_range_agents_hold_fire() {
        let settings = sharpshooter();
        let bounds = MapBounds::default();
        let (mut c, mut rng) = controller_with(Vec3::new(49.0, 0.0, 49.0), &settings);
        let shots = c.update(0.0, 5.0, &ctx(&settings, &bounds), &mut rng);
        assert!(shots.is_empty());
        assert_eq!(c.agents()[0].last_shot_at, 0.0, "no attempt outside range");
    }

    #[test]
    fn teammates_never_fire_on_player() {
        let settings = sharpshooter();
        let bounds = MapBounds::default();
        let (mut c, mut rng) = controller_with(Vec3::new(0.0, 1.6, 0.0), &settings);
        c.agents[0].team = Some(Team::Red);
        let mut context = ctx(&settings, &bounds);
        context.player_team = Some(Team::Red);
        assert!(c.update(0.0, 1.0, &context, &mut rng).is_empty());
        context.player_team = Some(Team::Blue);
        assert_eq!(c.update(0.0, 2.0, &context, &mut rng).len(), 1);
    }

    #[test]
    fn shoot_back_disabled_silences_agents() {
        let settings = GameSettings {
            npc_shoot_back: false,
            ..sharpshooter()
        };
        let bounds = MapBounds::default();
        let (mut c, mut rng) = controller_with(Vec3::new(0.0, 1.6, 0.0), &settings);
        assert!(c.update(0.0, 1.0, &ctx(&settings, &bounds), &mut rng).is_empty());
    }

    // ================================================================
    // Damage and respawn
    // ================================================================

    #[test]
    fn lethal_damage_respawns_on_ring() {
        let settings = quiet_settings();
        let bounds = MapBounds::default();
        let (mut c, mut rng) = controller_with(Vec3::new(3.0, 0.0, 3.0), &settings);
        c.agents[0].weapon = WeaponKind::Crossbow;
        let context = ctx(&settings, &bounds);
        assert_eq!(
            c.apply_damage(1, 30.0, 100.0, &context, &mut rng),
            Some(AgentDamage::Damaged { id: 1, health: 70.0 })
        );
        assert_eq!(
            c.apply_damage(1, 500.0, 100.0, &context, &mut rng),
            Some(AgentDamage::Killed { id: 1 })
        );
        let a = &c.agents()[0];
        let ring = planar(a.position).length();
        assert!((10.0 - 1e-3..=20.0 + 1e-3).contains(&ring), "{ring}");
        assert_eq!(a.health, a.max_health);
        assert_eq!(a.state, AgentState::Idle);
        assert_eq!(a.waypoint, a.position);
        assert_eq!(a.weapon, WeaponKind::Crossbow);
        assert_eq!(a.last_shot_at, 100.0);
        assert_eq!(c.apply_damage(99, 10.0, 100.0, &context, &mut rng), None);
    }

    #[test]
    fn team_mode_assigns_sides() {
        let settings = quiet_settings();
        let bounds = MapBounds::default();
        let mut c = AgentController::new(AgentTuning::default());
        let mut rng = StdRng::seed_from_u64(2);
        c.spawn(8, true, 0.0, &ctx(&settings, &bounds), &mut rng);
        assert_eq!(c.agents().len(), 8);
        assert!(c.agents().iter().all(|a| a.team.is_some()));
        let ids: Vec<_> = c.agents().iter().map(|a| a.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn agents_stay_in_bounds(
                seed in any::<u64>(),
                px in -60.0f32..60.0,
                pz in -60.0f32..60.0,
                ticks in 1usize..400,
                half in 5.0f32..60.0,
            ) {
                let settings = GameSettings {
                    npc_movement_speed: 12.0,
                    npc_weapon_change_probability: 0.1,
                    ..GameSettings::default()
                };
                let bounds = MapBounds { min_x: -half, max_x: half, min_z: -half, max_z: half };
                let context = AgentContext {
                    player_position: Vec3::new(px, 1.6, pz),
                    player_team: None,
                    settings: &settings,
                    bounds: &bounds,
                };
                let mut rng = StdRng::seed_from_u64(seed);
                let mut c = AgentController::new(AgentTuning::default());
                c.spawn(4, false, 0.0, &context, &mut rng);
                let mut now = 0.0;
                for _ in 0..ticks {
                    now += 1000.0 / 60.0;
                    c.update(1.0 / 60.0, now, &context, &mut rng);
                    for a in c.agents() {
                        prop_assert!(bounds.contains(a.position), "{:?} escaped", a.position);
                        prop_assert!(a.position.y >= 0.0);
                    }
                }
            }
        }
    }
}
