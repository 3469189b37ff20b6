use deadeye_core::net::messages::EntityRef;
use deadeye_core::weapon::WeaponKind;
use glam::Vec3;
use rand::Rng;

use crate::config::BallisticsTuning;
use crate::scoring::{explosion_damage, hit_score};
use crate::weapon::{Delivery, profile};

/// Anything a projectile can collide with, as seen at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hittable {
    pub entity: EntityRef,
    pub position: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCause {
    Direct,
    Hitscan,
    Explosion,
}

impl HitCause {
    pub fn label(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Hitscan => "hitscan",
            Self::Explosion => "explosion",
        }
    }
}

/// Damage to apply to one entity. For direct and hitscan hits `amount` is the
/// hit score; for explosions it is the blast damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub entity: EntityRef,
    pub amount: f32,
    pub cause: HitCause,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosionEffect {
    pub started_at: f64,
    pub duration_ms: f64,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: u64,
    pub position: Vec3,
    pub velocity: Vec3,
    pub weapon: WeaponKind,
    pub created_at: f64,
    pub exploded: bool,
    pub explosion: Option<ExplosionEffect>,
    /// Past positions for trail rendering, when trails are enabled.
    pub trail: Option<Vec<Vec3>>,
}

impl Projectile {
    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }
}

/// Presentation events produced while advancing projectiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BallisticsEvent {
    GroundImpact { position: Vec3 },
    Exploded { position: Vec3, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireRequest {
    pub weapon: WeaponKind,
    pub origin: Vec3,
    pub direction: Vec3,
    pub trails: bool,
}

/// What one accepted shot produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShotOutcome {
    pub spawned: Vec<u64>,
    /// Hitscan hits, resolved at spawn time.
    pub impacts: Vec<Impact>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickOutcome {
    pub impacts: Vec<Impact>,
    pub events: Vec<BallisticsEvent>,
}

/// Owns every live projectile and the shared fire-rate gate.
#[derive(Debug, Clone)]
pub struct Ballistics {
    projectiles: Vec<Projectile>,
    next_id: u64,
    last_shot_at: Option<f64>,
    tuning: BallisticsTuning,
}

impl Ballistics {
    pub fn new(tuning: BallisticsTuning) -> Self {
        Self {
            projectiles: Vec::new(),
            next_id: 1,
            last_shot_at: None,
            tuning,
        }
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn last_shot_at(&self) -> Option<f64> {
        self.last_shot_at
    }

    /// Drop every projectile and reset the fire gate.
    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.last_shot_at = None;
    }

    /// Whether `weapon` may fire at `now`. The first shot is always allowed.
    pub fn can_fire(&self, weapon: WeaponKind, now: f64) -> bool {
        match self.last_shot_at {
            Some(last) => now - last > profile(weapon).fire_interval_ms(),
            None => true,
        }
    }

    /// Spawn the projectiles for one trigger pull, or `None` if the fire-rate
    /// gate rejects it.
    pub fn try_fire(
        &mut self,
        request: FireRequest,
        now: f64,
        hittables: &[Hittable],
        rng: &mut impl Rng,
    ) -> Option<ShotOutcome> {
        if !self.can_fire(request.weapon, now) {
            return None;
        }
        self.last_shot_at = Some(now);

        let prof = profile(request.weapon);
        let direction = request.direction.normalize_or(Vec3::NEG_Z);
        let trails = request.trails && !prof.is_hitscan();
        let mut outcome = ShotOutcome::default();

        match prof.delivery {
            Delivery::Hitscan => {
                if let Some(impact) = self.resolve_ray(request.origin, direction, prof.speed, hittables)
                {
                    outcome.impacts.push(impact);
                }
                outcome
                    .spawned
                    .push(self.spawn(request.weapon, request.origin, Vec3::ZERO, now, false));
            },
            Delivery::Single | Delivery::AreaEffect { .. } => {
                let velocity = direction * prof.speed;
                outcome
                    .spawned
                    .push(self.spawn(request.weapon, request.origin, velocity, now, trails));
            },
            Delivery::Pellets { count, spread } => {
                let half = spread * 0.5;
                for _ in 0..count {
                    let jitter = Vec3::new(
                        rng.random_range(-half..=half),
                        rng.random_range(-half..=half),
                        0.0,
                    );
                    let pellet_dir = (direction + jitter).normalize_or(direction);
                    outcome.spawned.push(self.spawn(
                        request.weapon,
                        request.origin,
                        pellet_dir * prof.speed,
                        now,
                        trails,
                    ));
                }
            },
        }
        Some(outcome)
    }

    fn spawn(
        &mut self,
        weapon: WeaponKind,
        position: Vec3,
        velocity: Vec3,
        now: f64,
        trails: bool,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.projectiles.push(Projectile {
            id,
            position,
            velocity,
            weapon,
            created_at: now,
            exploded: false,
            explosion: None,
            trail: trails.then(|| vec![position]),
        });
        id
    }

    /// Nearest hittable whose collision sphere the ray passes through.
    fn resolve_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        length: f32,
        hittables: &[Hittable],
    ) -> Option<Impact> {
        let pr = self.tuning.projectile_radius;
        let mut nearest: Option<(f32, f32, &Hittable)> = None;
        for h in hittables {
            let t = (h.position - origin).dot(direction);
            if !(0.0..=length).contains(&t) {
                continue;
            }
            let miss = (origin + direction * t).distance(h.position);
            if miss <= pr + h.radius && nearest.is_none_or(|(best, _, _)| t < best) {
                nearest = Some((t, miss, h));
            }
        }
        nearest.map(|(_, miss, h)| Impact {
            entity: h.entity,
            amount: self.score(miss, h.radius),
            cause: HitCause::Hitscan,
        })
    }

    fn score(&self, distance: f32, entity_radius: f32) -> f32 {
        hit_score(
            distance,
            self.tuning.projectile_radius,
            entity_radius,
            self.tuning.min_hit_score,
            self.tuning.max_hit_score,
        )
    }

    /// Advance every projectile by `dt` seconds and resolve collisions
    /// against the given snapshot. Impacts are returned in resolution order.
    pub fn update(&mut self, dt: f32, now: f64, hittables: &[Hittable]) -> TickOutcome {
        let dt = dt.max(0.0);
        let tuning = self.tuning.clone();
        let mut outcome = TickOutcome::default();

        self.projectiles.retain_mut(|p| {
            let prof = profile(p.weapon);
            if p.age(now) > prof.ttl_ms {
                return false;
            }
            // Beams were resolved when fired and only linger for display.
            if prof.is_hitscan() {
                return true;
            }
            if let Some(fx) = p.explosion {
                return now - fx.started_at < fx.duration_ms;
            }

            p.position += p.velocity * dt;
            if let Some(trail) = p.trail.as_mut() {
                if trail.len() >= tuning.max_trail_points {
                    trail.remove(0);
                }
                trail.push(p.position);
            }

            if let Delivery::AreaEffect { blast_radius } = prof.delivery {
                let touching = first_contact(p.position, hittables, &tuning).is_some();
                if p.position.y <= 0.0 || touching || p.age(now) > tuning.explosion_trigger_ms {
                    detonate(p, blast_radius, now, hittables, &tuning, &mut outcome);
                }
                return true;
            }

            if p.position.y <= 0.0 {
                outcome.events.push(BallisticsEvent::GroundImpact {
                    position: Vec3::new(p.position.x, 0.0, p.position.z),
                });
                return false;
            }

            if let Some((h, distance)) = first_contact(p.position, hittables, &tuning) {
                outcome.impacts.push(Impact {
                    entity: h.entity,
                    amount: hit_score(
                        distance,
                        tuning.projectile_radius,
                        h.radius,
                        tuning.min_hit_score,
                        tuning.max_hit_score,
                    ),
                    cause: HitCause::Direct,
                });
                return false;
            }
            true
        });

        outcome
    }
}

/// First hittable, in slice order, whose collision sphere contains `position`.
fn first_contact<'a>(
    position: Vec3,
    hittables: &'a [Hittable],
    tuning: &BallisticsTuning,
) -> Option<(&'a Hittable, f32)> {
    hittables.iter().find_map(|h| {
        let d = position.distance(h.position);
        (d <= tuning.projectile_radius + h.radius).then_some((h, d))
    })
}

/// Freeze the projectile at the blast point and damage everything in range,
/// exactly once.
fn detonate(
    p: &mut Projectile,
    radius: f32,
    now: f64,
    hittables: &[Hittable],
    tuning: &BallisticsTuning,
    outcome: &mut TickOutcome,
) {
    p.position.y = p.position.y.max(0.0);
    p.velocity = Vec3::ZERO;
    p.exploded = true;
    p.explosion = Some(ExplosionEffect {
        started_at: now,
        duration_ms: tuning.explosion_duration_ms,
        radius,
    });
    outcome.events.push(BallisticsEvent::Exploded {
        position: p.position,
        radius,
    });
    for h in hittables {
        let damage = explosion_damage(p.position.distance(h.position), radius);
        if damage > 0.0 {
            outcome.impacts.push(Impact {
                entity: h.entity,
                amount: damage,
                cause: HitCause::Explosion,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;

    use super::*;

    fn engine() -> Ballistics {
        Ballistics::new(BallisticsTuning::default())
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn shot(weapon: WeaponKind, origin: Vec3, direction: Vec3) -> FireRequest {
        FireRequest {
            weapon,
            origin,
            direction,
            trails: false,
        }
    }

    fn target_at(n: u128, position: Vec3, radius: f32) -> Hittable {
        Hittable {
            entity: EntityRef::Target(Uuid::from_u128(n)),
            position,
            radius,
        }
    }

    fn agent_at(id: u64, position: Vec3) -> Hittable {
        Hittable {
            entity: EntityRef::Agent(id),
            position,
            radius: 1.0,
        }
    }

    // ================================================================
    // Fire gating
    // ================================================================

    #[test]
    fn second_shot_inside_interval_is_dropped() {
        let mut b = engine();
        let mut r = rng();
        let req = shot(WeaponKind::Pistol, Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z);
        assert!(b.try_fire(req, 0.0, &[], &mut r).is_some());
        assert!(b.try_fire(req, 499.0, &[], &mut r).is_none());
        assert!(b.try_fire(req, 500.0, &[], &mut r).is_none(), "gate is strict");
        assert!(b.try_fire(req, 501.0, &[], &mut r).is_some());
        assert_eq!(b.projectiles().len(), 2);
    }

    #[test]
    fn shotgun_spawns_eight_pellets_per_shot() {
        let mut b = engine();
        let mut r = rng();
        let req = shot(WeaponKind::Shotgun, Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z);
        let out = b.try_fire(req, 0.0, &[], &mut r).unwrap();
        assert_eq!(out.spawned.len(), 8);
        assert!(b.try_fire(req, 10.0, &[], &mut r).is_none());
        assert_eq!(b.projectiles().len(), 8);
        for p in b.projectiles() {
            let dir = p.velocity.normalize();
            assert!(dir.x.abs() <= 0.06 && dir.y.abs() <= 0.06, "{dir:?}");
            assert!((p.velocity.length() - 40.0).abs() < 1e-3);
        }
    }

    // ================================================================
    // Lifetime
    // ================================================================

    #[test]
    fn projectile_removed_after_ttl() {
        let mut b = engine();
        let mut r = rng();
        b.try_fire(shot(WeaponKind::Pistol, Vec3::new(0.0, 50.0, 0.0), Vec3::Y), 0.0, &[], &mut r);
        b.update(0.0, 2000.0, &[]);
        assert_eq!(b.projectiles().len(), 1, "age == ttl survives");
        b.update(0.0, 2000.5, &[]);
        assert!(b.projectiles().is_empty());
    }

    #[test]
    fn downward_shot_leaves_ground_decal() {
        let mut b = engine();
        let mut r = rng();
        b.try_fire(shot(WeaponKind::Rifle, Vec3::new(2.0, 1.0, 3.0), Vec3::NEG_Y), 0.0, &[], &mut r);
        let out = b.update(0.1, 100.0, &[]);
        assert!(b.projectiles().is_empty());
        assert_eq!(
            out.events,
            vec![BallisticsEvent::GroundImpact {
                position: Vec3::new(2.0, 0.0, 3.0)
            }]
        );
    }

    #[test]
    fn trails_follow_the_projectile() {
        let mut b = engine();
        let mut r = rng();
        let mut req = shot(WeaponKind::Sniper, Vec3::new(0.0, 10.0, 0.0), Vec3::X);
        req.trails = true;
        b.try_fire(req, 0.0, &[], &mut r);
        b.update(0.1, 100.0, &[]);
        b.update(0.1, 200.0, &[]);
        let trail = b.projectiles()[0].trail.as_ref().unwrap();
        assert_eq!(trail.len(), 3);
        assert!(trail[2].x > trail[1].x);
    }

    // ================================================================
    // Collisions
    // ================================================================

    #[test]
    fn dead_centre_hit_scores_full() {
        let mut b = engine();
        let mut r = rng();
        let target = target_at(1, Vec3::new(0.0, 1.6, -10.0), 0.5);
        b.try_fire(shot(WeaponKind::Pistol, Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z), 0.0, &[target], &mut r);
        let first = b.update(0.1, 100.0, &[target]);
        assert!(first.impacts.is_empty());
        let second = b.update(0.1, 200.0, &[target]);
        assert_eq!(
            second.impacts,
            vec![Impact {
                entity: target.entity,
                amount: 100.0,
                cause: HitCause::Direct
            }]
        );
        assert!(b.projectiles().is_empty());
    }

    #[test]
    fn targets_checked_before_agents() {
        let mut b = engine();
        let mut r = rng();
        let spot = Vec3::new(0.0, 1.6, -5.0);
        let hittables = [target_at(1, spot, 0.5), agent_at(3, spot)];
        b.try_fire(shot(WeaponKind::Pistol, Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z), 0.0, &hittables, &mut r);
        let out = b.update(0.1, 100.0, &hittables);
        assert_eq!(out.impacts.len(), 1, "one entity per projectile");
        assert_eq!(out.impacts[0].entity, hittables[0].entity);
    }

    #[test]
    fn hitscan_takes_nearest_along_ray() {
        let mut b = engine();
        let mut r = rng();
        let far = target_at(1, Vec3::new(0.0, 1.6, -40.0), 0.5);
        let near = agent_at(2, Vec3::new(0.0, 1.6, -20.0));
        let out = b
            .try_fire(shot(WeaponKind::LaserGun, Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z), 0.0, &[far, near], &mut r)
            .unwrap();
        assert_eq!(out.impacts.len(), 1);
        assert_eq!(out.impacts[0].entity, EntityRef::Agent(2));
        assert_eq!(out.impacts[0].cause, HitCause::Hitscan);
        assert_eq!(b.projectiles()[0].velocity, Vec3::ZERO);
        b.update(0.05, 50.0, &[far, near]);
        assert_eq!(b.projectiles().len(), 1, "beam lingers");
        b.update(0.1, 150.0, &[far, near]);
        assert!(b.projectiles().is_empty());
    }

    #[test]
    fn hitscan_out_of_range_misses() {
        let mut b = engine();
        let mut r = rng();
        let beyond = target_at(1, Vec3::new(0.0, 1.6, -120.0), 1.0);
        let out = b
            .try_fire(shot(WeaponKind::LaserGun, Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z), 0.0, &[beyond], &mut r)
            .unwrap();
        assert!(out.impacts.is_empty());
    }

    // ================================================================
    // Explosions
    // ================================================================

    #[test]
    fn grenade_on_ground_explodes_once() {
        let mut b = engine();
        let mut r = rng();
        let agents = [
            agent_at(1, Vec3::new(1.0, 0.0, 0.0)),
            agent_at(2, Vec3::new(1.5, 0.0, 0.0)),
            agent_at(3, Vec3::new(3.0, 0.0, 0.0)),
        ];
        b.try_fire(shot(WeaponKind::GrenadeLauncher, Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Y), 0.0, &agents, &mut r);
        let out = b.update(0.05, 50.0, &agents);
        let damage: Vec<_> = out.impacts.iter().map(|i| (i.entity, i.amount)).collect();
        assert_eq!(
            damage,
            vec![(EntityRef::Agent(1), 50.0), (EntityRef::Agent(2), 25.0)]
        );
        assert!(out.impacts.iter().all(|i| i.cause == HitCause::Explosion));
        let p = &b.projectiles()[0];
        assert!(p.exploded);
        assert_eq!(p.position, Vec3::ZERO);

        let later = b.update(0.05, 100.0, &agents);
        assert!(later.impacts.is_empty(), "blast resolves exactly once");
        assert_eq!(b.projectiles()[0].position, Vec3::ZERO, "frozen at blast point");
    }

    #[test]
    fn rocket_self_detonates_with_age() {
        let mut b = engine();
        let mut r = rng();
        b.try_fire(shot(WeaponKind::RocketLauncher, Vec3::new(0.0, 100.0, 0.0), Vec3::Y), 0.0, &[], &mut r);
        b.update(0.01, 1500.0, &[]);
        assert!(!b.projectiles()[0].exploded);
        let out = b.update(0.01, 1500.5, &[]);
        assert!(b.projectiles()[0].exploded);
        assert!(matches!(out.events[0], BallisticsEvent::Exploded { radius, .. } if radius == 3.0));
        // TTL still wins over the lingering effect.
        b.update(0.0, 2501.0, &[]);
        assert!(b.projectiles().is_empty());
    }

    #[test]
    fn explosion_effect_expires() {
        let mut b = engine();
        let mut r = rng();
        b.try_fire(shot(WeaponKind::GrenadeLauncher, Vec3::new(0.0, 0.1, 0.0), Vec3::NEG_Y), 0.0, &[], &mut r);
        b.update(0.1, 100.0, &[]);
        assert!(b.projectiles()[0].exploded);
        b.update(0.0, 2099.0, &[]);
        assert_eq!(b.projectiles().len(), 1);
        b.update(0.0, 2100.0, &[]);
        assert!(b.projectiles().is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn nothing_outlives_its_ttl(
                weapon_idx in 0usize..10,
                ticks in 1usize..80,
                dt in 0.01f32..0.1,
            ) {
                let weapon = WeaponKind::ALL[weapon_idx];
                let mut b = engine();
                let mut r = rng();
                b.try_fire(shot(weapon, Vec3::new(0.0, 500.0, 0.0), Vec3::Y), 0.0, &[], &mut r);
                let mut now = 0.0;
                for _ in 0..ticks {
                    now += f64::from(dt) * 1000.0;
                    b.update(dt, now, &[]);
                    for p in b.projectiles() {
                        prop_assert!(p.age(now) <= profile(p.weapon).ttl_ms);
                    }
                }
            }

            #[test]
            fn direct_hit_scores_in_band(z in -30.0f32..-2.0, x_off in -0.5f32..0.5) {
                let mut b = engine();
                let mut r = rng();
                let target = target_at(9, Vec3::new(x_off, 1.6, z), 0.5);
                b.try_fire(shot(WeaponKind::Rifle, Vec3::new(0.0, 1.6, 0.0), Vec3::NEG_Z), 0.0, &[target], &mut r);
                let mut now = 0.0;
                for _ in 0..120 {
                    now += 1000.0 / 60.0;
                    for impact in b.update(1.0 / 60.0, now, &[target]).impacts {
                        prop_assert!((10.0..=100.0).contains(&impact.amount));
                    }
                }
            }
        }
    }
}
