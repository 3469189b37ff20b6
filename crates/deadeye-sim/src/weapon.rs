use deadeye_core::weapon::WeaponKind;

/// How a weapon turns one trigger pull into projectiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delivery {
    /// Resolved instantly along a ray of length `speed`.
    Hitscan,
    Single,
    /// `count` rounds, each direction jittered by up to `spread / 2` on x and y.
    Pellets { count: u32, spread: f32 },
    /// Detonates on contact, on the ground, or when old enough.
    AreaEffect { blast_radius: f32 },
}

/// Ballistic constants for one weapon kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponProfile {
    /// Units per second, or ray length for hitscan.
    pub speed: f32,
    pub ttl_ms: f64,
    /// Shots per second.
    pub fire_rate: f64,
    pub delivery: Delivery,
    /// Keeps firing while the trigger is held.
    pub auto_fire: bool,
    /// Damage an agent deals at point-blank range with this weapon.
    pub agent_base_damage: f32,
}

impl WeaponProfile {
    /// Minimum milliseconds between two accepted shots.
    pub fn fire_interval_ms(&self) -> f64 {
        1000.0 / self.fire_rate
    }

    pub fn is_hitscan(&self) -> bool {
        self.delivery == Delivery::Hitscan
    }

    pub fn blast_radius(&self) -> Option<f32> {
        match self.delivery {
            Delivery::AreaEffect { blast_radius } => Some(blast_radius),
            _ => None,
        }
    }

    /// Projectiles spawned by one accepted shot.
    pub fn rounds_per_shot(&self) -> u32 {
        match self.delivery {
            Delivery::Pellets { count, .. } => count,
            _ => 1,
        }
    }
}

const fn single(speed: f32, ttl_ms: f64, fire_rate: f64, auto_fire: bool, base: f32) -> WeaponProfile {
    WeaponProfile {
        speed,
        ttl_ms,
        fire_rate,
        delivery: Delivery::Single,
        auto_fire,
        agent_base_damage: base,
    }
}

pub fn profile(kind: WeaponKind) -> WeaponProfile {
    match kind {
        WeaponKind::Pistol => single(50.0, 2000.0, 2.0, false, 10.0),
        WeaponKind::Rifle => single(60.0, 2000.0, 5.0, true, 20.0),
        WeaponKind::Shotgun => WeaponProfile {
            delivery: Delivery::Pellets {
                count: 8,
                spread: 0.1,
            },
            ..single(40.0, 2000.0, 1.0, false, 30.0)
        },
        WeaponKind::Sniper => single(80.0, 3000.0, 0.5, false, 40.0),
        WeaponKind::Smg => single(70.0, 2000.0, 10.0, true, 15.0),
        WeaponKind::RocketLauncher => WeaponProfile {
            delivery: Delivery::AreaEffect { blast_radius: 3.0 },
            ..single(30.0, 2500.0, 0.5, false, 50.0)
        },
        WeaponKind::LaserGun => WeaponProfile {
            delivery: Delivery::Hitscan,
            ..single(100.0, 100.0, 20.0, true, 35.0)
        },
        WeaponKind::Crossbow => single(45.0, 2000.0, 1.0, false, 25.0),
        WeaponKind::Flamethrower => single(25.0, 1000.0, 15.0, true, 30.0),
        WeaponKind::GrenadeLauncher => WeaponProfile {
            delivery: Delivery::AreaEffect { blast_radius: 2.0 },
            ..single(35.0, 2500.0, 1.0, false, 45.0)
        },
    }
}
