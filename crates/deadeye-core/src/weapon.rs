use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every weapon the trainer knows about.
///
/// The ballistics for each kind live in `deadeye-sim::weapon`; this enum is
/// shared so that settings, sync messages and HUD projections can name a
/// weapon without depending on the simulation crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    #[default]
    Pistol,
    Rifle,
    Shotgun,
    Sniper,
    Smg,
    RocketLauncher,
    LaserGun,
    Crossbow,
    Flamethrower,
    GrenadeLauncher,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 10] = [
        WeaponKind::Pistol,
        WeaponKind::Rifle,
        WeaponKind::Shotgun,
        WeaponKind::Sniper,
        WeaponKind::Smg,
        WeaponKind::RocketLauncher,
        WeaponKind::LaserGun,
        WeaponKind::Crossbow,
        WeaponKind::Flamethrower,
        WeaponKind::GrenadeLauncher,
    ];

    /// Weapons handed out to agents. Launchers are player-only.
    pub const AGENT_ARSENAL: [WeaponKind; 8] = [
        WeaponKind::Pistol,
        WeaponKind::Rifle,
        WeaponKind::Shotgun,
        WeaponKind::Sniper,
        WeaponKind::Smg,
        WeaponKind::LaserGun,
        WeaponKind::Crossbow,
        WeaponKind::Flamethrower,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Pistol => "Pistol",
            Self::Rifle => "Rifle",
            Self::Shotgun => "Shotgun",
            Self::Sniper => "Sniper",
            Self::Smg => "SMG",
            Self::RocketLauncher => "RocketLauncher",
            Self::LaserGun => "LaserGun",
            Self::Crossbow => "Crossbow",
            Self::Flamethrower => "Flamethrower",
            Self::GrenadeLauncher => "GrenadeLauncher",
        }
    }

    /// Parse a weapon name, falling back to the default weapon for anything
    /// unrecognised so a bad fire request still produces a shot.
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::debug!(weapon = name, "Unknown weapon kind, using default");
            Self::default()
        })
    }
}

impl fmt::Display for WeaponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned by [`WeaponKind::from_str`] for names outside the arsenal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weapon kind: {0}")]
pub struct UnknownWeapon(pub String);

impl FromStr for WeaponKind {
    type Err = UnknownWeapon;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownWeapon(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for w in WeaponKind::ALL {
            assert_eq!(w.name().parse::<WeaponKind>().unwrap(), w);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("smg".parse::<WeaponKind>().unwrap(), WeaponKind::Smg);
        assert_eq!(
            "grenadelauncher".parse::<WeaponKind>().unwrap(),
            WeaponKind::GrenadeLauncher
        );
    }

    #[test]
    fn unknown_weapon_falls_back_to_pistol() {
        assert!("Railgun".parse::<WeaponKind>().is_err());
        assert_eq!(WeaponKind::parse_or_default("Railgun"), WeaponKind::Pistol);
        assert_eq!(WeaponKind::parse_or_default(""), WeaponKind::Pistol);
    }

    #[test]
    fn agent_arsenal_excludes_launchers() {
        assert!(!WeaponKind::AGENT_ARSENAL.contains(&WeaponKind::RocketLauncher));
        assert!(!WeaponKind::AGENT_ARSENAL.contains(&WeaponKind::GrenadeLauncher));
    }
}
