use serde::{Deserialize, Serialize};

/// Game modes selectable from the main menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    #[default]
    Timed,
    Endurance,
    Precision,
    Deathmatch,
    TeamDeathmatch,
}

impl GameMode {
    pub const ALL: [GameMode; 5] = [
        GameMode::Timed,
        GameMode::Endurance,
        GameMode::Precision,
        GameMode::Deathmatch,
        GameMode::TeamDeathmatch,
    ];

    /// Practice modes are populated with targets and no agents.
    pub fn is_practice(self) -> bool {
        matches!(self, Self::Timed | Self::Endurance | Self::Precision)
    }

    /// Deathmatch-family modes are populated with agents and no targets.
    pub fn is_deathmatch(self) -> bool {
        matches!(self, Self::Deathmatch | Self::TeamDeathmatch)
    }

    pub fn is_team_mode(self) -> bool {
        self == Self::TeamDeathmatch
    }

    /// Endurance is the only mode without a time budget.
    pub fn is_timed(self) -> bool {
        self != Self::Endurance
    }
}

/// Side in team deathmatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn from_coin(heads: bool) -> Self {
        if heads { Self::Red } else { Self::Blue }
    }
}
