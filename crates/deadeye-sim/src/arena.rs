use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Planar play-area bounds. Agents and their waypoints are clamped to this
/// rectangle; the vertical axis is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            min_x: -50.0,
            max_x: 50.0,
            min_z: -50.0,
            max_z: 50.0,
        }
    }
}

impl MapBounds {
    /// Clamp x and z into the bounds, leaving y untouched.
    pub fn clamp(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y,
            p.z.clamp(self.min_z, self.max_z),
        )
    }

    pub fn contains(&self, p: Vec3) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_z..=self.max_z).contains(&p.z)
    }

    /// Inverted or non-finite bounds would make `clamp` panic.
    fn is_valid(&self) -> bool {
        [self.min_x, self.max_x, self.min_z, self.max_z]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_z <= self.max_z
    }
}

/// Load bounds from a JSON file, or `None` if missing, unparseable or inverted.
pub fn load_bounds_from_file(path: &str) -> Option<MapBounds> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<MapBounds>(&content) {
        Ok(bounds) if bounds.is_valid() => Some(bounds),
        Ok(_) => {
            tracing::warn!("Ignoring inverted map bounds in {path}");
            None
        },
        Err(e) => {
            tracing::warn!("Failed to parse {path}: {e}");
            None
        },
    }
}

/// Load the named map's bounds.
///
/// Checks env var `DEADEYE_MAPS_DIR` (default `config/maps`) for a file named
/// `{name}.json`, falling back to the default ±50 square.
pub fn load_bounds(name: &str) -> MapBounds {
    let dir = std::env::var("DEADEYE_MAPS_DIR").unwrap_or_else(|_| "config/maps".to_string());
    let path = format!("{dir}/{name}.json");
    load_bounds_from_file(&path).unwrap_or_default()
}
