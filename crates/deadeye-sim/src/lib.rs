pub mod agent;
pub mod arena;
pub mod config;
pub mod events;
pub mod hotbar;
pub mod persistence;
pub mod projectile;
pub mod scoring;
pub mod session;
pub mod sync;
pub mod target;
pub mod trainer;
pub mod weapon;

pub use events::{EndReason, GameEvent, SessionCommand};
pub use session::{Phase, PostGameAction, Session};
pub use trainer::{HudSnapshot, Trainer};
