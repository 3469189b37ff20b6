pub mod client;
pub mod relay;
pub mod server;

pub use client::{ClientError, connect_link};
pub use relay::{RelayState, SharedRelayState};
pub use server::{RelayConfig, build_app};
