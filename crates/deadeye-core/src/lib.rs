pub mod mode;
pub mod net;
pub mod player;
pub mod settings;
pub mod weapon;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::net::link::SyncLink;
    use crate::net::messages::{PeerId, SyncEnvelope, SyncMessage};
    use crate::net::protocol::{decode_envelope, encode_envelope};
    use crate::settings::{Difficulty, GameSettings};

    /// Default settings with the given difficulty applied to targets and agents.
    pub fn make_settings(difficulty: Difficulty) -> GameSettings {
        GameSettings {
            difficulty,
            npc_difficulty: difficulty,
            ..GameSettings::default()
        }
    }

    /// Settings with agents that never fire and never change weapons, so
    /// tests control every source of player damage.
    pub fn passive_agent_settings(npc_count: u32) -> GameSettings {
        GameSettings {
            npc_count,
            npc_shoot_back: false,
            npc_weapon_change_probability: 0.0,
            ..GameSettings::default()
        }
    }

    /// Encode and push a sync message onto a link as if `sender` produced it.
    pub fn send_as(link: &mut dyn SyncLink, sender: PeerId, message: SyncMessage) {
        let bytes = encode_envelope(&SyncEnvelope { sender, message })
            .expect("test envelope should encode");
        link.send(bytes).expect("test link should be connected");
    }

    /// Drain and decode every envelope currently waiting on a link.
    pub fn drain_envelopes(link: &mut dyn SyncLink) -> Vec<SyncEnvelope> {
        let mut out = Vec::new();
        while let Ok(Some(frame)) = link.try_recv() {
            out.push(decode_envelope(&frame).expect("frame should decode"));
        }
        out
    }
}
