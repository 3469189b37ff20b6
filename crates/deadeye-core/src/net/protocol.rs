use serde::{Deserialize, Serialize};

use super::messages::{
    GameEndMsg, GameStartMsg, JoinLobbyMsg, MessageType, PeerId, SyncEnvelope, SyncMessage,
    TargetHitMsg, WelcomeMsg,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum frame size in bytes, type prefix included.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty message")]
    EmptyMessage,
    #[error("unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),
    #[error("payload too large: {0} bytes (max {MAX_MESSAGE_SIZE})")]
    PayloadTooLarge(usize),
    #[error("serialize error: {0}")]
    SerializeError(String),
    #[error("deserialize error: {0}")]
    DeserializeError(String),
}

/// Wire body of every peer-to-peer frame.
#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    sender: PeerId,
    body: T,
}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

pub fn encode_join_lobby(msg: &JoinLobbyMsg) -> Result<Vec<u8>, ProtocolError> {
    encode_message(MessageType::JoinLobby, msg)
}

pub fn decode_join_lobby(data: &[u8]) -> Result<JoinLobbyMsg, ProtocolError> {
    expect_type(data, MessageType::JoinLobby)?;
    decode_payload(data)
}

pub fn encode_welcome(msg: &WelcomeMsg) -> Result<Vec<u8>, ProtocolError> {
    encode_message(MessageType::Welcome, msg)
}

pub fn decode_welcome(data: &[u8]) -> Result<WelcomeMsg, ProtocolError> {
    expect_type(data, MessageType::Welcome)?;
    decode_payload(data)
}

/// Encode a [`SyncEnvelope`] to wire format.
pub fn encode_envelope(envelope: &SyncEnvelope) -> Result<Vec<u8>, ProtocolError> {
    let sender = envelope.sender;
    match &envelope.message {
        SyncMessage::GameStart(m) => {
            encode_message(MessageType::GameStart, &Stamped { sender, body: m })
        },
        SyncMessage::TargetHit(m) => {
            encode_message(MessageType::TargetHit, &Stamped { sender, body: m })
        },
        SyncMessage::GameEnd(m) => encode_message(MessageType::GameEnd, &Stamped { sender, body: m }),
    }
}

/// Decode raw wire data into a [`SyncEnvelope`].
pub fn decode_envelope(data: &[u8]) -> Result<SyncEnvelope, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    let (sender, message) = match msg_type {
        MessageType::GameStart => {
            let s: Stamped<GameStartMsg> = decode_payload(data)?;
            (s.sender, SyncMessage::GameStart(s.body))
        },
        MessageType::TargetHit => {
            let s: Stamped<TargetHitMsg> = decode_payload(data)?;
            (s.sender, SyncMessage::TargetHit(s.body))
        },
        MessageType::GameEnd => {
            let s: Stamped<GameEndMsg> = decode_payload(data)?;
            (s.sender, SyncMessage::GameEnd(s.body))
        },
        MessageType::JoinLobby | MessageType::Welcome => {
            return Err(ProtocolError::UnknownMessageType(msg_type as u8));
        },
    };
    Ok(SyncEnvelope { sender, message })
}

fn expect_type(data: &[u8], expected: MessageType) -> Result<(), ProtocolError> {
    let actual = decode_message_type(data)?;
    if actual == expected {
        Ok(())
    } else {
        Err(ProtocolError::UnknownMessageType(actual as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::GameMode;
    use crate::net::messages::EntityRef;
    use crate::settings::{Difficulty, GameSettings};

    fn envelope(message: SyncMessage) -> SyncEnvelope {
        SyncEnvelope { sender: 9, message }
    }

    #[test]
    fn game_start_survives_the_wire() {
        let settings = GameSettings {
            difficulty: Difficulty::Hard,
            npc_count: 2,
            ..GameSettings::default()
        };
        let env = envelope(SyncMessage::GameStart(GameStartMsg {
            mode: GameMode::Precision,
            settings,
        }));
        let bytes = encode_envelope(&env).unwrap();
        assert_eq!(bytes[0], MessageType::GameStart as u8);
        assert_eq!(decode_envelope(&bytes).unwrap(), env);
    }

    #[test]
    fn target_hit_keeps_entity_and_sender() {
        let id = uuid::Uuid::from_u128(0x1234);
        let env = envelope(SyncMessage::TargetHit(TargetHitMsg {
            entity: EntityRef::Target(id),
            hit_score: 87.5,
        }));
        let decoded = decode_envelope(&encode_envelope(&env).unwrap()).unwrap();
        assert_eq!(decoded.sender, 9);
        assert_eq!(decoded, env);
    }

    #[test]
    fn handshake_frames_are_not_envelopes() {
        let bytes = encode_welcome(&WelcomeMsg { peer_id: 3 }).unwrap();
        assert!(matches!(
            decode_envelope(&bytes),
            Err(ProtocolError::UnknownMessageType(0x02))
        ));
        assert_eq!(decode_welcome(&bytes).unwrap().peer_id, 3);
    }

    #[test]
    fn join_lobby_rejects_wrong_prefix() {
        let bytes = encode_welcome(&WelcomeMsg { peer_id: 3 }).unwrap();
        assert!(decode_join_lobby(&bytes).is_err());
    }

    #[test]
    fn empty_and_unknown_frames_error() {
        assert_eq!(decode_message_type(&[]), Err(ProtocolError::EmptyMessage));
        assert_eq!(
            decode_message_type(&[0xEE, 0x00]),
            Err(ProtocolError::UnknownMessageType(0xEE))
        );
    }

    #[test]
    fn truncated_payload_is_deserialize_error() {
        let env = envelope(SyncMessage::GameEnd(GameEndMsg {
            score: 4200,
            player_kills: 3,
        }));
        let bytes = encode_envelope(&env).unwrap();
        let truncated = &bytes[..bytes.len() - 2];
        assert!(matches!(
            decode_envelope(truncated),
            Err(ProtocolError::DeserializeError(_))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let huge = "x".repeat(MAX_MESSAGE_SIZE);
        let result = encode_message(MessageType::JoinLobby, &huge);
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge(_))));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
                let _ = decode_envelope(&data);
                let _ = decode_join_lobby(&data);
            }

            #[test]
            fn game_end_round_trips(sender in any::<u64>(), score in any::<u64>(), kills in any::<u32>()) {
                let env = SyncEnvelope {
                    sender,
                    message: SyncMessage::GameEnd(GameEndMsg { score, player_kills: kills }),
                };
                let decoded = decode_envelope(&encode_envelope(&env).unwrap()).unwrap();
                prop_assert_eq!(decoded, env);
            }
        }
    }
}
