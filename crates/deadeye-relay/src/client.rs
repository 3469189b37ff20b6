use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use deadeye_core::net::link::MpscLink;
use deadeye_core::net::messages::{JoinLobbyMsg, PeerId};
use deadeye_core::net::protocol::{
    PROTOCOL_VERSION, ProtocolError, decode_welcome, encode_join_lobby,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("relay closed the connection during the handshake")]
    HandshakeClosed,
}

/// Join `lobby` on the relay at `url` and bridge the socket into an
/// [`MpscLink`]. Returns the peer id the relay assigned.
///
/// The bridge runs on two spawned tasks that end when either the socket or
/// the link is dropped.
pub async fn connect_link(url: &str, lobby: &str) -> Result<(PeerId, MpscLink), ClientError> {
    let (mut stream, _) = tokio_tungstenite::connect_async(url).await?;

    let join = encode_join_lobby(&JoinLobbyMsg {
        lobby: lobby.to_string(),
        protocol_version: PROTOCOL_VERSION,
    })?;
    stream.send(Message::Binary(join.into())).await?;

    let peer_id = loop {
        match stream.next().await {
            Some(Ok(Message::Binary(data))) => break decode_welcome(&data)?.peer_id,
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::HandshakeClosed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    };
    tracing::info!(lobby, peer_id, "Joined relay lobby");

    let (mut ws_sender, mut ws_receiver) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_sender.send(Message::Binary(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            let data = match msg {
                Message::Binary(d) => d.to_vec(),
                Message::Close(_) => break,
                _ => continue,
            };
            if inbound_tx.send(data).is_err() {
                break;
            }
        }
        tracing::debug!(peer_id, "Relay socket closed");
    });

    Ok((peer_id, MpscLink::new(outbound_tx, inbound_rx)))
}
