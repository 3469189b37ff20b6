use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

use super::protocol::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("sync channel disconnected")]
    Disconnected,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A best-effort, non-blocking frame channel to other peers.
///
/// Implementations never block the caller: `send` either queues the frame or
/// fails, and `try_recv` returns `Ok(None)` when nothing is waiting.
pub trait SyncLink: Send {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), SyncError>;
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, SyncError>;
}

/// [`SyncLink`] over a pair of tokio unbounded channels.
#[derive(Debug)]
pub struct MpscLink {
    tx: UnboundedSender<Vec<u8>>,
    rx: UnboundedReceiver<Vec<u8>>,
}

impl MpscLink {
    pub fn new(tx: UnboundedSender<Vec<u8>>, rx: UnboundedReceiver<Vec<u8>>) -> Self {
        Self { tx, rx }
    }

    /// Two links wired back to back: frames sent on one arrive on the other.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }
}

impl SyncLink for MpscLink {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), SyncError> {
        self.tx.send(frame).map_err(|_| SyncError::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>, SyncError> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SyncError::Disconnected),
        }
    }
}
