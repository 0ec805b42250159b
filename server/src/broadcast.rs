//! Fan-out of framed messages to session outbound queues
//!
//! Each session has a bounded queue drained by its own writer task. Broadcasting
//! only enqueues, so it is cheap enough to run while the registry lock is held:
//! that lock is what keeps every recipient's view of broadcasts in one order,
//! while the actual socket writes happen outside it.

use crate::slots::SlotId;
use log::{debug, error, warn};
use shared::encode_frame;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// An encoded frame shared between every recipient of a broadcast
pub type Frame = Arc<[u8]>;

/// Process-unique id of an accepted connection
pub type ConnId = u64;

/// Write-side handle to one session
///
/// Holds the only sender of the session's queue; dropping it lets the writer
/// task drain what is queued and close the socket.
#[derive(Debug)]
pub struct Outbound {
    pub slot: SlotId,
    pub conn_id: ConnId,
    pub addr: SocketAddr,
    tx: mpsc::Sender<Frame>,
}

impl Outbound {
    pub fn new(slot: SlotId, conn_id: ConnId, addr: SocketAddr, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            slot,
            conn_id,
            addr,
            tx,
        }
    }

    /// Queues an already encoded frame. Failures are logged and reported as false.
    pub fn deliver(&self, frame: &Frame) -> bool {
        match self.tx.try_send(Arc::clone(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Outbound queue full for client {} ({}), dropping frame",
                    self.slot, self.addr
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(
                    "Writer for client {} ({}) has stopped, dropping frame",
                    self.slot, self.addr
                );
                false
            }
        }
    }

    /// Frames `text` and queues it for this session only
    pub fn send_text(&self, text: &str) -> bool {
        match encode_frame(text) {
            Ok(frame) => self.deliver(&Frame::from(frame)),
            Err(e) => {
                error!("Cannot frame message for client {}: {}", self.slot, e);
                false
            }
        }
    }
}

/// Encodes `text` once and queues it on every recipient
///
/// Returns how many recipients accepted the frame. A failing recipient never
/// stops delivery to the others.
pub fn broadcast<'a, I>(recipients: I, text: &str) -> usize
where
    I: IntoIterator<Item = &'a Outbound>,
{
    let frame = match encode_frame(text) {
        Ok(frame) => Frame::from(frame),
        Err(e) => {
            error!("Cannot frame broadcast: {}", e);
            return 0;
        }
    };

    let delivered = recipients
        .into_iter()
        .filter(|outbound| outbound.deliver(&frame))
        .count();

    debug!("Broadcast to {} clients: {}", delivered, text);
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::FrameDecoder;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn outbound(slot: SlotId, capacity: usize) -> (Outbound, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Outbound::new(slot, slot as ConnId, test_addr(), tx), rx)
    }

    fn decode(frame: &Frame) -> String {
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(frame).unwrap();
        assert_eq!(frames.len(), 1);
        frames.remove(0)
    }

    #[test]
    fn test_send_text_frames_payload() {
        let (out, mut rx) = outbound(0, 4);
        assert!(out.send_text("INIT/0/0/0/0/0"));

        let frame = rx.try_recv().unwrap();
        assert_eq!(decode(&frame), "INIT/0/0/0/0/0");
    }

    #[test]
    fn test_broadcast_shares_one_encoding() {
        let (a, mut rx_a) = outbound(0, 4);
        let (b, mut rx_b) = outbound(1, 4);

        assert_eq!(broadcast([&a, &b], "DESPAWN/2"), 2);

        let frame_a = rx_a.try_recv().unwrap();
        let frame_b = rx_b.try_recv().unwrap();
        assert!(Arc::ptr_eq(&frame_a, &frame_b));
        assert_eq!(decode(&frame_a), "DESPAWN/2");
    }

    #[test]
    fn test_broadcast_skips_closed_recipient() {
        let (a, rx_a) = outbound(0, 4);
        let (b, mut rx_b) = outbound(1, 4);
        drop(rx_a);

        assert_eq!(broadcast([&a, &b], "hello"), 1);
        assert_eq!(decode(&rx_b.try_recv().unwrap()), "hello");
    }

    #[test]
    fn test_broadcast_skips_full_recipient() {
        let (a, mut rx_a) = outbound(0, 1);
        let (b, mut rx_b) = outbound(1, 4);

        assert!(a.send_text("first"));
        assert_eq!(broadcast([&a, &b], "second"), 1);

        assert_eq!(decode(&rx_a.try_recv().unwrap()), "first");
        assert!(rx_a.try_recv().is_err());
        assert_eq!(decode(&rx_b.try_recv().unwrap()), "second");
    }

    #[test]
    fn test_broadcast_to_nobody() {
        let none: Vec<&Outbound> = Vec::new();
        assert_eq!(broadcast(none, "hello"), 0);
    }
}
