//! Per-connection session handling
//!
//! A session moves through `Connected → Initialized → Streaming → Closed`.
//! [`Session::open`] performs the first two steps inside one registry critical
//! section: it claims a slot, queues INIT to the newcomer, announces a SPAWN
//! to everyone else and replays a SPAWN for every existing peer. Because no
//! other broadcast can interleave, INIT is always the first frame a client
//! sees and each pair of sessions exchanges exactly one SPAWN.
//!
//! [`Session::run`] then reads frames until the peer goes away, an I/O or
//! framing fault occurs, or the server shuts down, and finally releases the
//! slot and announces the DESPAWN.

use crate::broadcast::{ConnId, Frame};
use crate::config::{IdentityPolicy, ServerConfig};
use crate::registry::{Registry, SharedRegistry};
use crate::slots::SlotId;
use log::{debug, error, info, warn};
use shared::{
    command_token, FrameDecoder, FrameError, Message, ParseError, PlayerId, Pose, CMD_UPDATE,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const READ_BUFFER_SIZE: usize = 4096;
/// How long a closing session waits for its writer to flush queued frames
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Initialized,
    Streaming,
    Closed,
}

/// Why a session ended
#[derive(Debug)]
pub enum CloseReason {
    PeerClosed,
    Io(io::Error),
    Protocol(FrameError),
    Shutdown,
}

/// What to do with one inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Store the pose for `slot`, then relay the original text
    Update { slot: SlotId, pose: Pose },
    /// Relay the text untouched
    Relay,
    /// Discard silently
    Dropped(DropReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    Malformed(ParseError),
    UnknownSlot(PlayerId),
    Spoofed(PlayerId),
}

/// Decides how a payload from `sender` is handled
///
/// Only `UPDATE` is interpreted. A malformed UPDATE, or one naming an identity
/// outside the slot table, is dropped rather than relayed.
pub fn classify(text: &str, sender: SlotId, capacity: usize, policy: IdentityPolicy) -> Inbound {
    if command_token(text) != CMD_UPDATE {
        return Inbound::Relay;
    }

    let (id, pose) = match Message::parse(text) {
        Ok(Message::Update { id, pose }) => (id, pose),
        Ok(_) => return Inbound::Relay,
        Err(e) => return Inbound::Dropped(DropReason::Malformed(e)),
    };

    let slot = match SlotId::try_from(id) {
        Ok(slot) if slot < capacity => slot,
        _ => return Inbound::Dropped(DropReason::UnknownSlot(id)),
    };

    if policy == IdentityPolicy::BindToSender && slot != sender {
        return Inbound::Dropped(DropReason::Spoofed(id));
    }

    Inbound::Update { slot, pose }
}

pub struct Session {
    slot: SlotId,
    conn_id: ConnId,
    addr: SocketAddr,
    state: SessionState,
    reader: OwnedReadHalf,
    writer: Option<JoinHandle<()>>,
    decoder: FrameDecoder,
    registry: SharedRegistry,
    config: Arc<ServerConfig>,
    shutdown: watch::Receiver<bool>,
}

impl Session {
    /// Admits a freshly accepted connection and sends its initial messages
    ///
    /// Returns `None` when the slot table is full; the stream is dropped,
    /// which closes it without sending anything.
    pub async fn open(
        stream: TcpStream,
        addr: SocketAddr,
        registry: SharedRegistry,
        config: Arc<ServerConfig>,
        shutdown: watch::Receiver<bool>,
    ) -> Option<Session> {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let (tx, rx) = mpsc::channel::<Frame>(config.outbound_queue.max(1));
        let decoder = match config.max_frame_len {
            Some(limit) => FrameDecoder::with_max_len(limit),
            None => FrameDecoder::new(),
        };

        let mut guard = registry.lock().await;
        let admission = guard.admit(addr, tx)?;

        let (reader, writer) = stream.into_split();
        let writer = tokio::spawn(write_loop(writer, rx, admission.slot, addr));

        let mut session = Session {
            slot: admission.slot,
            conn_id: admission.conn_id,
            addr,
            state: SessionState::Connected,
            reader,
            writer: Some(writer),
            decoder,
            registry: Arc::clone(&registry),
            config,
            shutdown,
        };
        session.initialize(&guard);
        drop(guard);

        Some(session)
    }

    /// Queues INIT to this session, SPAWN to every other session and a SPAWN
    /// per existing peer back to this session
    fn initialize(&mut self, registry: &Registry) {
        let slot = self.slot;
        let id = slot as PlayerId;
        let pose = registry.pose(slot);

        let init = Message::Init { id, pose }.to_string();
        registry.send_to(slot, &init);
        debug!("[CLIENT {}] Sent INIT message: {}", slot, init);

        let spawn = Message::Spawn { id, pose }.to_string();
        registry.broadcast(&spawn, Some(slot));
        debug!("[BROADCAST] Sent SPAWN message for client {}", slot);

        for (peer, pose) in registry.snapshot_others(slot) {
            let existing = Message::Spawn {
                id: peer as PlayerId,
                pose,
            }
            .to_string();
            registry.send_to(slot, &existing);
            debug!("[CLIENT {}] Sent existing player {} state", slot, peer);
        }

        self.state = SessionState::Initialized;
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Receive loop; returns once the session is closed
    pub async fn run(mut self) {
        self.state = SessionState::Streaming;
        info!("[CLIENT {}] Session started for {}", self.slot, self.addr);

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let reason = if *self.shutdown.borrow() {
            CloseReason::Shutdown
        } else {
            loop {
                tokio::select! {
                    result = self.reader.read(&mut buffer) => match result {
                        Ok(0) => break CloseReason::PeerClosed,
                        Ok(n) => {
                            if let Err(e) = self.ingest(&buffer[..n]).await {
                                break CloseReason::Protocol(e);
                            }
                        }
                        Err(e) => break CloseReason::Io(e),
                    },
                    _ = self.shutdown.changed() => break CloseReason::Shutdown,
                }
            }
        };

        self.close(reason).await;
    }

    /// Buffers a received chunk and handles every message it completes
    async fn ingest(&mut self, chunk: &[u8]) -> Result<(), FrameError> {
        self.decoder.extend(chunk);
        while let Some(text) = self.decoder.next_frame()? {
            debug!("[CLIENT {}] Received: {}", self.slot, text);
            self.handle_message(&text).await;
        }
        Ok(())
    }

    async fn handle_message(&self, text: &str) {
        let capacity = self.config.max_clients;
        match classify(text, self.slot, capacity, self.config.identity_policy) {
            Inbound::Update { slot, pose } => {
                let mut registry = self.registry.lock().await;
                registry.set_pose(slot, pose);
                let exclude = (!self.config.echo_updates).then_some(self.slot);
                registry.broadcast(text, exclude);
            }
            Inbound::Relay => {
                self.registry.lock().await.broadcast(text, None);
            }
            Inbound::Dropped(reason) => {
                debug!(
                    "[CLIENT {}] Dropped message {:?}: {:?}",
                    self.slot, text, reason
                );
            }
        }
    }

    /// Releases the slot, announces the DESPAWN and waits for the writer to drain
    ///
    /// The writer is aborted if it cannot flush within [`WRITER_DRAIN_TIMEOUT`].
    /// Safe to call more than once; only the first call has any effect.
    async fn close(&mut self, reason: CloseReason) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;

        match &reason {
            CloseReason::PeerClosed => debug!("[CLIENT {}] Peer closed the connection", self.slot),
            CloseReason::Io(e) => warn!("[CLIENT {}] Error: {}", self.slot, e),
            CloseReason::Protocol(e) => warn!("[CLIENT {}] Protocol error: {}", self.slot, e),
            CloseReason::Shutdown => debug!("[CLIENT {}] Closing for shutdown", self.slot),
        }

        {
            let mut registry = self.registry.lock().await;
            if registry.release(self.slot, self.conn_id) {
                info!(
                    "[DISCONNECTION] Client {} disconnected. Active clients: {}",
                    self.slot,
                    registry.active_count()
                );
                let despawn = Message::Despawn {
                    id: self.slot as PlayerId,
                }
                .to_string();
                registry.broadcast(&despawn, None);
            }
        }

        // A peer that stopped reading leaves the writer blocked on a full socket
        if let Some(mut writer) = self.writer.take() {
            match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Writer task for client {} failed: {}", self.slot, e),
                Err(_) => {
                    warn!(
                        "[CLIENT {}] Outbound queue not drained within {:?}, dropping it",
                        self.slot, WRITER_DRAIN_TIMEOUT
                    );
                    writer.abort();
                }
            }
        }
    }
}

/// Drains a session's outbound queue onto its socket
///
/// Ends when the registry drops the queue's sender or a write fails, then
/// shuts the write side down.
async fn write_loop<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Frame>,
    slot: SlotId,
    addr: SocketAddr,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            warn!("[ERROR] Failed to send to client {} ({}): {}", slot, addr, e);
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown of client {} write side failed: {}", slot, e);
    }
}
