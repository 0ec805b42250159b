//! The shared registry: slot table, world state and session outbound handles
//!
//! All three live behind one lock ([`SharedRegistry`]) so that allocation,
//! release, pose writes and the active set seen by a broadcast are always
//! consistent with each other. A slot's outbound handle and its active flag
//! are only ever changed together.

use crate::broadcast::{self, ConnId, Frame, Outbound};
use crate::slots::{SlotId, SlotTable};
use crate::world::WorldState;
use log::info;
use shared::Pose;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Result of admitting a connection into a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub slot: SlotId,
    pub conn_id: ConnId,
}

#[derive(Debug)]
pub struct Registry {
    slots: SlotTable,
    world: WorldState,
    peers: Vec<Option<Outbound>>,
    next_conn_id: ConnId,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: SlotTable::new(capacity),
            world: WorldState::new(capacity),
            peers: (0..capacity).map(|_| None).collect(),
            next_conn_id: 1,
        }
    }

    pub fn shared(capacity: usize) -> SharedRegistry {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Claims the first free slot for a connection
    ///
    /// The slot's pose starts at the origin. Returns `None` when every slot is
    /// taken; the caller is expected to drop the connection.
    pub fn admit(&mut self, addr: SocketAddr, tx: mpsc::Sender<Frame>) -> Option<Admission> {
        let slot = self.slots.allocate()?;
        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;

        self.world.reset(slot);
        self.peers[slot] = Some(Outbound::new(slot, conn_id, addr, tx));

        info!(
            "[CONNECTION] New client connected from {}. Assigned ID: {}. Active clients: {}",
            addr,
            slot,
            self.slots.active_count()
        );
        Some(Admission { slot, conn_id })
    }

    /// Frees `slot` if it is still owned by connection `conn_id`
    ///
    /// Returns false when the slot was already released or has since been
    /// handed to another connection, so racing closers release at most once.
    pub fn release(&mut self, slot: SlotId, conn_id: ConnId) -> bool {
        let owned = matches!(
            self.peers.get(slot),
            Some(Some(outbound)) if outbound.conn_id == conn_id
        );
        if !owned {
            return false;
        }

        self.peers[slot] = None;
        self.slots.release(slot)
    }

    pub fn pose(&self, slot: SlotId) -> Pose {
        self.world.get(slot)
    }

    pub fn set_pose(&mut self, slot: SlotId, pose: Pose) -> bool {
        self.world.set(slot, pose)
    }

    /// Poses of every other active slot, for replay to a newcomer
    pub fn snapshot_others(&self, slot: SlotId) -> Vec<(SlotId, Pose)> {
        self.world.snapshot_active(&self.slots, slot)
    }

    /// Queues `text` to a single session
    pub fn send_to(&self, slot: SlotId, text: &str) -> bool {
        match self.peers.get(slot) {
            Some(Some(outbound)) => outbound.send_text(text),
            _ => false,
        }
    }

    /// Queues `text` to every active session except `exclude`
    pub fn broadcast(&self, text: &str, exclude: Option<SlotId>) -> usize {
        let recipients = self
            .peers
            .iter()
            .flatten()
            .filter(|outbound| Some(outbound.slot) != exclude);
        broadcast::broadcast(recipients, text)
    }

    pub fn is_active(&self, slot: SlotId) -> bool {
        self.slots.is_active(slot)
    }

    pub fn active_count(&self) -> usize {
        self.slots.active_count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }
}
