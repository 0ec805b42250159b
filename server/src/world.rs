//! Last known pose per slot

use crate::slots::{SlotId, SlotTable};
use shared::Pose;

#[derive(Debug)]
pub struct WorldState {
    poses: Vec<Pose>,
}

impl WorldState {
    pub fn new(capacity: usize) -> Self {
        Self {
            poses: vec![Pose::default(); capacity],
        }
    }

    /// Pose stored for `slot`; out-of-range slots read as the origin
    pub fn get(&self, slot: SlotId) -> Pose {
        self.poses.get(slot).copied().unwrap_or_default()
    }

    /// Stores a pose. Returns false if `slot` is out of range.
    pub fn set(&mut self, slot: SlotId, pose: Pose) -> bool {
        match self.poses.get_mut(slot) {
            Some(stored) => {
                *stored = pose;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self, slot: SlotId) {
        self.set(slot, Pose::default());
    }

    /// Poses of every active slot except `exclude`, in slot order
    pub fn snapshot_active(&self, slots: &SlotTable, exclude: SlotId) -> Vec<(SlotId, Pose)> {
        let mut snapshot = Vec::new();
        slots.for_each_active(|slot| {
            if slot != exclude {
                snapshot.push((slot, self.get(slot)));
            }
        });
        snapshot
    }
}
