//! Fixed-capacity slot table
//!
//! Every active session owns exactly one slot; the slot index doubles as the
//! player identity sent on the wire. Allocation always hands out the lowest
//! free index, so released slots are reused before higher ones.

/// Index into the slot table
pub type SlotId = usize;

#[derive(Debug)]
pub struct SlotTable {
    active: Vec<bool>,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            active: vec![false; capacity],
        }
    }

    /// Claims the first free slot, or `None` when every slot is taken
    pub fn allocate(&mut self) -> Option<SlotId> {
        let slot = self.active.iter().position(|active| !active)?;
        self.active[slot] = true;
        Some(slot)
    }

    /// Frees a slot. Returns false if it was already free.
    pub fn release(&mut self, slot: SlotId) -> bool {
        match self.active.get_mut(slot) {
            Some(active) if *active => {
                *active = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, slot: SlotId) -> bool {
        self.active.get(slot).copied().unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|active| **active).count()
    }

    /// Calls `f` for every active slot in increasing order
    pub fn for_each_active(&self, mut f: impl FnMut(SlotId)) {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, active)| **active)
            .for_each(|(slot, _)| f(slot));
    }

    pub fn capacity(&self) -> usize {
        self.active.len()
    }
}
