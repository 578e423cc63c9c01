use std::num::NonZeroUsize;

use schedule::{Label, Tick};

use crate::worker::WorkerId;

/// The index of a slot in the [`SlotTable`]. It also names the slot's signal.
pub type SlotIndex = usize;

/// An entry of the [`SlotTable`].
///
/// The label, worker and ticks describe the latest occupant. They are kept
/// after the slot is freed but only mean something while `handle` is set.
#[derive(Debug)]
pub struct Slot<H> {
    pub handle: Option<H>,
    pub label: Option<Label>,
    pub signal_index: SlotIndex,
    pub worker: Option<WorkerId>,
    pub activation_tick: Option<Tick>,
    pub termination_tick: Option<Tick>,
}

impl<H> Slot<H> {
    fn new(signal_index: SlotIndex) -> Slot<H> {
        Slot {
            handle: None,
            label: None,
            signal_index,
            worker: None,
            activation_tick: None,
            termination_tick: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

/// The supervisor's registry of workers.
///
/// The table has a fixed number of slots. `H` is the execution handle of
/// the worker occupying a slot.
#[derive(Debug)]
pub struct SlotTable<H> {
    slots: Vec<Slot<H>>,
    active: usize,
}

impl<H> SlotTable<H> {
    pub fn new(capacity: NonZeroUsize) -> SlotTable<H> {
        SlotTable {
            slots: (0..capacity.get()).map(Slot::new).collect(),
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn get(&self, index: SlotIndex) -> Option<&Slot<H>> {
        self.slots.get(index)
    }

    /// Returns the lowest free slot.
    pub fn free_slot(&self) -> Option<SlotIndex> {
        self.slots.iter().position(|slot| !slot.is_active())
    }

    /// Returns the lowest active slot whose worker carries `label`.
    ///
    /// Labels left behind by terminated workers never match.
    pub fn find_by_label(&self, label: &Label) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|slot| slot.is_active() && slot.label.as_ref() == Some(label))
    }

    /// Returns the indices of the active slots, in increasing order.
    pub fn active_slots(&self) -> Vec<SlotIndex> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(index, _)| index)
            .collect()
    }

    /// Places a new worker in the free slot `index`.
    ///
    /// Returns false, leaving the table untouched, if the slot does not
    /// exist or is occupied.
    pub fn occupy(
        &mut self,
        index: SlotIndex,
        handle: H,
        label: Label,
        worker: WorkerId,
        tick: Tick,
    ) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if !slot.is_active() => {
                slot.handle = Some(handle);
                slot.label = Some(label);
                slot.worker = Some(worker);
                slot.activation_tick = Some(tick);
                slot.termination_tick = None;
                self.active += 1;
                true
            }
            _ => false,
        }
    }

    /// Frees the slot `index` at `tick` and returns its worker's handle.
    pub fn release(&mut self, index: SlotIndex, tick: Tick) -> Option<H> {
        let handle = self.vacate(index)?;
        if let Some(slot) = self.slots.get_mut(index) {
            slot.termination_tick = Some(tick);
        }
        Some(handle)
    }

    /// Frees the slot `index` without recording a termination tick.
    pub fn vacate(&mut self, index: SlotIndex) -> Option<H> {
        let handle = self.slots.get_mut(index)?.handle.take()?;
        self.active -= 1;
        Some(handle)
    }
}
