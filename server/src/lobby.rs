//! The two fixed player slots.
//!
//! A slot is either empty or holds the connection of an assigned player.
//! Slot 0 is player 1, slot 1 is player 2. The slots are plain owned
//! state; the server's tick loop is the only thing that touches them.

use shared::{Connection, PLAYER_COUNT};

/// Holder for both player connections.
#[derive(Debug, Default)]
pub struct PlayerSlots {
    slots: [Option<Connection>; PLAYER_COUNT],
}

impl PlayerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first empty slot, if any.
    pub fn first_empty(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn both_occupied(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn occupy(&mut self, slot: usize, conn: Connection) {
        self.slots[slot] = Some(conn);
    }

    /// Empties a slot, returning the connection that occupied it.
    pub fn clear(&mut self, slot: usize) -> Option<Connection> {
        self.slots[slot].take()
    }

    pub fn get(&self, slot: usize) -> Option<&Connection> {
        self.slots[slot].as_ref()
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Connection> {
        self.slots[slot].as_mut()
    }

    /// Occupied slots in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Connection)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|conn| (i, conn)))
    }

    /// Mutable view of the occupied slots in slot order.
    pub fn occupied_mut(&mut self) -> impl Iterator<Item = (usize, &mut Connection)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|conn| (i, conn)))
    }
}
