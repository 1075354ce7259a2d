//! Ordered, duplicate-free weapon inventory with a current-weapon slot.
//!
//! The store only holds weapon ids. Weapons themselves live in the world and are
//! borrowed by id when they need to be notified.
//!
//! Invariant after every completed add or remove: the current weapon is either empty
//! or an element of the sequence, and it is empty only when the sequence is empty.
//! Auto-equipping to restore that invariant is done by the caller, which also has to
//! notify the weapon; see `WorldState::add_weapon` and `WorldState::remove_weapon`.

use crate::error::CoreError;
use crate::WeaponId;

/// Result of removing a weapon from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub was_current: bool,
    /// Weapon that should become current, if the removed one was current.
    pub promote: Option<WeaponId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryStore {
    weapons: Vec<WeaponId>,
    current: Option<WeaponId>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<WeaponId> {
        self.current
    }

    pub fn weapons(&self) -> &[WeaponId] {
        &self.weapons
    }

    pub fn contains(&self, weapon: WeaponId) -> bool {
        self.weapons.contains(&weapon)
    }

    pub fn first(&self) -> Option<WeaponId> {
        self.weapons.first().copied()
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Appends `weapon` unless it is already present. Returns whether it was added.
    pub fn add(&mut self, weapon: WeaponId) -> bool {
        if self.contains(weapon) {
            return false;
        }
        self.weapons.push(weapon);
        true
    }

    /// Removes `weapon` if present.
    pub fn remove(&mut self, weapon: WeaponId) -> Option<Removal> {
        let index = self.weapons.iter().position(|w| *w == weapon)?;
        self.weapons.remove(index);

        let was_current = self.current == Some(weapon);
        let promote = if was_current { self.first() } else { None };
        Some(Removal {
            was_current,
            promote,
        })
    }

    /// Sets the current slot. Only the equip transition calls this.
    pub(crate) fn set_current(&mut self, weapon: Option<WeaponId>) {
        self.current = weapon;
    }

    /// Replaces the whole sequence with a value decided by the authority.
    pub(crate) fn replace_weapons(&mut self, weapons: Vec<WeaponId>) {
        let mut deduped = Vec::with_capacity(weapons.len());
        for weapon in weapons {
            if !deduped.contains(&weapon) {
                deduped.push(weapon);
            }
        }
        self.weapons = deduped;
    }

    /// Checks that the current weapon belongs to the sequence.
    pub fn check(&self) -> Result<(), CoreError> {
        match self.current {
            Some(current) if !self.contains(current) => Err(CoreError::InvariantViolation(
                format!("current weapon {} is not in the inventory", current),
            )),
            _ => Ok(()),
        }
    }

    /// Verifies the invariant, clearing the current weapon if it is broken.
    ///
    /// Panics in debug builds when the invariant is violated.
    pub fn heal(&mut self) -> Result<(), CoreError> {
        let result = self.check();
        if let Err(e) = &result {
            log::error!("{}; clearing current weapon", e);
            debug_assert!(false, "{}", e);
            self.current = None;
        }
        result
    }
}
