use crate::inventory::InventoryStore;
use crate::math::{Pose, Vec3};
use crate::{CharacterId, WeaponId, GRIP_HEIGHT, GRIP_REACH};

/// A character carrying weapons.
///
/// Owns its inventory. `previous_weapon` is only bookkeeping for weapon swaps and
/// never implies ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub id: CharacterId,
    pub position: Vec3,
    pub yaw: f32,
    inventory: InventoryStore,
    previous_weapon: Option<WeaponId>,
    had_previous_weapon: bool,
}

impl Character {
    pub fn new(id: CharacterId, position: Vec3, yaw: f32) -> Self {
        Self {
            id,
            position,
            yaw,
            inventory: InventoryStore::new(),
            previous_weapon: None,
            had_previous_weapon: false,
        }
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    pub(crate) fn inventory_mut(&mut self) -> &mut InventoryStore {
        &mut self.inventory
    }

    pub fn current_weapon(&self) -> Option<WeaponId> {
        self.inventory.current()
    }

    pub fn previous_weapon(&self) -> Option<WeaponId> {
        self.previous_weapon
    }

    /// Whether the last equip replaced a weapon that was already in hand.
    pub fn had_previous_weapon(&self) -> bool {
        self.had_previous_weapon
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.yaw)
    }

    /// Where a held weapon sits when swung `swing` radians off the facing direction.
    pub fn grip_pose(&self, swing: f32) -> Pose {
        let body = self.pose();
        let hand = body.transform_point(&Vec3::new(0.0, GRIP_HEIGHT, GRIP_REACH));
        Pose::new(hand, self.yaw + swing)
    }

    /// Current-weapon bookkeeping of the equip transition. Weapon notification is
    /// left to the caller, which owns the weapons.
    pub(crate) fn set_current(&mut self, new: Option<WeaponId>, last: Option<WeaponId>) {
        let current = self.inventory.current();
        let local_last = last.or(if new != current { current } else { None });

        self.previous_weapon = local_last;
        self.had_previous_weapon = local_last.is_some();
        self.inventory.set_current(new);
    }
}
