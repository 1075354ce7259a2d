//! Characters and weapons of one peer, plus every transition that touches both.
//!
//! The authority and the observers run the same `WorldState`. The authority applies
//! mutations through [`WorldState::request`] and publishes the result; observers
//! forward their requests and converge by feeding replicated fields to
//! [`WorldState::apply_replicated`], which calls the same equip and attack handlers.

use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::authority::{AuthorityGate, Decision, Mutation};
use crate::character::Character;
use crate::error::CoreError;
use crate::hit_detection::{HitEvent, HitNodeTracker, SweptQuerySource};
use crate::math::Vec3;
use crate::replication::{
    CharacterSnapshot, ReplicatedField, ReplicationBridge, Update, WeaponSnapshot,
};
use crate::weapon::Weapon;
use crate::{CharacterId, EntityId, WeaponId};

/// What happened to a requested mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Applied here; `changed` is false when it turned out to be a no-op.
    Applied { changed: bool },
    /// Sent to the authority, nothing changed locally.
    Forwarded,
    /// Filtered out before reaching the gate, e.g. equipping the weapon already in hand.
    Unchanged,
}

/// A confirmed hit together with who dealt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRecord {
    pub weapon: WeaponId,
    pub attacker: Option<CharacterId>,
    pub hit: HitEvent,
}

#[derive(Debug, Clone)]
pub struct WorldState {
    characters: BTreeMap<CharacterId, Character>,
    weapons: BTreeMap<WeaponId, Weapon>,
    next_weapon_id: u32,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            characters: BTreeMap::new(),
            weapons: BTreeMap::new(),
            next_weapon_id: 1,
        }
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn weapons(&self) -> impl Iterator<Item = &Weapon> {
        self.weapons.values()
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn weapon(&self, id: WeaponId) -> Option<&Weapon> {
        self.weapons.get(&id)
    }

    pub fn weapon_mut(&mut self, id: WeaponId) -> Option<&mut Weapon> {
        self.weapons.get_mut(&id)
    }

    pub fn current_weapon(&self, character: CharacterId) -> Option<&Weapon> {
        let id = self.characters.get(&character)?.current_weapon()?;
        self.weapons.get(&id)
    }

    pub fn spawn_character(&mut self, id: CharacterId, position: Vec3, yaw: f32) {
        info!("Spawned character {} at ({:.2}, {:.2}, {:.2})", id, position.x, position.y, position.z);
        self.characters.insert(id, Character::new(id, position, yaw));
    }

    pub fn despawn_character(&mut self, id: CharacterId) -> Option<Character> {
        let removed = self.characters.remove(&id);
        if removed.is_some() {
            info!("Despawned character {}", id);
        }
        removed
    }

    /// Creates a weapon with a fresh id.
    pub fn spawn_weapon(&mut self, tracker: HitNodeTracker) -> WeaponId {
        let id = WeaponId(self.next_weapon_id);
        self.next_weapon_id += 1;
        self.weapons.insert(id, Weapon::new(id, tracker));
        debug!("Spawned weapon {}", id);
        id
    }

    pub fn destroy_weapon(&mut self, id: WeaponId) -> Option<Weapon> {
        let removed = self.weapons.remove(&id);
        if removed.is_some() {
            debug!("Destroyed weapon {}", id);
        }
        removed
    }

    fn require_character(&self, id: CharacterId) -> Result<&Character, CoreError> {
        self.characters
            .get(&id)
            .ok_or(CoreError::UnknownCharacter(id))
    }

    fn require_character_mut(&mut self, id: CharacterId) -> Result<&mut Character, CoreError> {
        self.characters
            .get_mut(&id)
            .ok_or(CoreError::UnknownCharacter(id))
    }

    /// The equip transition, shared by authoritative equips and replicated updates.
    ///
    /// Records the previous weapon, switches the current slot, and tells the new
    /// weapon who holds it.
    pub fn set_current(
        &mut self,
        character: CharacterId,
        new: Option<WeaponId>,
        last: Option<WeaponId>,
    ) -> Result<(), CoreError> {
        self.require_character_mut(character)?.set_current(new, last);

        if let Some(id) = new {
            match self.weapons.get_mut(&id) {
                Some(weapon) => weapon.set_owner(Some(character)),
                None => debug!("Equipped weapon {} is not known locally yet", id),
            }
        }
        Ok(())
    }

    /// Makes `weapon` the current weapon of `character`.
    ///
    /// Returns `Ok(false)` when it already was.
    pub fn equip(&mut self, character: CharacterId, weapon: WeaponId) -> Result<bool, CoreError> {
        let holder = self.require_character(character)?;
        let current = holder.current_weapon();
        if current == Some(weapon) {
            return Ok(false);
        }
        if !holder.inventory().contains(weapon) {
            return Err(CoreError::NotInInventory {
                character,
                weapon: weapon.0,
            });
        }

        if let Some(previous) = current.and_then(|id| self.weapons.get_mut(&id)) {
            previous.stop_attacking();
        }
        self.set_current(character, Some(weapon), current)?;
        info!("Character {} equipped weapon {}", character, weapon);
        Ok(true)
    }

    /// Adds a weapon to a character's inventory, equipping it if nothing is in hand.
    pub fn add_weapon(&mut self, character: CharacterId, weapon: WeaponId) -> Result<bool, CoreError> {
        if !self.weapons.contains_key(&weapon) {
            return Err(CoreError::UnknownWeapon(weapon.0));
        }

        let holder = self.require_character_mut(character)?;
        if !holder.inventory_mut().add(weapon) {
            return Ok(false);
        }
        let needs_equip = holder.current_weapon().is_none();
        let first = holder.inventory().first();

        if let Some(w) = self.weapons.get_mut(&weapon) {
            w.on_enter_inventory(character);
        }
        if needs_equip {
            if let Some(first) = first {
                self.equip(character, first)?;
            }
        }
        Ok(true)
    }

    /// Removes a weapon from a character's inventory.
    ///
    /// A removed current weapon is replaced by the new first weapon in the same call,
    /// or cleared if the inventory is now empty. With `destroy` the weapon is also
    /// removed from the world.
    pub fn remove_weapon(
        &mut self,
        character: CharacterId,
        weapon: WeaponId,
        destroy: bool,
    ) -> Result<bool, CoreError> {
        let holder = self.require_character_mut(character)?;
        let removal = match holder.inventory_mut().remove(weapon) {
            Some(removal) => removal,
            None => return Ok(false),
        };

        if let Some(w) = self.weapons.get_mut(&weapon) {
            w.on_leave_inventory();
        }

        if removal.was_current {
            self.set_current(character, removal.promote, Some(weapon))?;
        }

        if destroy {
            self.destroy_weapon(weapon);
        }
        debug!("Character {} dropped weapon {} (destroy: {})", character, weapon, destroy);
        Ok(true)
    }

    /// Removes every weapon of a character, last to first, destroying them.
    pub fn destroy_inventory(&mut self, character: CharacterId) -> Result<Vec<WeaponId>, CoreError> {
        let weapons: Vec<WeaponId> = self
            .require_character(character)?
            .inventory()
            .weapons()
            .to_vec();

        for weapon in weapons.iter().rev() {
            self.remove_weapon(character, *weapon, true)?;
        }
        Ok(weapons)
    }

    pub fn start_attacking(&mut self, character: CharacterId) -> Result<bool, CoreError> {
        let current = self.require_character(character)?.current_weapon();
        match current.and_then(|id| self.weapons.get_mut(&id)) {
            Some(weapon) => {
                weapon.start_attacking();
                Ok(true)
            }
            None => {
                debug!("Character {} has no weapon to attack with", character);
                Ok(false)
            }
        }
    }

    pub fn stop_attacking(&mut self, character: CharacterId) -> Result<bool, CoreError> {
        let current = self.require_character(character)?.current_weapon();
        match current.and_then(|id| self.weapons.get_mut(&id)) {
            Some(weapon) => {
                let was_attacking = weapon.is_attacking();
                weapon.stop_attacking();
                Ok(was_attacking)
            }
            None => Ok(false),
        }
    }

    /// Applies an already authorized mutation.
    pub fn apply(&mut self, mutation: Mutation) -> Result<bool, CoreError> {
        match mutation {
            Mutation::Equip { character, weapon } => self.equip(character, weapon),
            Mutation::StartAttack { character } => self.start_attacking(character),
            Mutation::StopAttack { character } => self.stop_attacking(character),
            Mutation::AddWeapon { character, weapon } => self.add_weapon(character, weapon),
            Mutation::RemoveWeapon {
                character,
                weapon,
                destroy,
            } => self.remove_weapon(character, weapon, destroy),
        }
    }

    /// Applies a mutation and publishes every entity it may have touched.
    pub fn apply_and_publish(
        &mut self,
        mutation: Mutation,
        bridge: &mut dyn ReplicationBridge,
    ) -> Result<bool, CoreError> {
        let previous = self
            .character(mutation.character())
            .and_then(|c| c.current_weapon());

        let changed = self.apply(mutation)?;
        if changed {
            self.publish_character(mutation.character(), bridge);
            if let Some(weapon) = mutation.weapon() {
                self.publish_weapon(weapon, bridge);
            }
            if let Some(weapon) = previous {
                self.publish_weapon(weapon, bridge);
            }
        }
        Ok(changed)
    }

    /// Single entry point for gameplay code that wants something changed.
    pub fn request(
        &mut self,
        gate: &AuthorityGate,
        mutation: Mutation,
        bridge: &mut dyn ReplicationBridge,
    ) -> Result<RequestOutcome, CoreError> {
        if let Mutation::Equip { character, weapon } = mutation {
            let current = self.character(character).and_then(|c| c.current_weapon());
            if current == Some(weapon) {
                return Ok(RequestOutcome::Unchanged);
            }
        }

        match gate.authorize(&mutation) {
            Decision::ApplyLocally => {
                let changed = self.apply_and_publish(mutation, bridge)?;
                Ok(RequestOutcome::Applied { changed })
            }
            Decision::ForwardToAuthority => {
                debug!("Forwarding {:?} to the authority", mutation);
                bridge.request_mutation(EntityId::Character(mutation.character()), mutation)?;
                Ok(RequestOutcome::Forwarded)
            }
            Decision::Reject(e) => {
                warn!("Dropping {:?}: {}", mutation, e);
                Err(e)
            }
        }
    }

    /// Runs one tick of hit detection for every attacking weapon, in id order.
    pub fn resolve_attacks<Q: SweptQuerySource + ?Sized>(
        &mut self,
        query: &Q,
        bridge: &mut dyn ReplicationBridge,
    ) -> Vec<HitRecord> {
        let mut hits = Vec::new();
        for weapon in self.weapons.values_mut() {
            if let Some(hit) = weapon.resolve(query) {
                hits.push(HitRecord {
                    weapon: weapon.id,
                    attacker: weapon.owner(),
                    hit,
                });
            }
        }

        for record in &hits {
            self.publish_weapon(record.weapon, bridge);
        }
        hits
    }

    pub fn publish_character(&self, id: CharacterId, bridge: &mut dyn ReplicationBridge) {
        let entity = EntityId::Character(id);
        match self.characters.get(&id) {
            Some(character) => {
                for weapon in character.inventory().weapons() {
                    self.publish_weapon(*weapon, bridge);
                }
                bridge.publish(entity, Self::character_field(character));
                bridge.publish(entity, Self::inventory_field(character));
            }
            None => bridge.publish(entity, ReplicatedField::Removed),
        }
    }

    pub fn publish_weapon(&self, id: WeaponId, bridge: &mut dyn ReplicationBridge) {
        let field = match self.weapons.get(&id) {
            Some(weapon) => Self::weapon_field(weapon),
            None => ReplicatedField::Removed,
        };
        bridge.publish(EntityId::Weapon(id), field);
    }

    fn weapon_field(weapon: &Weapon) -> ReplicatedField {
        ReplicatedField::Weapon(WeaponSnapshot {
            owner: weapon.owner(),
            state: weapon.state,
            attacking: weapon.is_attacking(),
        })
    }

    fn character_field(character: &Character) -> ReplicatedField {
        ReplicatedField::Character(CharacterSnapshot {
            position: character.position,
            yaw: character.yaw,
        })
    }

    fn inventory_field(character: &Character) -> ReplicatedField {
        ReplicatedField::Inventory {
            weapons: character.inventory().weapons().to_vec(),
            current: character.current_weapon(),
        }
    }

    /// Every field of every entity, weapons first, for a peer that just joined.
    pub fn full_snapshot(&self) -> Vec<Update> {
        let mut updates = Vec::new();
        for weapon in self.weapons.values() {
            updates.push(Update {
                entity: EntityId::Weapon(weapon.id),
                field: Self::weapon_field(weapon),
            });
        }
        for character in self.characters.values() {
            let entity = EntityId::Character(character.id);
            updates.push(Update {
                entity,
                field: Self::character_field(character),
            });
            updates.push(Update {
                entity,
                field: Self::inventory_field(character),
            });
        }
        updates
    }

    /// Applies a field value decided by the authority. No authorization happens here.
    pub fn apply_replicated(&mut self, update: Update) -> Result<(), CoreError> {
        match (update.entity, update.field) {
            (EntityId::Character(id), ReplicatedField::Character(snapshot)) => {
                match self.characters.get_mut(&id) {
                    Some(character) => {
                        character.position = snapshot.position;
                        character.yaw = snapshot.yaw;
                    }
                    None => self.spawn_character(id, snapshot.position, snapshot.yaw),
                }
                Ok(())
            }
            (EntityId::Character(id), ReplicatedField::Inventory { weapons, current }) => {
                if !self.characters.contains_key(&id) {
                    self.spawn_character(id, Vec3::ZERO, 0.0);
                }
                let last = self.require_character(id)?.current_weapon();
                self.require_character_mut(id)?
                    .inventory_mut()
                    .replace_weapons(weapons);

                if current != last {
                    self.set_current(id, current, last)?;
                }
                self.require_character_mut(id)?.inventory_mut().heal()
            }
            (EntityId::Character(id), ReplicatedField::Removed) => {
                self.despawn_character(id);
                Ok(())
            }
            (EntityId::Weapon(id), ReplicatedField::Weapon(snapshot)) => {
                let weapon = self
                    .weapons
                    .entry(id)
                    .or_insert_with(|| Weapon::new(id, HitNodeTracker::default()));
                weapon.set_owner(snapshot.owner);
                weapon.apply_replicated_attacking(snapshot.attacking);
                weapon.state = snapshot.state;
                self.next_weapon_id = self.next_weapon_id.max(id.0.saturating_add(1));
                Ok(())
            }
            (EntityId::Weapon(id), ReplicatedField::Removed) => {
                self.destroy_weapon(id);
                Ok(())
            }
            (entity, field) => {
                warn!("Ignoring replicated {:?} for {:?}", field, entity);
                Ok(())
            }
        }
    }

    /// Checks every inventory invariant, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        for character in self.characters.values() {
            let inventory = character.inventory();
            inventory.check()?;
            if inventory.current().is_none() != inventory.is_empty() {
                return Err(CoreError::InvariantViolation(format!(
                    "character {} holds {} weapons but current is {:?}",
                    character.id,
                    inventory.len(),
                    inventory.current()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_detection::tests::PlaneTarget;
    use crate::math::Pose;
    use crate::replication::ReplicationQueue;

    fn world_with_character() -> WorldState {
        let mut world = WorldState::new();
        world.spawn_character(1, Vec3::ZERO, 0.0);
        world
    }

    fn sword(world: &mut WorldState) -> WeaponId {
        world.spawn_weapon(HitNodeTracker::along_blade(3, 0.2, 1.0))
    }

    #[test]
    fn test_first_weapon_is_auto_equipped() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        let w2 = sword(&mut world);

        assert!(world.add_weapon(1, w1).unwrap());
        assert_eq!(world.character(1).unwrap().current_weapon(), Some(w1));
        assert_eq!(world.weapon(w1).unwrap().owner(), Some(1));

        assert!(world.add_weapon(1, w2).unwrap());
        assert_eq!(world.character(1).unwrap().current_weapon(), Some(w1));
        assert_eq!(world.weapon(w2).unwrap().owner(), Some(1));
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        world.add_weapon(1, w1).unwrap();
        assert!(!world.add_weapon(1, w1).unwrap());
        assert_eq!(world.character(1).unwrap().inventory().len(), 1);
    }

    #[test]
    fn test_add_unknown_weapon_fails() {
        let mut world = world_with_character();
        assert_eq!(
            world.add_weapon(1, WeaponId(42)),
            Err(CoreError::UnknownWeapon(42))
        );
        let w1 = sword(&mut world);
        assert_eq!(world.add_weapon(9, w1), Err(CoreError::UnknownCharacter(9)));
    }

    #[test]
    fn test_remove_current_promotes_first() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        let w2 = sword(&mut world);
        let w3 = sword(&mut world);
        for w in [w1, w2, w3] {
            world.add_weapon(1, w).unwrap();
        }

        assert!(world.remove_weapon(1, w1, false).unwrap());
        let character = world.character(1).unwrap();
        assert_eq!(character.current_weapon(), Some(w2));
        assert_eq!(character.previous_weapon(), Some(w1));
        assert_eq!(world.weapon(w1).unwrap().owner(), None);
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_last_clears_current() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        world.add_weapon(1, w1).unwrap();

        assert!(world.remove_weapon(1, w1, true).unwrap());
        assert_eq!(world.character(1).unwrap().current_weapon(), None);
        assert!(world.weapon(w1).is_none());
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_equip_requires_inventory() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        assert_eq!(
            world.equip(1, w1),
            Err(CoreError::NotInInventory {
                character: 1,
                weapon: w1.0
            })
        );
    }

    #[test]
    fn test_equip_same_weapon_is_noop() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        let w2 = sword(&mut world);
        world.add_weapon(1, w1).unwrap();
        world.add_weapon(1, w2).unwrap();

        assert!(world.equip(1, w2).unwrap());
        let before = world.character(1).unwrap().clone();
        assert!(!world.equip(1, w2).unwrap());
        assert_eq!(world.character(1).unwrap(), &before);
    }

    #[test]
    fn test_switching_weapon_stops_attack() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        let w2 = sword(&mut world);
        world.add_weapon(1, w1).unwrap();
        world.add_weapon(1, w2).unwrap();
        world.start_attacking(1).unwrap();

        world.equip(1, w2).unwrap();
        assert!(!world.weapon(w1).unwrap().is_attacking());
    }

    #[test]
    fn test_destroy_inventory_empties_everything() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        let w2 = sword(&mut world);
        world.add_weapon(1, w1).unwrap();
        world.add_weapon(1, w2).unwrap();

        let removed = world.destroy_inventory(1).unwrap();
        assert_eq!(removed, vec![w1, w2]);
        assert!(world.character(1).unwrap().inventory().is_empty());
        assert_eq!(world.weapons().count(), 0);
    }

    #[test]
    fn test_attack_without_weapon_is_noop() {
        let mut world = world_with_character();
        assert!(!world.start_attacking(1).unwrap());
        assert!(!world.stop_attacking(1).unwrap());
    }

    #[test]
    fn test_request_as_authority_publishes() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        let gate = AuthorityGate::authority();
        let mut queue = ReplicationQueue::new();

        let outcome = world
            .request(&gate, Mutation::AddWeapon { character: 1, weapon: w1 }, &mut queue)
            .unwrap();
        assert_eq!(outcome, RequestOutcome::Applied { changed: true });

        let inventory = queue
            .updates()
            .iter()
            .find(|u| matches!(u.field, ReplicatedField::Inventory { .. }))
            .unwrap();
        assert_eq!(
            inventory.field,
            ReplicatedField::Inventory {
                weapons: vec![w1],
                current: Some(w1)
            }
        );
    }

    #[test]
    fn test_request_as_observer_forwards() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        let gate = AuthorityGate::connected_observer();
        let mut queue = ReplicationQueue::new();

        let outcome = world
            .request(&gate, Mutation::AddWeapon { character: 1, weapon: w1 }, &mut queue)
            .unwrap();
        assert_eq!(outcome, RequestOutcome::Forwarded);
        assert!(world.character(1).unwrap().inventory().is_empty());
        assert_eq!(queue.requests().len(), 1);
        assert!(queue.updates().is_empty());
    }

    #[test]
    fn test_request_equip_current_short_circuits() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        world.add_weapon(1, w1).unwrap();

        let gate = AuthorityGate::connected_observer();
        let mut queue = ReplicationQueue::new();
        let outcome = world
            .request(&gate, Mutation::Equip { character: 1, weapon: w1 }, &mut queue)
            .unwrap();
        assert_eq!(outcome, RequestOutcome::Unchanged);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_request_without_route_is_denied() {
        let mut world = world_with_character();
        let gate = AuthorityGate::new(crate::authority::Role::Observer);
        let mut queue = ReplicationQueue::new();

        let result = world.request(&gate, Mutation::StartAttack { character: 1 }, &mut queue);
        assert!(matches!(result, Err(CoreError::AuthorizationDenied { .. })));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_resolve_attacks_reports_and_publishes() {
        let mut world = world_with_character();
        let w1 = sword(&mut world);
        world.add_weapon(1, w1).unwrap();
        world.start_attacking(1).unwrap();

        world.weapon_mut(w1).unwrap().pose = Pose::new(Vec3::new(0.0, 0.0, 0.5), 0.0);
        let query = PlaneTarget::character(2, 1.05);
        let mut queue = ReplicationQueue::new();

        let hits = world.resolve_attacks(&query, &mut queue);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].attacker, Some(1));
        assert_eq!(hits[0].hit.target, 2);
        assert!(!world.weapon(w1).unwrap().is_attacking());
        assert_eq!(queue.updates().len(), 1);
    }

    #[test]
    fn test_observer_converges_from_snapshot() {
        let mut authority = world_with_character();
        let w1 = sword(&mut authority);
        let w2 = sword(&mut authority);
        authority.add_weapon(1, w1).unwrap();
        authority.add_weapon(1, w2).unwrap();
        authority.start_attacking(1).unwrap();

        let mut observer = WorldState::new();
        for update in authority.full_snapshot() {
            observer.apply_replicated(update).unwrap();
        }

        let character = observer.character(1).unwrap();
        assert_eq!(character.inventory().weapons(), &[w1, w2]);
        assert_eq!(character.current_weapon(), Some(w1));
        assert_eq!(observer.weapon(w1).unwrap().owner(), Some(1));
        assert!(observer.weapon(w1).unwrap().is_attacking());
        observer.check_invariants().unwrap();
    }

    #[test]
    fn test_replicated_removal_despawns() {
        let mut observer = WorldState::new();
        observer
            .apply_replicated(Update {
                entity: EntityId::Weapon(WeaponId(5)),
                field: ReplicatedField::Weapon(WeaponSnapshot {
                    owner: None,
                    state: crate::weapon::WeaponState::Idle,
                    attacking: false,
                }),
            })
            .unwrap();
        assert!(observer.weapon(WeaponId(5)).is_some());

        observer
            .apply_replicated(Update {
                entity: EntityId::Weapon(WeaponId(5)),
                field: ReplicatedField::Removed,
            })
            .unwrap();
        assert!(observer.weapon(WeaponId(5)).is_none());
        assert_eq!(observer.spawn_weapon(HitNodeTracker::default()), WeaponId(6));
    }

    #[test]
    fn test_replicated_max_weapon_id() {
        let mut observer = WorldState::new();
        observer
            .apply_replicated(Update {
                entity: EntityId::Weapon(WeaponId(u32::MAX)),
                field: ReplicatedField::Weapon(WeaponSnapshot {
                    owner: None,
                    state: crate::weapon::WeaponState::Idle,
                    attacking: false,
                }),
            })
            .unwrap();
        assert!(observer.weapon(WeaponId(u32::MAX)).is_some());
        observer.check_invariants().unwrap();
    }
}
