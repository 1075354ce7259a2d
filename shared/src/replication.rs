//! Replication interface between the core and the network layer.
//!
//! The authority publishes field values for entities; observers send mutation
//! requests back. An inventory's weapon sequence and its current weapon travel as a
//! single field so no peer can observe one updated without the other.

use serde::{Deserialize, Serialize};

use crate::authority::Mutation;
use crate::error::CoreError;
use crate::math::Vec3;
use crate::weapon::WeaponState;
use crate::{CharacterId, EntityId, WeaponId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSnapshot {
    pub owner: Option<CharacterId>,
    pub state: WeaponState,
    pub attacking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub position: Vec3,
    pub yaw: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplicatedField {
    Inventory {
        weapons: Vec<WeaponId>,
        current: Option<WeaponId>,
    },
    Weapon(WeaponSnapshot),
    Character(CharacterSnapshot),
    Removed,
}

impl ReplicatedField {
    fn slot(&self) -> u8 {
        match self {
            ReplicatedField::Inventory { .. } => 0,
            ReplicatedField::Weapon(_) => 1,
            ReplicatedField::Character(_) => 2,
            ReplicatedField::Removed => 3,
        }
    }
}

/// One replicated field value for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub entity: EntityId,
    pub field: ReplicatedField,
}

/// Network layer as seen by the core.
pub trait ReplicationBridge {
    /// Authority to all peers.
    fn publish(&mut self, entity: EntityId, field: ReplicatedField);

    /// Observer to authority.
    fn request_mutation(&mut self, entity: EntityId, mutation: Mutation) -> Result<(), CoreError>;
}

/// Buffers replication traffic until the end of the tick.
///
/// Publishing the same field of the same entity twice within a tick keeps only the
/// latest value, in the position of the first publish. Publishing `Removed` drops
/// everything queued earlier for that entity.
#[derive(Debug, Default)]
pub struct ReplicationQueue {
    updates: Vec<Update>,
    requests: Vec<(EntityId, Mutation)>,
}

impl ReplicationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    pub fn requests(&self) -> &[(EntityId, Mutation)] {
        &self.requests
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.requests.is_empty()
    }

    /// Takes this tick's coalesced updates.
    pub fn take_updates(&mut self) -> Vec<Update> {
        std::mem::take(&mut self.updates)
    }

    pub fn take_requests(&mut self) -> Vec<(EntityId, Mutation)> {
        std::mem::take(&mut self.requests)
    }
}

impl ReplicationBridge for ReplicationQueue {
    fn publish(&mut self, entity: EntityId, field: ReplicatedField) {
        if field == ReplicatedField::Removed {
            self.updates.retain(|u| u.entity != entity);
        }

        let slot = field.slot();
        match self
            .updates
            .iter_mut()
            .find(|u| u.entity == entity && u.field.slot() == slot)
        {
            Some(existing) => existing.field = field,
            None => self.updates.push(Update { entity, field }),
        }
    }

    fn request_mutation(&mut self, entity: EntityId, mutation: Mutation) -> Result<(), CoreError> {
        self.requests.push((entity, mutation));
        Ok(())
    }
}
