//! Shared core of the melee netcode: inventory, authority policy, swept hit
//! detection, replication types and the wire protocol.
//!
//! Distances are in meters, angles in radians, and `yaw` rotates about the +y axis.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod attack;
pub mod authority;
pub mod character;
pub mod error;
pub mod hit_detection;
pub mod inventory;
pub mod math;
pub mod replication;
pub mod weapon;
pub mod world;

pub use authority::{AuthorityGate, Decision, Mutation, MutationKind, Role};
pub use character::Character;
pub use error::{CoreError, QueryError};
pub use hit_detection::{HitEvent, HitNodeTracker, SweptQuerySource};
pub use inventory::InventoryStore;
pub use math::{Pose, Vec3};
pub use replication::{ReplicatedField, ReplicationBridge, ReplicationQueue, Update};
pub use weapon::{Weapon, WeaponState};
pub use world::{HitRecord, RequestOutcome, WorldState};

/// Bumped whenever `Packet` changes shape.
pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Character collision capsule.
pub const CAPSULE_RADIUS: f32 = 0.42;
pub const CAPSULE_HALF_HEIGHT: f32 = 0.96;

/// Hand position relative to the character origin, before yaw.
pub const GRIP_HEIGHT: f32 = 1.2;
pub const GRIP_REACH: f32 = 0.4;

/// Default blade span covered by hit nodes, measured from the grip.
pub const BLADE_START: f32 = 0.2;
pub const BLADE_END: f32 = 1.1;
pub const DEFAULT_HIT_NODES: usize = 4;

pub type CharacterId = u32;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WeaponId(pub u32);

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that carries replicated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Character(CharacterId),
    Weapon(WeaponId),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Request {
        sequence: u32,
        timestamp: u64,
        mutation: Mutation,
    },
    /// Keeps an idle observer from timing out.
    Heartbeat,
    Disconnect,

    Connected {
        client_id: u32,
    },
    Replicate {
        tick: u32,
        timestamp: u64,
        updates: Vec<Update>,
    },
    Hit {
        tick: u32,
        weapon: WeaponId,
        attacker: Option<CharacterId>,
        event: HitEvent,
    },
    Rejected {
        sequence: u32,
        reason: String,
    },
    Disconnected {
        reason: String,
    },
}

/// A mutation an observer asked the authority to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub sequence: u32,
    pub timestamp: u64,
    pub mutation: Mutation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::{CharacterSnapshot, WeaponSnapshot};

    #[test]
    fn test_weapon_id_display() {
        assert_eq!(WeaponId(12).to_string(), "#12");
        assert!(WeaponId(1) < WeaponId(2));
    }

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Connect { client_version } => assert_eq!(client_version, PROTOCOL_VERSION),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_request() {
        let packet = Packet::Request {
            sequence: 123,
            timestamp: 456789,
            mutation: Mutation::RemoveWeapon {
                character: 3,
                weapon: WeaponId(8),
                destroy: true,
            },
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Request {
                sequence,
                timestamp,
                mutation,
            } => {
                assert_eq!(sequence, 123);
                assert_eq!(timestamp, 456789);
                assert_eq!(
                    mutation,
                    Mutation::RemoveWeapon {
                        character: 3,
                        weapon: WeaponId(8),
                        destroy: true,
                    }
                );
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_replicate() {
        let updates = vec![
            Update {
                entity: EntityId::Weapon(WeaponId(1)),
                field: ReplicatedField::Weapon(WeaponSnapshot {
                    owner: Some(2),
                    state: WeaponState::Firing,
                    attacking: true,
                }),
            },
            Update {
                entity: EntityId::Character(2),
                field: ReplicatedField::Character(CharacterSnapshot {
                    position: Vec3::new(1.0, 0.0, -2.5),
                    yaw: 0.75,
                }),
            },
            Update {
                entity: EntityId::Character(2),
                field: ReplicatedField::Inventory {
                    weapons: vec![WeaponId(1)],
                    current: Some(WeaponId(1)),
                },
            },
        ];

        let packet = Packet::Replicate {
            tick: 42,
            timestamp: 123456789,
            updates: updates.clone(),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Replicate {
                tick,
                timestamp,
                updates: received,
            } => {
                assert_eq!(tick, 42);
                assert_eq!(timestamp, 123456789);
                assert_eq!(received, updates);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_hit() {
        let packet = Packet::Hit {
            tick: 7,
            weapon: WeaponId(4),
            attacker: Some(1),
            event: HitEvent {
                node_index: 2,
                target: 5,
                part: "head".to_string(),
            },
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Hit {
                weapon,
                attacker,
                event,
                ..
            } => {
                assert_eq!(weapon, WeaponId(4));
                assert_eq!(attacker, Some(1));
                assert_eq!(event.part, "head");
                assert_eq!(event.node_index, 2);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
