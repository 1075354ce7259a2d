//! Swept hit detection for melee weapons.
//!
//! A weapon carries a fixed list of hit nodes placed along its blade. While an attack
//! is running, every node remembers where it was on the previous tick and the segment
//! from that position to the current one is swept through the world. Sweeping segments
//! instead of testing points keeps fast swings from passing through a target between
//! two ticks.
//!
//! Resolution is two-phase: a broad sweep against character collision volumes first,
//! then a fine sweep against the body parts of the character that was touched.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::math::{Pose, Vec3};
use crate::{CharacterId, WeaponId};

/// Anything the world query service can report as blocking a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorId {
    Character(CharacterId),
    Weapon(WeaponId),
    Prop(u32),
}

/// Object category a sweep is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionChannel {
    Pawn,
    WorldStatic,
}

/// Blocking result of a broad sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepHit {
    pub actor: ActorId,
    pub point: Vec3,
}

/// Actors a sweep must pass through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IgnoreSet {
    actors: Vec<ActorId>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, actor: ActorId) -> Self {
        self.insert(actor);
        self
    }

    pub fn insert(&mut self, actor: ActorId) {
        if !self.actors.contains(&actor) {
            self.actors.push(actor);
        }
    }

    pub fn contains(&self, actor: &ActorId) -> bool {
        self.actors.contains(actor)
    }
}

/// World/physics query service consumed by the hit tracker.
///
/// Implementations own all geometry. Any error is treated by the caller as a miss
/// for the node that issued the query, on that tick only.
pub trait SweptQuerySource {
    /// Sweeps the segment `from -> to` against objects in `channel`, skipping `ignore`.
    fn sweep(
        &self,
        from: Vec3,
        to: Vec3,
        channel: CollisionChannel,
        ignore: &IgnoreSet,
    ) -> Result<Option<SweepHit>, QueryError>;

    /// Sweeps the same segment against the body parts of one character and returns
    /// the name of the part that was hit.
    fn sweep_body(
        &self,
        target: CharacterId,
        from: Vec3,
        to: Vec3,
    ) -> Result<Option<String>, QueryError>;
}

/// A confirmed melee hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitEvent {
    pub node_index: usize,
    pub target: CharacterId,
    pub part: String,
}

/// One sample point on a weapon.
#[derive(Debug, Clone, PartialEq)]
pub struct HitDetectionNode {
    pub index: usize,
    /// Position relative to the weapon pose.
    pub offset: Vec3,
    /// World position at the previous tick of the running attack.
    pub last_position: Vec3,
}

impl HitDetectionNode {
    /// Name of the weapon socket this node is bound to.
    pub fn socket_name(&self) -> String {
        format!("HitNode{}", self.index)
    }
}

/// Tracks the hit nodes of one weapon across ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitNodeTracker {
    nodes: Vec<HitDetectionNode>,
}

impl HitNodeTracker {
    pub fn new(offsets: &[Vec3]) -> Self {
        let nodes = offsets
            .iter()
            .enumerate()
            .map(|(index, offset)| HitDetectionNode {
                index,
                offset: *offset,
                last_position: *offset,
            })
            .collect();
        Self { nodes }
    }

    /// Evenly spaced nodes along the local +z axis, from `start` to `end` distance.
    pub fn along_blade(count: usize, start: f32, end: f32) -> Self {
        let offsets: Vec<Vec3> = (0..count)
            .map(|i| {
                let t = if count > 1 {
                    i as f32 / (count - 1) as f32
                } else {
                    1.0
                };
                Vec3::new(0.0, 0.0, start + (end - start) * t)
            })
            .collect();
        Self::new(&offsets)
    }

    pub fn nodes(&self) -> &[HitDetectionNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records every node's current world position as its last position.
    pub fn snapshot(&mut self, pose: &Pose) {
        for node in &mut self.nodes {
            node.last_position = pose.transform_point(&node.offset);
        }
    }

    /// Sweeps every node that moved since the last tick, in index order.
    ///
    /// Returns on the first confirmed hit; later nodes are left untouched for this tick.
    pub fn sweep<Q: SweptQuerySource + ?Sized>(
        &mut self,
        pose: &Pose,
        query: &Q,
        ignore: &IgnoreSet,
    ) -> Option<HitEvent> {
        for node in &mut self.nodes {
            let current = pose.transform_point(&node.offset);
            if current == node.last_position {
                continue;
            }

            let from = node.last_position;
            node.last_position = current;

            let hit = match query.sweep(from, current, CollisionChannel::Pawn, ignore) {
                Ok(hit) => hit,
                Err(e) => {
                    warn!("Sweep for node {} failed: {}", node.index, e);
                    continue;
                }
            };

            let target = match hit {
                Some(SweepHit {
                    actor: ActorId::Character(target),
                    ..
                }) => target,
                Some(other) => {
                    debug!("Node {} blocked by {:?}", node.index, other.actor);
                    continue;
                }
                None => continue,
            };

            match query.sweep_body(target, from, current) {
                Ok(Some(part)) => {
                    return Some(HitEvent {
                        node_index: node.index,
                        target,
                        part,
                    });
                }
                Ok(None) => {
                    debug!("Node {} grazed character {} without a body hit", node.index, target);
                }
                Err(e) => {
                    warn!("Body sweep for node {} failed: {}", node.index, e);
                }
            }
        }

        None
    }
}
