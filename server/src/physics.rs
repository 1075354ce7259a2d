//! Collision geometry the authority sweeps weapons against.
//!
//! Characters are upright capsules for the broad phase and a handful of bone spheres
//! for the fine phase. Everything is rebuilt from the world at the start of a tick, so
//! the query service never aliases the state the hit tracker is mutating.

use shared::error::QueryError;
use shared::hit_detection::{ActorId, CollisionChannel, IgnoreSet, SweepHit, SweptQuerySource};
use shared::math::{segment_point_distance_sq, segment_segment_closest, Pose, Vec3};
use shared::{Character, CharacterId, CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS};

/// A sphere attached to a character's skeleton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub name: &'static str,
    /// Offset from the character origin (feet), before yaw.
    pub offset: Vec3,
    pub radius: f32,
}

/// Coarse humanoid skeleton, head first.
pub const SKELETON: [Bone; 8] = [
    Bone { name: "head", offset: Vec3::new(0.0, 1.72, 0.0), radius: 0.14 },
    Bone { name: "spine_03", offset: Vec3::new(0.0, 1.38, 0.0), radius: 0.24 },
    Bone { name: "spine_01", offset: Vec3::new(0.0, 1.08, 0.0), radius: 0.22 },
    Bone { name: "pelvis", offset: Vec3::new(0.0, 0.88, 0.0), radius: 0.2 },
    Bone { name: "thigh_l", offset: Vec3::new(-0.12, 0.6, 0.0), radius: 0.12 },
    Bone { name: "thigh_r", offset: Vec3::new(0.12, 0.6, 0.0), radius: 0.12 },
    Bone { name: "calf_l", offset: Vec3::new(-0.12, 0.25, 0.0), radius: 0.1 },
    Bone { name: "calf_r", offset: Vec3::new(0.12, 0.25, 0.0), radius: 0.1 },
];

/// Collision representation of one character.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: CharacterId,
    pub pose: Pose,
}

impl Body {
    /// Bottom and top of the capsule's inner segment.
    pub fn capsule_axis(&self) -> (Vec3, Vec3) {
        let origin = self.pose.origin;
        let bottom = Vec3::new(origin.x, origin.y + CAPSULE_RADIUS, origin.z);
        let top = Vec3::new(
            origin.x,
            origin.y + 2.0 * CAPSULE_HALF_HEIGHT - CAPSULE_RADIUS,
            origin.z,
        );
        (bottom, top)
    }

    /// Where along `from -> to` the segment comes closest to the capsule axis, if it
    /// enters the capsule at all.
    fn capsule_contact(&self, from: &Vec3, to: &Vec3) -> Option<f32> {
        let (bottom, top) = self.capsule_axis();
        let (d_sq, t) = segment_segment_closest(from, to, &bottom, &top);
        (d_sq <= CAPSULE_RADIUS * CAPSULE_RADIUS).then_some(t)
    }
}

/// Snapshot of every character body, answering sweeps for one tick.
#[derive(Debug, Clone, Default)]
pub struct WorldQuery {
    bodies: Vec<Body>,
}

impl WorldQuery {
    pub fn new(bodies: Vec<Body>) -> Self {
        Self { bodies }
    }

    pub fn from_characters<'a>(characters: impl Iterator<Item = &'a Character>) -> Self {
        Self::new(
            characters
                .map(|c| Body {
                    id: c.id,
                    pose: c.pose(),
                })
                .collect(),
        )
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn body(&self, id: CharacterId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }
}

impl SweptQuerySource for WorldQuery {
    fn sweep(
        &self,
        from: Vec3,
        to: Vec3,
        channel: CollisionChannel,
        ignore: &IgnoreSet,
    ) -> Result<Option<SweepHit>, QueryError> {
        if channel != CollisionChannel::Pawn {
            return Ok(None);
        }

        // Order by where along the segment each capsule axis is closest.
        let mut closest: Option<(f32, SweepHit)> = None;
        for body in &self.bodies {
            let actor = ActorId::Character(body.id);
            if ignore.contains(&actor) {
                continue;
            }
            let Some(t) = body.capsule_contact(&from, &to) else {
                continue;
            };

            if closest.as_ref().map_or(true, |(best, _)| t < *best) {
                closest = Some((
                    t,
                    SweepHit {
                        actor,
                        point: from.lerp(&to, t),
                    },
                ));
            }
        }

        Ok(closest.map(|(_, hit)| hit))
    }

    fn sweep_body(
        &self,
        target: CharacterId,
        from: Vec3,
        to: Vec3,
    ) -> Result<Option<String>, QueryError> {
        let body = self.body(target).ok_or(QueryError::NoBody(target))?;

        let mut closest: Option<(f32, &'static str)> = None;
        for bone in &SKELETON {
            let center = body.pose.transform_point(&bone.offset);
            let (d_sq, t) = segment_point_distance_sq(&from, &to, &center);
            if d_sq > bone.radius * bone.radius {
                continue;
            }
            if closest.map_or(true, |(best, _)| t < best) {
                closest = Some((t, bone.name));
            }
        }

        Ok(closest.map(|(_, name)| name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn body_at(id: CharacterId, x: f32, z: f32) -> Body {
        Body {
            id,
            pose: Pose::new(Vec3::new(x, 0.0, z), 0.0),
        }
    }

    #[test]
    fn test_capsule_axis() {
        let (bottom, top) = body_at(1, 2.0, 3.0).capsule_axis();
        assert_eq!(bottom, Vec3::new(2.0, CAPSULE_RADIUS, 3.0));
        assert_eq!(
            top,
            Vec3::new(2.0, 2.0 * CAPSULE_HALF_HEIGHT - CAPSULE_RADIUS, 3.0)
        );
    }

    #[test]
    fn test_sweep_through_capsule_hits() {
        let query = WorldQuery::new(vec![body_at(1, 0.0, 2.0)]);
        let hit = query
            .sweep(
                Vec3::new(-1.0, 1.2, 2.0),
                Vec3::new(1.0, 1.2, 2.0),
                CollisionChannel::Pawn,
                &IgnoreSet::new(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(hit.actor, ActorId::Character(1));
    }

    #[test]
    fn test_sweep_beside_capsule_misses() {
        let query = WorldQuery::new(vec![body_at(1, 0.0, 2.0)]);
        let hit = query
            .sweep(
                Vec3::new(-1.0, 1.2, 0.5),
                Vec3::new(1.0, 1.2, 0.5),
                CollisionChannel::Pawn,
                &IgnoreSet::new(),
            )
            .unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn test_sweep_skips_ignored_and_other_channels() {
        let query = WorldQuery::new(vec![body_at(1, 0.0, 0.0)]);
        let from = Vec3::new(-1.0, 1.0, 0.0);
        let to = Vec3::new(1.0, 1.0, 0.0);

        let ignore = IgnoreSet::new().with(ActorId::Character(1));
        assert_eq!(
            query.sweep(from, to, CollisionChannel::Pawn, &ignore).unwrap(),
            None
        );
        assert_eq!(
            query
                .sweep(from, to, CollisionChannel::WorldStatic, &IgnoreSet::new())
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_sweep_reports_nearest_body() {
        let query = WorldQuery::new(vec![body_at(1, 3.0, 0.0), body_at(2, 1.0, 0.0)]);
        let hit = query
            .sweep(
                Vec3::new(-1.0, 1.0, 0.0),
                Vec3::new(5.0, 1.0, 0.0),
                CollisionChannel::Pawn,
                &IgnoreSet::new(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(hit.actor, ActorId::Character(2));
    }

    #[test]
    fn test_sloped_sweep_hit_point_lies_on_capsule() {
        let query = WorldQuery::new(vec![body_at(1, 0.0, 0.0)]);
        let hit = query
            .sweep(
                Vec3::new(-1.0, 2.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                CollisionChannel::Pawn,
                &IgnoreSet::new(),
            )
            .unwrap()
            .unwrap();
        // The feet project further along (x = 0.5), outside the capsule.
        assert_approx_eq!(hit.point.x, 0.0, 1e-4);
        assert_approx_eq!(hit.point.y, 1.0, 1e-4);
    }

    #[test]
    fn test_sloped_sweep_orders_by_capsule_axis() {
        // Both feet project onto the segment's end, but it passes body 2's axis near
        // the top well before it reaches body 1's.
        let query = WorldQuery::new(vec![body_at(1, 0.5, 0.0), body_at(2, 0.8, 0.0)]);
        let hit = query
            .sweep(
                Vec3::new(0.7, 1.7, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                CollisionChannel::Pawn,
                &IgnoreSet::new(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(hit.actor, ActorId::Character(2));
    }

    #[test]
    fn test_sweep_body_names_bone() {
        let query = WorldQuery::new(vec![body_at(1, 0.0, 0.0)]);
        let part = query
            .sweep_body(1, Vec3::new(-1.0, 1.72, 0.0), Vec3::new(1.0, 1.72, 0.0))
            .unwrap();
        assert_eq!(part.as_deref(), Some("head"));
    }

    #[test]
    fn test_sweep_body_between_bones_misses() {
        let query = WorldQuery::new(vec![body_at(1, 0.0, 0.0)]);
        // Passes in front of the torso without touching any sphere.
        let part = query
            .sweep_body(1, Vec3::new(-1.0, 1.2, 0.35), Vec3::new(1.0, 1.2, 0.35))
            .unwrap();
        assert_eq!(part, None);
    }

    #[test]
    fn test_sweep_body_unknown_target() {
        let query = WorldQuery::default();
        assert_eq!(
            query.sweep_body(9, Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)),
            Err(QueryError::NoBody(9))
        );
    }
}
