//! Lifecycle of a single melee attack: Idle -> Attacking -> Idle.
//!
//! A session is opened by `StartAttacking`, closed by `StopAttacking`, and also closed
//! by the first confirmed hit. One swing can therefore hit at most one target.

use log::info;
use serde::{Deserialize, Serialize};

use crate::hit_detection::{HitEvent, HitNodeTracker, IgnoreSet, SweptQuerySource};
use crate::math::Pose;

/// Externally visible phase of a weapon's attack state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPhase {
    Idle,
    Attacking,
}

/// What one call to [`AttackSession::resolve`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Swing continues next tick.
    Continue,
    /// A hit was confirmed and the session is over.
    Resolved(HitEvent),
}

/// A running attack. Dropping it is how the attack ends.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackSession {
    pub id: u32,
    /// Ticks this session has been resolved for.
    pub ticks: u32,
}

impl AttackSession {
    /// Opens a session and captures the starting position of every hit node.
    pub fn begin(id: u32, tracker: &mut HitNodeTracker, pose: &Pose) -> Self {
        tracker.snapshot(pose);
        Self { id, ticks: 0 }
    }

    /// Runs one tick of hit detection for this session.
    pub fn resolve<Q: SweptQuerySource + ?Sized>(
        &mut self,
        tracker: &mut HitNodeTracker,
        pose: &Pose,
        query: &Q,
        ignore: &IgnoreSet,
    ) -> AttackOutcome {
        self.ticks += 1;
        match tracker.sweep(pose, query, ignore) {
            Some(hit) => {
                info!(
                    "Attack {} resolved after {} ticks: node {} hit character {} ({})",
                    self.id, self.ticks, hit.node_index, hit.target, hit.part
                );
                AttackOutcome::Resolved(hit)
            }
            None => AttackOutcome::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_detection::tests::PlaneTarget;
    use crate::math::Vec3;

    #[test]
    fn test_begin_snapshots_nodes() {
        let mut tracker = HitNodeTracker::along_blade(2, 0.5, 1.0);
        let pose = Pose::new(Vec3::new(3.0, 0.0, 0.0), 0.0);
        let session = AttackSession::begin(1, &mut tracker, &pose);

        assert_eq!(session.ticks, 0);
        assert_eq!(tracker.nodes()[0].last_position, Vec3::new(3.0, 0.0, 0.5));
    }

    #[test]
    fn test_resolve_continues_without_hit() {
        let mut tracker = HitNodeTracker::along_blade(2, 0.5, 1.0);
        let mut session = AttackSession::begin(1, &mut tracker, &Pose::default());
        let query = PlaneTarget::character(5, 10.0);

        let moved = Pose::new(Vec3::new(0.0, 0.0, 1.0), 0.0);
        let outcome = session.resolve(&mut tracker, &moved, &query, &IgnoreSet::new());
        assert_eq!(outcome, AttackOutcome::Continue);
        assert_eq!(session.ticks, 1);
    }

    #[test]
    fn test_resolve_reports_hit() {
        let mut tracker = HitNodeTracker::along_blade(2, 0.5, 1.0);
        let mut session = AttackSession::begin(1, &mut tracker, &Pose::default());
        let query = PlaneTarget::character(5, 1.2);

        let moved = Pose::new(Vec3::new(0.0, 0.0, 0.5), 0.0);
        match session.resolve(&mut tracker, &moved, &query, &IgnoreSet::new()) {
            AttackOutcome::Resolved(hit) => {
                assert_eq!(hit.node_index, 1);
                assert_eq!(hit.target, 5);
            }
            AttackOutcome::Continue => panic!("Expected a confirmed hit"),
        }
    }
}
