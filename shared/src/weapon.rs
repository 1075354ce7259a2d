use log::debug;
use serde::{Deserialize, Serialize};

use crate::attack::{AttackOutcome, AttackPhase, AttackSession};
use crate::hit_detection::{ActorId, HitEvent, HitNodeTracker, IgnoreSet, SweptQuerySource};
use crate::math::Pose;
use crate::{CharacterId, WeaponId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponState {
    Idle,
    Firing,
    Equipping,
    Reloading,
}

/// A melee weapon living in the world.
///
/// The weapon exclusively owns its hit nodes. Characters only refer to it by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub id: WeaponId,
    pub state: WeaponState,
    /// World placement, driven by whoever animates the wielder.
    pub pose: Pose,
    owner: Option<CharacterId>,
    tracker: HitNodeTracker,
    session: Option<AttackSession>,
    /// Mirrors the authority's attacking flag on peers that do not run sessions.
    replicated_attacking: bool,
    sessions_started: u32,
}

impl Weapon {
    pub fn new(id: WeaponId, tracker: HitNodeTracker) -> Self {
        Self {
            id,
            state: WeaponState::Idle,
            pose: Pose::default(),
            owner: None,
            tracker,
            session: None,
            replicated_attacking: false,
            sessions_started: 0,
        }
    }

    pub fn owner(&self) -> Option<CharacterId> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<CharacterId>) {
        if self.owner != owner {
            debug!("Weapon {} owner {:?} -> {:?}", self.id, self.owner, owner);
            self.owner = owner;
        }
    }

    pub fn on_enter_inventory(&mut self, owner: CharacterId) {
        self.set_owner(Some(owner));
    }

    pub fn on_leave_inventory(&mut self) {
        self.stop_attacking();
        self.set_owner(None);
    }

    pub fn tracker(&self) -> &HitNodeTracker {
        &self.tracker
    }

    pub fn is_attacking(&self) -> bool {
        self.session.is_some() || self.replicated_attacking
    }

    pub fn phase(&self) -> AttackPhase {
        if self.is_attacking() {
            AttackPhase::Attacking
        } else {
            AttackPhase::Idle
        }
    }

    pub fn session(&self) -> Option<&AttackSession> {
        self.session.as_ref()
    }

    /// Opens a new attack session from the weapon's current pose.
    ///
    /// Restarting while a session is open re-snapshots the nodes.
    pub fn start_attacking(&mut self) {
        self.sessions_started += 1;
        self.session = Some(AttackSession::begin(
            self.sessions_started,
            &mut self.tracker,
            &self.pose,
        ));
        self.state = WeaponState::Firing;
    }

    /// Ends any running attack. Safe to call at any time.
    pub fn stop_attacking(&mut self) {
        self.session = None;
        self.replicated_attacking = false;
        if self.state == WeaponState::Firing {
            self.state = WeaponState::Idle;
        }
    }

    /// Applies the attacking flag decided by the authority without running hit detection.
    pub fn apply_replicated_attacking(&mut self, attacking: bool) {
        self.replicated_attacking = attacking;
        if attacking {
            self.state = WeaponState::Firing;
        } else if self.session.is_none() && self.state == WeaponState::Firing {
            self.state = WeaponState::Idle;
        }
    }

    /// Actors this weapon's sweeps pass through: itself and its wielder.
    pub fn ignore_set(&self) -> IgnoreSet {
        let mut ignore = IgnoreSet::new().with(ActorId::Weapon(self.id));
        if let Some(owner) = self.owner {
            ignore.insert(ActorId::Character(owner));
        }
        ignore
    }

    /// Runs one tick of hit detection if an attack is open.
    ///
    /// A confirmed hit closes the session and is returned exactly once.
    pub fn resolve<Q: SweptQuerySource + ?Sized>(&mut self, query: &Q) -> Option<HitEvent> {
        let ignore = self.ignore_set();
        let session = self.session.as_mut()?;
        match session.resolve(&mut self.tracker, &self.pose, query, &ignore) {
            AttackOutcome::Continue => None,
            AttackOutcome::Resolved(hit) => {
                self.stop_attacking();
                Some(hit)
            }
        }
    }
}
