//! Central authority policy.
//!
//! Every mutating request goes through [`AuthorityGate::authorize`] once, instead of
//! each mutator checking the peer's role on its own.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::{CharacterId, WeaponId};

/// Network role of the local participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Owns the ground truth and originates every state change.
    Authority,
    /// Mirrors the authority and forwards its own requests to it.
    Observer,
}

/// A state change someone wants applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Equip {
        character: CharacterId,
        weapon: WeaponId,
    },
    StartAttack {
        character: CharacterId,
    },
    StopAttack {
        character: CharacterId,
    },
    AddWeapon {
        character: CharacterId,
        weapon: WeaponId,
    },
    RemoveWeapon {
        character: CharacterId,
        weapon: WeaponId,
        destroy: bool,
    },
}

/// Field-less tag of a [`Mutation`], used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Equip,
    StartAttack,
    StopAttack,
    AddWeapon,
    RemoveWeapon,
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Equip { .. } => MutationKind::Equip,
            Mutation::StartAttack { .. } => MutationKind::StartAttack,
            Mutation::StopAttack { .. } => MutationKind::StopAttack,
            Mutation::AddWeapon { .. } => MutationKind::AddWeapon,
            Mutation::RemoveWeapon { .. } => MutationKind::RemoveWeapon,
        }
    }

    pub fn character(&self) -> CharacterId {
        match *self {
            Mutation::Equip { character, .. }
            | Mutation::StartAttack { character }
            | Mutation::StopAttack { character }
            | Mutation::AddWeapon { character, .. }
            | Mutation::RemoveWeapon { character, .. } => character,
        }
    }

    pub fn weapon(&self) -> Option<WeaponId> {
        match *self {
            Mutation::Equip { weapon, .. }
            | Mutation::AddWeapon { weapon, .. }
            | Mutation::RemoveWeapon { weapon, .. } => Some(weapon),
            Mutation::StartAttack { .. } | Mutation::StopAttack { .. } => None,
        }
    }
}

/// Where a mutation has to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    ApplyLocally,
    ForwardToAuthority,
    Reject(CoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityGate {
    role: Role,
    forwarding_available: bool,
}

impl AuthorityGate {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            forwarding_available: false,
        }
    }

    pub fn authority() -> Self {
        Self::new(Role::Authority)
    }

    /// An observer that already has a live link to the authority.
    pub fn connected_observer() -> Self {
        let mut gate = Self::new(Role::Observer);
        gate.set_forwarding_available(true);
        gate
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn has_authority(&self) -> bool {
        self.role == Role::Authority
    }

    /// Marks whether the link to the authority is up.
    pub fn set_forwarding_available(&mut self, available: bool) {
        self.forwarding_available = available;
    }

    pub fn authorize(&self, mutation: &Mutation) -> Decision {
        match self.role {
            Role::Authority => Decision::ApplyLocally,
            Role::Observer if self.forwarding_available => Decision::ForwardToAuthority,
            Role::Observer => Decision::Reject(CoreError::AuthorizationDenied {
                mutation: mutation.kind(),
            }),
        }
    }
}
