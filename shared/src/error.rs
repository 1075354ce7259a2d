//! Error types shared by the authority and observing peers.

use thiserror::Error;

use crate::authority::MutationKind;

/// Errors surfaced to the code that originated a mutation.
///
/// None of these ever reach the per-tick hit resolution loop: authorization and
/// structural problems are settled where the mutation is requested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Mutation attempted without authority and without a path to the authority.
    #[error("authorization denied for {mutation:?}: no route to the authority")]
    AuthorizationDenied {
        /// Which kind of mutation was refused.
        mutation: MutationKind,
    },

    /// The world query service could not answer this tick.
    #[error("swept query service unavailable")]
    QueryUnavailable,

    /// Inventory state broke one of its invariants and was reset.
    #[error("inventory invariant violated: {0}")]
    InvariantViolation(String),

    /// A mutation named a character that does not exist.
    #[error("unknown character: {0}")]
    UnknownCharacter(u32),

    /// A mutation named a weapon that does not exist.
    #[error("unknown weapon: {0}")]
    UnknownWeapon(u32),

    /// Tried to equip a weapon the character is not carrying.
    #[error("weapon {weapon} is not in the inventory of character {character}")]
    NotInInventory {
        character: u32,
        weapon: u32,
    },

    /// A connection asked to mutate a character it does not control.
    #[error("client {client} does not control character {character}")]
    NotOwner { client: u32, character: u32 },

    /// Tried to pick up a weapon another character is holding.
    #[error("weapon {weapon} is held by character {holder}")]
    WeaponHeld { weapon: u32, holder: u32 },
}

/// Failure reported by a [`SweptQuerySource`](crate::hit_detection::SweptQuerySource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("world query service is not available")]
    Unavailable,
    #[error("target {0} has no body representation")]
    NoBody(u32),
}

impl From<QueryError> for CoreError {
    fn from(_: QueryError) -> Self {
        CoreError::QueryUnavailable
    }
}
