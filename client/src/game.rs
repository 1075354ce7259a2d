use log::{debug, info, warn};
use shared::{
    AuthorityGate, CharacterId, CoreError, EntityId, HitEvent, Mutation, ReplicationQueue,
    RequestOutcome, Role, Update, WeaponId, WorldState,
};

/// A hit the server announced.
#[derive(Debug, Clone, PartialEq)]
pub struct HitNotice {
    pub tick: u32,
    pub weapon: WeaponId,
    pub attacker: Option<CharacterId>,
    pub event: HitEvent,
}

/// The observer's mirror of the authoritative world.
///
/// Local requests never touch `world` directly: the gate forwards them, and the
/// world only changes when the server's replicated fields arrive.
pub struct ClientGameState {
    pub world: WorldState,
    gate: AuthorityGate,
    outbox: ReplicationQueue,
    client_id: Option<CharacterId>,
    last_replicated_tick: Option<u32>,
    hits: Vec<HitNotice>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            world: WorldState::new(),
            gate: AuthorityGate::new(Role::Observer),
            outbox: ReplicationQueue::new(),
            client_id: None,
            last_replicated_tick: None,
            hits: Vec::new(),
        }
    }

    pub fn client_id(&self) -> Option<CharacterId> {
        self.client_id
    }

    pub fn gate(&self) -> &AuthorityGate {
        &self.gate
    }

    pub fn on_connected(&mut self, client_id: CharacterId) {
        self.client_id = Some(client_id);
        self.gate.set_forwarding_available(true);
    }

    /// Drops the link to the authority. The mirrored world is discarded as it can no
    /// longer be kept in sync.
    pub fn on_disconnected(&mut self) {
        self.client_id = None;
        self.gate.set_forwarding_available(false);
        self.world = WorldState::new();
        self.last_replicated_tick = None;
        self.outbox.take_requests();
    }

    /// Routes a local mutation through the gate.
    pub fn request(&mut self, mutation: Mutation) -> Result<RequestOutcome, CoreError> {
        self.world.request(&self.gate, mutation, &mut self.outbox)
    }

    /// Mutations waiting to be sent to the server.
    pub fn take_requests(&mut self) -> Vec<Mutation> {
        self.outbox
            .take_requests()
            .into_iter()
            .map(|(_, mutation)| mutation)
            .collect()
    }

    /// Applies one `Replicate` packet. Packets older than the newest one applied are
    /// dropped, since a datagram may arrive late.
    pub fn apply_replicate(&mut self, tick: u32, updates: Vec<Update>) -> usize {
        if self.last_replicated_tick.map_or(false, |last| tick < last) {
            debug!("Dropping stale replication for tick {}", tick);
            return 0;
        }
        self.last_replicated_tick = Some(tick);

        let mut applied = 0;
        for update in updates {
            let entity = update.entity;
            match self.world.apply_replicated(update) {
                Ok(()) => applied += 1,
                Err(e) => warn!("Replicated update for {:?} failed: {}", entity, e),
            }
        }
        applied
    }

    pub fn record_hit(&mut self, hit: HitNotice) {
        let me = self.client_id;
        if me == Some(hit.event.target) {
            info!("You were hit on {} by weapon {}", hit.event.part, hit.weapon);
        } else if me.is_some() && hit.attacker == me {
            info!("You hit character {} on {}", hit.event.target, hit.event.part);
        } else {
            info!(
                "Character {:?} hit character {} on {}",
                hit.attacker, hit.event.target, hit.event.part
            );
        }
        self.hits.push(hit);
    }

    pub fn hits(&self) -> &[HitNotice] {
        &self.hits
    }

    pub fn current_weapon(&self) -> Option<WeaponId> {
        self.client_id
            .and_then(|id| self.world.character(id))
            .and_then(|c| c.current_weapon())
    }

    /// The weapon after the current one in inventory order, wrapping around.
    pub fn next_weapon(&self) -> Option<WeaponId> {
        let character = self.world.character(self.client_id?)?;
        let weapons = character.inventory().weapons();
        if weapons.len() < 2 {
            return None;
        }
        let index = character
            .current_weapon()
            .and_then(|current| weapons.iter().position(|w| *w == current))
            .map_or(0, |i| (i + 1) % weapons.len());
        Some(weapons[index])
    }

    /// Weapons lying in the world without an owner.
    pub fn loose_weapons(&self) -> Vec<WeaponId> {
        self.world
            .weapons()
            .filter(|w| w.owner().is_none())
            .map(|w| w.id)
            .collect()
    }

    /// One-line summary of what the local character carries.
    pub fn status_line(&self) -> String {
        let Some(character) = self.client_id.and_then(|id| self.world.character(id)) else {
            return "not connected".to_string();
        };

        let weapons: Vec<String> = character
            .inventory()
            .weapons()
            .iter()
            .map(|w| {
                let mut label = w.to_string();
                if Some(*w) == character.current_weapon() {
                    label.push('*');
                }
                if self.world.weapon(*w).map_or(false, |w| w.is_attacking()) {
                    label.push('!');
                }
                label
            })
            .collect();

        format!(
            "character {} | inventory [{}] | previous {:?} | on floor {:?} | {} hits seen",
            character.id,
            weapons.join(", "),
            character.previous_weapon(),
            self.loose_weapons(),
            self.hits.len()
        )
    }

    pub fn knows(&self, entity: EntityId) -> bool {
        match entity {
            EntityId::Character(id) => self.world.character(id).is_some(),
            EntityId::Weapon(id) => self.world.weapon(id).is_some(),
        }
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::replication::{CharacterSnapshot, ReplicatedField, WeaponSnapshot};
    use shared::{Vec3, WeaponState};

    fn weapon_update(id: u32, owner: Option<u32>) -> Update {
        Update {
            entity: EntityId::Weapon(WeaponId(id)),
            field: ReplicatedField::Weapon(WeaponSnapshot {
                owner,
                state: WeaponState::Idle,
                attacking: false,
            }),
        }
    }

    fn inventory_update(character: u32, weapons: &[u32], current: Option<u32>) -> Update {
        Update {
            entity: EntityId::Character(character),
            field: ReplicatedField::Inventory {
                weapons: weapons.iter().map(|w| WeaponId(*w)).collect(),
                current: current.map(WeaponId),
            },
        }
    }

    fn connected_game() -> ClientGameState {
        let mut game = ClientGameState::new();
        game.on_connected(1);
        game.apply_replicate(
            1,
            vec![
                weapon_update(1, Some(1)),
                weapon_update(2, Some(1)),
                weapon_update(3, None),
                Update {
                    entity: EntityId::Character(1),
                    field: ReplicatedField::Character(CharacterSnapshot {
                        position: Vec3::ZERO,
                        yaw: 0.0,
                    }),
                },
                inventory_update(1, &[1, 2], Some(1)),
            ],
        );
        game
    }

    #[test]
    fn test_requests_before_connect_are_denied() {
        let mut game = ClientGameState::new();
        let result = game.request(Mutation::StartAttack { character: 1 });
        assert!(matches!(result, Err(CoreError::AuthorizationDenied { .. })));
        assert!(game.take_requests().is_empty());
    }

    #[test]
    fn test_requests_are_forwarded_not_applied() {
        let mut game = connected_game();
        let outcome = game
            .request(Mutation::Equip {
                character: 1,
                weapon: WeaponId(2),
            })
            .unwrap();

        assert_eq!(outcome, RequestOutcome::Forwarded);
        assert_eq!(game.current_weapon(), Some(WeaponId(1)));
        assert_eq!(game.take_requests().len(), 1);
    }

    #[test]
    fn test_replicated_equip_runs_transition() {
        let mut game = connected_game();
        game.apply_replicate(2, vec![inventory_update(1, &[1, 2], Some(2))]);

        let character = game.world.character(1).unwrap();
        assert_eq!(character.current_weapon(), Some(WeaponId(2)));
        assert_eq!(character.previous_weapon(), Some(WeaponId(1)));
        assert!(character.had_previous_weapon());
    }

    #[test]
    fn test_stale_replication_is_dropped() {
        let mut game = connected_game();
        game.apply_replicate(5, vec![inventory_update(1, &[1, 2], Some(2))]);
        assert_eq!(
            game.apply_replicate(4, vec![inventory_update(1, &[1, 2], Some(1))]),
            0
        );
        assert_eq!(game.current_weapon(), Some(WeaponId(2)));
    }

    #[test]
    fn test_next_weapon_wraps() {
        let mut game = connected_game();
        assert_eq!(game.next_weapon(), Some(WeaponId(2)));
        game.apply_replicate(2, vec![inventory_update(1, &[1, 2], Some(2))]);
        assert_eq!(game.next_weapon(), Some(WeaponId(1)));
    }

    #[test]
    fn test_loose_weapons_and_status() {
        let game = connected_game();
        assert_eq!(game.loose_weapons(), vec![WeaponId(3)]);
        assert!(game.knows(EntityId::Weapon(WeaponId(3))));
        assert!(game.status_line().contains("[#1*, #2]"));
    }

    #[test]
    fn test_disconnect_clears_mirror() {
        let mut game = connected_game();
        game.on_disconnected();
        assert!(game.client_id().is_none());
        assert!(!game.gate().has_authority());
        assert!(!game.knows(EntityId::Character(1)));
        assert_eq!(game.status_line(), "not connected");
    }
}
