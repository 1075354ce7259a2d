use log::{debug, info, warn};
use shared::{
    AuthorityGate, CharacterId, CoreError, HitNodeTracker, HitRecord, Mutation, ReplicationQueue,
    RequestOutcome, Update, Vec3, WeaponId, WorldState, BLADE_END, BLADE_START,
    DEFAULT_HIT_NODES,
};
use std::collections::HashMap;

use crate::physics::WorldQuery;

/// Tunables of the authoritative simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Weapons every new character spawns with.
    pub default_weapons: usize,
    /// Hit nodes per weapon. Zero gives weapons that never hit anything.
    pub hit_nodes: usize,
    /// Ticks one full swing takes.
    pub swing_ticks: u32,
    /// Total horizontal angle covered by a swing, in radians.
    pub swing_arc: f32,
    /// Distance between neighbouring spawn points.
    pub spawn_spacing: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_weapons: 2,
            hit_nodes: DEFAULT_HIT_NODES,
            swing_ticks: 8,
            swing_arc: std::f32::consts::FRAC_PI_2 * 1.5,
            spawn_spacing: 1.6,
        }
    }
}

impl GameConfig {
    pub fn weapon_tracker(&self) -> HitNodeTracker {
        HitNodeTracker::along_blade(self.hit_nodes, BLADE_START, BLADE_END)
    }

    /// Swing angle relative to the wielder's facing after `progress` ticks.
    pub fn swing_angle(&self, progress: u32) -> f32 {
        let ticks = self.swing_ticks.max(1);
        let t = (progress % ticks) as f32 / ticks as f32;
        -self.swing_arc / 2.0 + self.swing_arc * t
    }
}

/// The authoritative world together with what the server needs to run it.
#[derive(Debug)]
pub struct GameState {
    pub tick: u32,
    pub world: WorldState,
    config: GameConfig,
    gate: AuthorityGate,
    replication: ReplicationQueue,
    /// Ticks into the current swing, per attacking weapon.
    swing_progress: HashMap<WeaponId, u32>,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            tick: 0,
            world: WorldState::new(),
            config,
            gate: AuthorityGate::authority(),
            replication: ReplicationQueue::new(),
            swing_progress: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Spawns the character a client controls and hands it its default weapons.
    pub fn add_player(&mut self, client_id: CharacterId) -> Result<(), CoreError> {
        // Spawn points follow a golden-angle spiral, everyone facing the origin.
        let angle = client_id as f32 * 2.399_963;
        let radius = self.config.spawn_spacing * (1.0 + client_id as f32).sqrt();
        let position = Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin());
        let yaw = (-position.x).atan2(-position.z);

        self.world.spawn_character(client_id, position, yaw);
        self.world
            .publish_character(client_id, &mut self.replication);

        for _ in 0..self.config.default_weapons {
            let weapon = self.world.spawn_weapon(self.config.weapon_tracker());
            self.world.apply_and_publish(
                Mutation::AddWeapon {
                    character: client_id,
                    weapon,
                },
                &mut self.replication,
            )?;
        }
        self.grip_current_weapon(client_id);

        let current = self
            .world
            .character(client_id)
            .and_then(|c| c.current_weapon());
        info!(
            "Added player {} with {} weapons, holding {:?}",
            client_id, self.config.default_weapons, current
        );
        Ok(())
    }

    /// Tears down a client's character, destroying everything it carried.
    pub fn remove_player(&mut self, client_id: &CharacterId) {
        match self.world.destroy_inventory(*client_id) {
            Ok(weapons) => {
                for weapon in weapons {
                    self.swing_progress.remove(&weapon);
                    self.world.publish_weapon(weapon, &mut self.replication);
                }
            }
            Err(e) => warn!("Removing player {}: {}", client_id, e),
        }

        self.world.despawn_character(*client_id);
        self.world
            .publish_character(*client_id, &mut self.replication);
        info!("Removed player {}", client_id);
    }

    /// Checks a forwarded request before it reaches the world.
    ///
    /// Only existence and ownership are checked. Whether the mutation changes
    /// anything is left to the world.
    pub fn validate_request(&self, client_id: u32, mutation: &Mutation) -> Result<(), CoreError> {
        let character = mutation.character();
        if self.world.character(character).is_none() {
            return Err(CoreError::UnknownCharacter(character));
        }
        if character != client_id {
            return Err(CoreError::NotOwner {
                client: client_id,
                character,
            });
        }

        if let Some(id) = mutation.weapon() {
            let weapon = self.world.weapon(id).ok_or(CoreError::UnknownWeapon(id.0))?;
            if let Mutation::AddWeapon { .. } = mutation {
                if let Some(holder) = weapon.owner().filter(|h| *h != character) {
                    return Err(CoreError::WeaponHeld {
                        weapon: id.0,
                        holder,
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies a mutation a client forwarded.
    pub fn handle_request(
        &mut self,
        client_id: u32,
        mutation: Mutation,
    ) -> Result<RequestOutcome, CoreError> {
        self.validate_request(client_id, &mutation)?;
        let character = mutation.character();

        // A swing starts from wherever the weapon sits, so it must already be in hand.
        self.grip_current_weapon(character);
        let outcome = self
            .world
            .request(&self.gate, mutation, &mut self.replication)?;
        if let Mutation::RemoveWeapon { weapon, .. } = mutation {
            self.swing_progress.remove(&weapon);
        }
        self.grip_current_weapon(character);

        debug!("Client {} {:?} -> {:?}", client_id, mutation, outcome);
        Ok(outcome)
    }

    /// Puts a character's current weapon at rest in its hand unless it is mid-swing.
    fn grip_current_weapon(&mut self, character: CharacterId) {
        let Some(c) = self.world.character(character) else {
            return;
        };
        let Some(weapon) = c.current_weapon() else {
            return;
        };
        let pose = c.grip_pose(self.config.swing_angle(0));
        if let Some(w) = self.world.weapon_mut(weapon) {
            if w.session().is_none() {
                w.pose = pose;
            }
        }
    }

    /// Moves every held weapon to its wielder's hand, advancing running swings.
    fn animate_weapons(&mut self) {
        let held: Vec<(CharacterId, WeaponId)> = self
            .world
            .characters()
            .filter_map(|c| c.current_weapon().map(|w| (c.id, w)))
            .collect();
        self.swing_progress
            .retain(|weapon, _| held.iter().any(|(_, w)| w == weapon));

        for (character, weapon) in held {
            let attacking = self
                .world
                .weapon(weapon)
                .map_or(false, |w| w.session().is_some());

            let progress = if attacking {
                let progress = self.swing_progress.entry(weapon).or_insert(0);
                *progress += 1;
                *progress
            } else {
                self.swing_progress.remove(&weapon);
                0
            };

            let angle = self.config.swing_angle(progress);
            let pose = match self.world.character(character) {
                Some(c) => c.grip_pose(angle),
                None => continue,
            };
            if let Some(w) = self.world.weapon_mut(weapon) {
                w.pose = pose;
            }
        }
    }

    /// Runs one simulation tick: animate swings, then resolve hits in weapon order.
    pub fn update(&mut self) -> Vec<HitRecord> {
        self.animate_weapons();

        let query = WorldQuery::from_characters(self.world.characters());
        let hits = self.world.resolve_attacks(&query, &mut self.replication);
        for hit in &hits {
            self.swing_progress.remove(&hit.weapon);
        }

        self.tick += 1;
        hits
    }

    /// This tick's coalesced state changes.
    pub fn take_updates(&mut self) -> Vec<Update> {
        self.replication.take_updates()
    }

    /// Everything a newly connected observer needs.
    pub fn snapshot(&self) -> Vec<Update> {
        self.world.full_snapshot()
    }
}
