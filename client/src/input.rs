//! Turns typed commands into gameplay events and sequenced mutation requests

use shared::{CharacterId, Mutation, MutationRequest, WeaponId};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::game::ClientGameState;

/// One line of player input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    AttackPressed,
    AttackReleased,
    Equip(WeaponId),
    NextWeapon,
    /// Drop a weapon on the floor. `None` means the current one.
    Drop(Option<WeaponId>),
    /// Remove a weapon from the inventory and the world.
    Destroy(Option<WeaponId>),
    PickUp(WeaponId),
    /// Movement and camera axes; read but not simulated.
    Axis { name: String, value: f32 },
    Jump,
    Status,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("`{0}` needs a weapon id")]
    MissingWeapon(&'static str),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

fn parse_weapon(arg: Option<&str>) -> Result<Option<WeaponId>, InputError> {
    match arg {
        None => Ok(None),
        Some(raw) => raw
            .trim_start_matches('#')
            .parse::<u32>()
            .map(|id| Some(WeaponId(id)))
            .map_err(|_| InputError::InvalidNumber(raw.to_string())),
    }
}

/// Parses a command such as `attack`, `equip 3` or `drop`.
pub fn parse_command(line: &str) -> Result<InputEvent, InputError> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("").to_ascii_lowercase();
    let arg = words.next();

    let event = match command.as_str() {
        "attack" | "a" => InputEvent::AttackPressed,
        "release" | "r" => InputEvent::AttackReleased,
        "equip" | "e" => {
            InputEvent::Equip(parse_weapon(arg)?.ok_or(InputError::MissingWeapon("equip"))?)
        }
        "next" | "n" => InputEvent::NextWeapon,
        "drop" => InputEvent::Drop(parse_weapon(arg)?),
        "destroy" => InputEvent::Destroy(parse_weapon(arg)?),
        "pickup" | "p" => {
            InputEvent::PickUp(parse_weapon(arg)?.ok_or(InputError::MissingWeapon("pickup"))?)
        }
        "forward" | "right" | "turn" | "lookup" => {
            let raw = arg.unwrap_or("0");
            let value = raw
                .parse::<f32>()
                .map_err(|_| InputError::InvalidNumber(raw.to_string()))?;
            InputEvent::Axis {
                name: command,
                value,
            }
        }
        "jump" => InputEvent::Jump,
        "status" | "s" => InputEvent::Status,
        "quit" | "q" | "exit" => InputEvent::Quit,
        _ => return Err(InputError::UnknownCommand(line.trim().to_string())),
    };
    Ok(event)
}

/// Maps input events onto mutations and numbers the requests sent to the server.
pub struct InputManager {
    next_sequence: u32,
    /// Edge detection for the attack button.
    attack_held: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            attack_held: false,
        }
    }

    pub fn attack_held(&self) -> bool {
        self.attack_held
    }

    /// The mutation an event asks for, if any.
    ///
    /// Repeated presses or releases of the attack button produce nothing until the
    /// button changes state.
    pub fn to_mutation(
        &mut self,
        event: &InputEvent,
        character: CharacterId,
        game: &ClientGameState,
    ) -> Option<Mutation> {
        let current = game.current_weapon();
        match event {
            InputEvent::AttackPressed if !self.attack_held => {
                self.attack_held = true;
                Some(Mutation::StartAttack { character })
            }
            InputEvent::AttackReleased if self.attack_held => {
                self.attack_held = false;
                Some(Mutation::StopAttack { character })
            }
            InputEvent::Equip(weapon) => Some(Mutation::Equip {
                character,
                weapon: *weapon,
            }),
            InputEvent::NextWeapon => game.next_weapon().map(|weapon| Mutation::Equip {
                character,
                weapon,
            }),
            InputEvent::Drop(weapon) => weapon.or(current).map(|weapon| Mutation::RemoveWeapon {
                character,
                weapon,
                destroy: false,
            }),
            InputEvent::Destroy(weapon) => {
                weapon.or(current).map(|weapon| Mutation::RemoveWeapon {
                    character,
                    weapon,
                    destroy: true,
                })
            }
            InputEvent::PickUp(weapon) => Some(Mutation::AddWeapon {
                character,
                weapon: *weapon,
            }),
            _ => None,
        }
    }

    /// Wraps a mutation into the next sequenced request.
    pub fn next_request(&mut self, mutation: Mutation) -> MutationRequest {
        let request = MutationRequest {
            sequence: self.next_sequence,
            timestamp: Self::get_timestamp(),
            mutation,
        };
        self.next_sequence += 1;
        request
    }

    /// Forgets the button state, e.g. after the connection drops.
    pub fn reset(&mut self) {
        self.attack_held = false;
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("attack"), Ok(InputEvent::AttackPressed));
        assert_eq!(parse_command("  R "), Ok(InputEvent::AttackReleased));
        assert_eq!(parse_command("equip 3"), Ok(InputEvent::Equip(WeaponId(3))));
        assert_eq!(parse_command("equip #4"), Ok(InputEvent::Equip(WeaponId(4))));
        assert_eq!(parse_command("drop"), Ok(InputEvent::Drop(None)));
        assert_eq!(
            parse_command("destroy 2"),
            Ok(InputEvent::Destroy(Some(WeaponId(2))))
        );
        assert_eq!(
            parse_command("turn -0.5"),
            Ok(InputEvent::Axis {
                name: "turn".to_string(),
                value: -0.5
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_command("equip"),
            Err(InputError::MissingWeapon("equip"))
        );
        assert_eq!(
            parse_command("equip sword"),
            Err(InputError::InvalidNumber("sword".to_string()))
        );
        assert_eq!(
            parse_command("dance"),
            Err(InputError::UnknownCommand("dance".to_string()))
        );
    }

    #[test]
    fn test_attack_edges() {
        let game = ClientGameState::new();
        let mut input = InputManager::new();

        assert_eq!(
            input.to_mutation(&InputEvent::AttackPressed, 1, &game),
            Some(Mutation::StartAttack { character: 1 })
        );
        assert_eq!(input.to_mutation(&InputEvent::AttackPressed, 1, &game), None);
        assert!(input.attack_held());

        assert_eq!(
            input.to_mutation(&InputEvent::AttackReleased, 1, &game),
            Some(Mutation::StopAttack { character: 1 })
        );
        assert_eq!(input.to_mutation(&InputEvent::AttackReleased, 1, &game), None);
    }

    #[test]
    fn test_drop_without_weapon_does_nothing() {
        let game = ClientGameState::new();
        let mut input = InputManager::new();
        assert_eq!(input.to_mutation(&InputEvent::Drop(None), 1, &game), None);
        assert_eq!(
            input.to_mutation(&InputEvent::Axis { name: "forward".into(), value: 1.0 }, 1, &game),
            None
        );
    }

    #[test]
    fn test_requests_are_sequenced() {
        let mut input = InputManager::new();
        let first = input.next_request(Mutation::StartAttack { character: 1 });
        let second = input.next_request(Mutation::StopAttack { character: 1 });
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(second.timestamp >= first.timestamp);
    }
}
