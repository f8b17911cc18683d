//! Tunable rules of a session.

use crate::error::ConfigError;

use serde::{Deserialize, Serialize};

/// Every player starts the game with 45 cars.
pub const DEFAULT_NUM_OF_CARS: u8 = 45;
/// Every player starts the game with 3 stations.
pub const DEFAULT_NUM_OF_STATIONS: u8 = 3;
/// Each station, used or not, is worth 4 points.
pub const DEFAULT_STATION_VALUE: u16 = 4;
/// Train cards dealt to each player before the open deck is laid out.
pub const DEFAULT_NUM_INITIAL_TRAIN_CARDS: usize = 4;
/// The last round starts once a player has this many cars or fewer.
pub const DEFAULT_FINAL_ROUND_THRESHOLD: u8 = 2;
/// Bonus for the longest continuous path.
pub const DEFAULT_EUROPEAN_EXPRESS_BONUS: u16 = 10;

/// Rules of a session.
///
/// Missing fields fall back to the standard Europe rules when deserialized.
///
/// # Example
/// ```
/// use ticket_to_ride_europe::config::RulesConfig;
///
/// let config: RulesConfig = serde_json::from_str(r#"{"seed": 7}"#).unwrap();
/// assert_eq!(config.seed, Some(7));
/// assert_eq!(config.cars_per_player, 45);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    pub cars_per_player: u8,
    pub stations_per_player: u8,
    pub station_value: u16,
    pub initial_train_cards: usize,
    pub final_round_threshold: u8,
    pub european_express_bonus: u16,
    /// Seeds every shuffle of the session. Uses entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            cars_per_player: DEFAULT_NUM_OF_CARS,
            stations_per_player: DEFAULT_NUM_OF_STATIONS,
            station_value: DEFAULT_STATION_VALUE,
            initial_train_cards: DEFAULT_NUM_INITIAL_TRAIN_CARDS,
            final_round_threshold: DEFAULT_FINAL_ROUND_THRESHOLD,
            european_express_bonus: DEFAULT_EUROPEAN_EXPRESS_BONUS,
            seed: None,
        }
    }
}

impl RulesConfig {
    /// Same rules, with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Verifies that the rules describe a playable game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cars_per_player == 0 {
            return Err(ConfigError::InvalidRule {
                field: "cars_per_player",
                reason: String::from("players must start with at least one car."),
            });
        }

        if self.final_round_threshold >= self.cars_per_player {
            return Err(ConfigError::InvalidRule {
                field: "final_round_threshold",
                reason: format!(
                    "must be lower than the {} cars each player starts with.",
                    self.cars_per_player
                ),
            });
        }

        // Station costs grow from 1 to 3 cards, one per station.
        if !(1..=3).contains(&self.stations_per_player) {
            return Err(ConfigError::InvalidRule {
                field: "stations_per_player",
                reason: format!(
                    "between 1 and 3 stations are supported, got {}.",
                    self.stations_per_player
                ),
            });
        }

        Ok(())
    }

    /// Points granted upfront for the stations each player holds.
    #[inline]
    pub fn initial_points(&self) -> u16 {
        self.stations_per_player as u16 * self.station_value
    }
}
