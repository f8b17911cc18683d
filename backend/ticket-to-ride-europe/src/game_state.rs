use crate::card::{TrainCardDeck, TrainCardDeckState};
use crate::config::RulesConfig;
use crate::destination::{DestinationPool, DestinationPoolState};
use crate::map::{Map, MapState};
use crate::player::{Player, PlayerState};
use crate::session::{GamePhase, MAX_PLAYERS};

use serde::Serialize;
use smallvec::SmallVec;

/// All the information about a game's current state, returned by [`Game::get_state`].
///
/// Emitted before every decision, so that the player always decides on up-to-date information.
#[derive(Debug, Serialize)]
pub struct GameSnapshot<'a> {
    /// The phase of the game.
    pub phase: GamePhase,
    /// Which player's turn it is, which maps to an index in [`GameSnapshot::players_state`] (modulo the number of players).
    ///
    /// This is `None` while the initial destination cards are selected, before turns have started.
    pub turn: Option<usize>,
    /// The player being asked to decide.
    pub current_player: usize,
    /// Ownership of routes and cities.
    pub map_state: MapState<'a>,
    /// Public information about the train card piles.
    pub train_card_deck_state: TrainCardDeckState<'a>,
    pub destination_pool_state: DestinationPoolState,
    /// Information about all the players in the game.
    ///
    /// This only contains public information about them, except for the player the snapshot is
    /// built for, whose private information is included as well.
    pub players_state: SmallVec<[PlayerState<'a>; MAX_PLAYERS]>,
    /// Human-readable description of everything that happened so far.
    pub log: &'a [String],
}

/// Everything shared by the players of a session.
///
/// The [`crate::session::Session`] owns it, and lends it to the [`crate::turn::TurnEngine`] of the
/// current player for the duration of a turn.
#[derive(Debug)]
pub struct Game {
    pub(crate) phase: GamePhase,
    pub(crate) turn: Option<usize>,
    pub(crate) current_player: usize,
    pub(crate) rules: RulesConfig,
    pub(crate) players: SmallVec<[Player; MAX_PLAYERS]>,
    pub(crate) map: Map,
    pub(crate) train_card_deck: TrainCardDeck,
    pub(crate) destination_pool: DestinationPool,
    pub(crate) log: Vec<String>,
    total_train_cards: usize,
}

impl Game {
    /// Puts together a game out of its parts. Turns start with the first player.
    ///
    /// The number of train cards held by the piles and the players is fixed from now on.
    pub fn new(
        players: SmallVec<[Player; MAX_PLAYERS]>,
        map: Map,
        train_card_deck: TrainCardDeck,
        destination_pool: DestinationPool,
        rules: RulesConfig,
    ) -> Self {
        let mut game = Self {
            phase: GamePhase::Starting,
            turn: None,
            current_player: 0,
            rules,
            players,
            map,
            train_card_deck,
            destination_pool,
            log: Vec::new(),
            total_train_cards: 0,
        };
        game.total_train_cards = game.num_train_cards_in_play();

        game
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn turn(&self) -> Option<usize> {
        self.turn
    }

    pub fn current_player(&self) -> usize {
        self.current_player
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn train_card_deck(&self) -> &TrainCardDeck {
        &self.train_card_deck
    }

    pub fn destination_pool(&self) -> &DestinationPool {
        &self.destination_pool
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Should only be used to set up a specific situation, typically in tests.
    pub fn get_mut_player(&mut self, player_id: usize) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    /// Should only be used to set up a specific situation, typically in tests.
    pub fn get_mut_map(&mut self) -> &mut Map {
        &mut self.map
    }

    pub(crate) fn push_log(&mut self, description: String) {
        log::debug!("{}", description);
        self.log.push(description);
    }

    /// Train cards in the piles and in the hands of the players.
    pub fn num_train_cards_in_play(&self) -> usize {
        self.train_card_deck.num_cards_in_decks()
            + self
                .players
                .iter()
                .map(|player| player.num_train_cards() as usize)
                .sum::<usize>()
    }

    /// # Panics
    /// If a train card appeared or vanished.
    pub(crate) fn assert_train_cards_conserved(&self) {
        assert_eq!(
            self.num_train_cards_in_play(),
            self.total_train_cards,
            "train cards must neither appear nor vanish"
        );
    }

    /// Returns the state of the game, as seen by `player_id`.
    pub fn get_state(&self, player_id: usize) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            turn: self.turn,
            current_player: self.current_player,
            map_state: self.map.get_state(),
            train_card_deck_state: self.train_card_deck.get_state(),
            destination_pool_state: self.destination_pool.get_state(),
            players_state: self
                .players
                .iter()
                .map(|player| player.get_player_state(player_id))
                .collect(),
            log: &self.log,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(num_players: usize) -> Self {
        use crate::player::PlayerColor;
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use strum::IntoEnumIterator;

        let rules = RulesConfig::with_seed(0);
        let players = PlayerColor::iter()
            .take(num_players)
            .enumerate()
            .map(|(id, color)| {
                Player::new(
                    id,
                    color,
                    format!("Player {}", id + 1),
                    rules.cars_per_player,
                    rules.stations_per_player,
                    rules.initial_points(),
                )
            })
            .collect();

        let mut train_card_deck = TrainCardDeck::new(StdRng::seed_from_u64(0));
        train_card_deck.refill_open_train_card_deck();

        Self::new(
            players,
            Map::europe(),
            train_card_deck,
            DestinationPool::europe(StdRng::seed_from_u64(0)),
            rules,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{TrainColor, NUM_TRAIN_CARDS};

    #[test]
    fn new_game_has_every_train_card() {
        let game = Game::for_tests(3);

        assert_eq!(game.num_train_cards_in_play(), NUM_TRAIN_CARDS);
        assert_eq!(game.phase(), GamePhase::Starting);
        assert_eq!(game.turn(), None);
        game.assert_train_cards_conserved();
    }

    #[test]
    #[should_panic(expected = "train cards must neither appear nor vanish")]
    fn extra_train_card_is_detected() {
        let mut game = Game::for_tests(2);

        if let Some(player) = game.get_mut_player(0) {
            player.add_train_card(TrainColor::Red);
        }
        game.assert_train_cards_conserved();
    }

    #[test]
    fn snapshot_only_reveals_private_state_of_viewer() {
        let game = Game::for_tests(3);
        let snapshot = game.get_state(1);

        assert_eq!(snapshot.players_state.len(), 3);
        assert!(snapshot.players_state[0].private_player_state.is_none());
        assert!(snapshot.players_state[1].private_player_state.is_some());
        assert!(snapshot.players_state[2].private_player_state.is_none());
    }

    #[test]
    fn snapshot_to_json() -> serde_json::Result<()> {
        let mut game = Game::for_tests(2);
        game.push_log(String::from("Player 1 drew a red train card from the open deck."));

        let json: serde_json::Value = serde_json::to_value(game.get_state(0))?;

        assert_eq!(json["phase"], "starting");
        assert_eq!(json["turn"], serde_json::Value::Null);
        assert_eq!(json["train_card_deck_state"]["close_train_card_deck_size"], 105);
        assert_eq!(
            json["destination_pool_state"]["long_destination_card_deck_size"],
            6
        );
        assert_eq!(
            json["log"][0],
            "Player 1 drew a red train card from the open deck."
        );
        assert_eq!(json["players_state"][0]["public_player_state"]["points"], 12);
        Ok(())
    }
}
