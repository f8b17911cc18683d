use crate::card::TrainCardDeck;
use crate::config::RulesConfig;
use crate::decision::Frontend;
use crate::destination::DestinationPool;
use crate::error::{ConfigError, EngineError};
use crate::game_state::{Game, GameSnapshot};
use crate::map::{Map, RouteId, MAX_ROUTES_PER_CITY};
use crate::player::{Player, PlayerColor};
use crate::turn::{TurnEngine, TurnOutcome};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::iter::once;
use strum::IntoEnumIterator;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;

const NUM_INITIAL_SHORT_DESTINATION_CARDS: usize = 3;
const NUM_INITIAL_LONG_DESTINATION_CARDS: usize = 1;
const MIN_INITIAL_DESTINATION_CARDS_KEPT: usize = 2;

/// Phases of the game, which act as states in the session's finite-state machine.
///
/// # JSON
/// Phases are serialized in snake_case.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// When the game starts, players select their initial set of
    /// [`crate::destination::DestinationCard`]s, one after the other.
    ///
    /// Once all have done so, we move to the turn-based game ([`GamePhase::Playing`]).
    Starting,
    /// The main phase of the game.
    ///
    /// Denotes the main turn-based game, up until when we transition to each player's last turn.
    Playing,
    /// When a player is left with two cars or less, every other player has one turn left.
    ///
    /// This last round is denoted by this special phase.
    LastTurn,
    /// When each player has played their last turn, and final scores are known.
    ///
    /// No actions can be taken at this point.
    Done,
}

/// Breakdown of a player's score once the game is over.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FinalScore {
    pub player_id: usize,
    pub name: String,
    /// Points accumulated during the game, from stations and claimed routes.
    pub points: u16,
    /// Points of fulfilled destinations, minus points of unfulfilled ones.
    pub destination_points: i32,
    pub num_fulfilled_destinations: usize,
    /// Length of the longest continuous path of the player.
    pub longest_route: u16,
    /// Whether the player was granted the European Express bonus, for the longest continuous path.
    pub european_express: bool,
    pub total: i32,
}

#[derive(Clone, Copy, Debug)]
struct FinalRound {
    triggered_by: usize,
    turns_left: usize,
}

/// Owns everything about a game, and drives it turn after turn until it is over.
pub struct Session<F: Frontend> {
    game: Game,
    frontend: F,
    final_round: Option<FinalRound>,
    final_scores: Vec<FinalScore>,
}

impl<F: Frontend> Session<F> {
    /// Creates a session on the Europe map. Players play in the order of `names`.
    ///
    /// Every player is dealt their initial train cards, then the open deck is laid out.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::config::RulesConfig;
    /// use ticket_to_ride_europe::decision::ScriptedFrontend;
    /// use ticket_to_ride_europe::session::{GamePhase, Session};
    ///
    /// let names = vec![String::from("Alice"), String::from("Bob")];
    /// let session = Session::new(names, RulesConfig::with_seed(1), ScriptedFrontend::default()).unwrap();
    ///
    /// assert_eq!(session.game().phase(), GamePhase::Starting);
    /// assert_eq!(session.game().players()[1].num_train_cards(), 4);
    /// assert_eq!(session.game().train_card_deck().get_open_train_card_deck().len(), 5);
    /// ```
    pub fn new(names: Vec<String>, rules: RulesConfig, frontend: F) -> Result<Self, EngineError> {
        rules.validate()?;

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&names.len()) {
            return Err(ConfigError::PlayerCount(names.len()).into());
        }

        let mut unique_names = HashSet::with_capacity(names.len());
        for name in &names {
            if !unique_names.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()).into());
            }
        }

        let mut rng = match rules.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut train_card_deck = TrainCardDeck::new(StdRng::seed_from_u64(rng.gen()));
        let destination_pool = DestinationPool::europe(StdRng::seed_from_u64(rng.gen()));

        info!(
            "Starting a session with {} players: {}.",
            names.len(),
            names.join(", ")
        );

        let mut players: SmallVec<[Player; MAX_PLAYERS]> = names
            .into_iter()
            .zip(PlayerColor::iter())
            .enumerate()
            .map(|(id, (name, color))| {
                Player::new(
                    id,
                    color,
                    name,
                    rules.cars_per_player,
                    rules.stations_per_player,
                    rules.initial_points(),
                )
            })
            .collect();

        for player in &mut players {
            for _ in 0..rules.initial_train_cards {
                match train_card_deck.draw() {
                    Ok(train_card) => player.add_train_card(train_card),
                    Err(err) => {
                        warn!("Could not deal every initial train card: {}", err);
                        break;
                    }
                }
            }
        }
        train_card_deck.refill_open_train_card_deck();

        let game = Game::new(
            players,
            Map::europe(),
            train_card_deck,
            destination_pool,
            rules,
        );

        Ok(Self::from_game(game, frontend))
    }

    /// Resumes from a prepared game, typically to play out a specific situation.
    ///
    /// If the game is still [`GamePhase::Starting`], the initial destination cards are selected on
    /// the first call to [`Session::play_turn`].
    pub fn from_game(game: Game, frontend: F) -> Self {
        Self {
            game,
            frontend,
            final_round: None,
            final_scores: Vec::new(),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Should only be used to set up a specific situation, typically in tests.
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    /// The state of the game, as seen by the current player.
    pub fn snapshot(&self) -> GameSnapshot {
        self.game.get_state(self.game.current_player)
    }

    /// The player whose cars triggered the final round, if it started.
    pub fn final_round_triggered_by(&self) -> Option<usize> {
        self.final_round.map(|final_round| final_round.triggered_by)
    }

    /// Empty until the game is over.
    pub fn final_scores(&self) -> &[FinalScore] {
        &self.final_scores
    }

    /// Lets each player, in turn order, select their initial destination cards.
    ///
    /// Each player is dealt one long destination and three short ones, and must keep at least two.
    pub fn select_initial_destination_cards(&mut self) -> Result<(), EngineError> {
        if self.game.phase != GamePhase::Starting {
            return Ok(());
        }

        for player_id in 0..self.game.players.len() {
            self.game.current_player = player_id;

            let destination_cards = self.game.destination_pool.deal_initial_hand(
                NUM_INITIAL_SHORT_DESTINATION_CARDS,
                NUM_INITIAL_LONG_DESTINATION_CARDS,
            );
            let num_drawn = destination_cards.len();
            let kept_destination_cards = TurnEngine::new(&mut self.game, &mut self.frontend)
                .select_destination_cards(destination_cards, MIN_INITIAL_DESTINATION_CARDS_KEPT)?;

            let player = &mut self.game.players[player_id];
            let description = player
                .selected_destination_cards_description(kept_destination_cards.len(), num_drawn);
            player.add_destination_cards(kept_destination_cards);
            self.game.push_log(description);
        }

        self.game.current_player = 0;
        self.game.turn = Some(0);
        self.game.phase = GamePhase::Playing;
        info!("Every player selected their destination cards, turns begin.");

        Ok(())
    }

    /// Plays the turn of the current player, then moves on to the next player.
    pub fn play_turn(&mut self) -> Result<TurnOutcome, EngineError> {
        match self.game.phase {
            GamePhase::Done => return Err(EngineError::GameOver),
            GamePhase::Starting => self.select_initial_destination_cards()?,
            GamePhase::Playing | GamePhase::LastTurn => {}
        }

        info!(
            "Turn {}: {} to play.",
            self.game.turn.unwrap_or_default(),
            self.game.players[self.game.current_player].name()
        );

        let outcome = TurnEngine::new(&mut self.game, &mut self.frontend).play_turn()?;
        self.end_turn();

        Ok(outcome)
    }

    /// Plays turns until the game is over, and returns the final scores.
    pub fn run(&mut self) -> Result<&[FinalScore], EngineError> {
        while self.game.phase != GamePhase::Done {
            self.play_turn()?;
        }

        Ok(&self.final_scores)
    }

    fn end_turn(&mut self) {
        let current_player = self.game.current_player;

        let is_over = match &mut self.final_round {
            Some(final_round) => {
                self.game.players[current_player].set_done_playing();
                final_round.turns_left -= 1;
                final_round.turns_left == 0
            }
            None => {
                self.arm_final_round();
                false
            }
        };

        if is_over {
            self.finish();
            return;
        }

        self.game.current_player = (current_player + 1) % self.game.players.len();
        self.game.turn = self.game.turn.map(|turn| turn + 1);
    }

    /// Starts the final round once a player is left with few enough cars.
    fn arm_final_round(&mut self) {
        let final_round_threshold = self.game.rules.final_round_threshold;
        let triggered_by = match self
            .game
            .players
            .iter()
            .position(|player| player.cars() <= final_round_threshold)
        {
            Some(triggered_by) => triggered_by,
            None => return,
        };

        let player = &mut self.game.players[triggered_by];
        player.set_done_playing();
        let description = format!(
            "{} has {} cars left: every other player has one last turn.",
            player.name(),
            player.cars()
        );
        info!(
            "Final round triggered by {} with {} cars left.",
            player.name(),
            player.cars()
        );

        self.final_round = Some(FinalRound {
            triggered_by,
            turns_left: self.game.players.len() - 1,
        });
        self.game.phase = GamePhase::LastTurn;
        self.game.push_log(description);
    }

    fn finish(&mut self) {
        self.game.phase = GamePhase::Done;
        for player in &mut self.game.players {
            player.set_done_playing();
        }

        self.final_scores = compute_final_scores(&self.game);
        for final_score in &self.final_scores {
            self.game.push_log(format!(
                "{} scored {} points in total.",
                final_score.name, final_score.total
            ));
        }

        info!(
            "Session over after {} turns.",
            self.game.turn.map_or(0, |turn| turn + 1)
        );
    }
}

/// Scores every player of a finished game.
///
/// The European Express bonus goes to every player tied for the longest continuous path.
pub fn compute_final_scores(game: &Game) -> Vec<FinalScore> {
    let longest_routes: SmallVec<[u16; MAX_PLAYERS]> = game
        .players
        .iter()
        .map(|player| Map::get_longest_route(player.claimed_routes()))
        .collect();
    let longest_route_overall = longest_routes.iter().copied().max().unwrap_or_default();

    game.players
        .iter()
        .zip(longest_routes)
        .map(|(player, longest_route)| {
            let (destination_points, num_fulfilled_destinations) =
                best_destination_points(&game.map, player);
            let european_express = longest_route > 0 && longest_route == longest_route_overall;
            let bonus = if european_express {
                game.rules.european_express_bonus
            } else {
                0
            };

            FinalScore {
                player_id: player.id(),
                name: player.name().to_string(),
                points: player.points(),
                destination_points,
                num_fulfilled_destinations,
                longest_route,
                european_express,
                total: player.points() as i32 + destination_points + bonus as i32,
            }
        })
        .collect()
}

/// Destination points of `player`, when each of their stations borrows the most useful route.
///
/// Every combination of borrowed routes is tried: a player has few stations, and a city few routes.
fn best_destination_points(map: &Map, player: &Player) -> (i32, usize) {
    let player_id = player.id();
    let station_options: Vec<SmallVec<[Option<RouteId>; MAX_ROUTES_PER_CITY + 1]>> = map
        .station_cities_of(player_id)
        .map(|city| {
            once(None)
                .chain(map.borrowable_routes(city, player_id).into_iter().map(Some))
                .collect()
        })
        .collect();

    let mut choices = vec![0; station_options.len()];
    let mut best = None;

    loop {
        let borrowed_routes: SmallVec<[RouteId; 3]> = choices
            .iter()
            .zip(&station_options)
            .filter_map(|(choice, options)| options[*choice])
            .collect();

        let mut destination_points = 0;
        let mut num_fulfilled_destinations = 0;
        for destination_card in player.destination_cards() {
            if map.has_player_fulfilled_destination(
                destination_card.destination,
                player_id,
                &borrowed_routes,
            ) {
                destination_points += destination_card.points as i32;
                num_fulfilled_destinations += 1;
            } else {
                destination_points -= destination_card.points as i32;
            }
        }

        if best.map_or(true, |(best_points, _)| destination_points > best_points) {
            best = Some((destination_points, num_fulfilled_destinations));
        }

        // Moves on to the next combination, like an odometer.
        let mut position = 0;
        loop {
            if position == choices.len() {
                return best.unwrap_or_default();
            }

            choices[position] += 1;
            if choices[position] < station_options[position].len() {
                break;
            }

            choices[position] = 0;
            position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::TrainColor;
    use crate::card::TrainColor::*;
    use crate::city::City;
    use crate::decision::ScriptedFrontend;
    use crate::destination::{DestinationCard, DestinationLength};
    use crate::turn::TurnAction;

    use pretty_assertions::assert_eq;
    use smallvec::smallvec;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn destination(start: City, end: City, points: u8) -> DestinationCard {
        DestinationCard {
            destination: (start, end),
            points,
            length: DestinationLength::Short,
        }
    }

    fn player(id: usize, name: &str, cars: u8, train_cards: &[TrainColor]) -> Player {
        let color = PlayerColor::iter().nth(id).unwrap();
        let mut player = Player::new(id, color, name.to_string(), cars, 3, 12);
        for train_card in train_cards {
            player.add_train_card(*train_card);
        }

        player
    }

    fn game(players: SmallVec<[Player; MAX_PLAYERS]>) -> Game {
        Game::new(
            players,
            Map::europe(),
            TrainCardDeck::with_piles(
                vec![Black; 20],
                vec![Orange; 5],
                vec![],
                StdRng::seed_from_u64(2),
            ),
            DestinationPool::with_cards(vec![], vec![], StdRng::seed_from_u64(2)),
            RulesConfig::with_seed(2),
        )
    }

    #[test]
    fn game_phase_to_json() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&GamePhase::Starting)?, r#""starting""#);
        assert_eq!(serde_json::to_string(&GamePhase::LastTurn)?, r#""last_turn""#);
        Ok(())
    }

    #[test]
    fn json_to_game_phase() -> serde_json::Result<()> {
        assert_eq!(
            serde_json::from_str::<GamePhase>(r#""playing""#)?,
            GamePhase::Playing
        );
        assert_eq!(serde_json::from_str::<GamePhase>(r#""done""#)?, GamePhase::Done);
        assert!(serde_json::from_str::<GamePhase>(r#""in_lobby""#).is_err());
        Ok(())
    }

    #[test]
    fn invalid_player_counts() {
        for names in [names(&["Alice"]), names(&["A", "B", "C", "D", "E", "F"])] {
            let num_players = names.len();
            assert_eq!(
                Session::new(names, RulesConfig::default(), ScriptedFrontend::default()).err(),
                Some(EngineError::Config(ConfigError::PlayerCount(num_players)))
            );
        }
    }

    #[test]
    fn duplicate_names() {
        assert_eq!(
            Session::new(
                names(&["Alice", "Bob", "Alice"]),
                RulesConfig::default(),
                ScriptedFrontend::default()
            )
            .err(),
            Some(EngineError::Config(ConfigError::DuplicateName(
                String::from("Alice")
            )))
        );
    }

    #[test]
    fn invalid_rules() {
        let rules = RulesConfig {
            final_round_threshold: 45,
            ..RulesConfig::default()
        };

        assert!(matches!(
            Session::new(names(&["Alice", "Bob"]), rules, ScriptedFrontend::default()),
            Err(EngineError::Config(ConfigError::InvalidRule {
                field: "final_round_threshold",
                ..
            }))
        ));
    }

    #[test]
    fn new_session_deals_initial_train_cards() {
        let session = Session::new(
            names(&["Alice", "Bob", "Carol"]),
            RulesConfig::with_seed(9),
            ScriptedFrontend::default(),
        )
        .unwrap();
        let game = session.game();

        assert_eq!(
            game.players()
                .iter()
                .map(|player| (player.color(), player.num_train_cards(), player.points()))
                .collect::<Vec<_>>(),
            vec![
                (PlayerColor::Yellow, 4, 12),
                (PlayerColor::Red, 4, 12),
                (PlayerColor::Blue, 4, 12)
            ]
        );
        assert_eq!(game.train_card_deck().get_open_train_card_deck().len(), 5);
        assert_eq!(game.num_train_cards_in_play(), 110);
        assert!(session.final_scores().is_empty());
    }

    #[test]
    fn sessions_with_the_same_seed_are_identical() {
        let first = Session::new(
            names(&["Alice", "Bob"]),
            RulesConfig::with_seed(4),
            ScriptedFrontend::default(),
        )
        .unwrap();
        let second = Session::new(
            names(&["Alice", "Bob"]),
            RulesConfig::with_seed(4),
            ScriptedFrontend::default(),
        )
        .unwrap();

        assert_eq!(
            first.game().train_card_deck().get_close_train_card_deck(),
            second.game().train_card_deck().get_close_train_card_deck()
        );
        assert_eq!(
            first.game().players()[0].train_cards(),
            second.game().players()[0].train_cards()
        );
    }

    #[test]
    fn initial_destination_cards_are_selected_in_turn_order() {
        let mut session = Session::new(
            names(&["Alice", "Bob"]),
            RulesConfig::with_seed(6),
            ScriptedFrontend::new(["", ""]),
        )
        .unwrap();

        session.select_initial_destination_cards().unwrap();
        let game = session.game();

        assert_eq!(game.phase(), GamePhase::Playing);
        assert_eq!(game.turn(), Some(0));
        assert_eq!(game.current_player(), 0);
        for player in game.players() {
            assert_eq!(player.destination_cards().len(), 4);
            assert_eq!(
                player
                    .destination_cards()
                    .iter()
                    .filter(|destination_card| destination_card.is_long())
                    .count(),
                1
            );
        }
        assert_eq!(game.destination_pool().get_long_destination_cards().len(), 4);
        assert_eq!(game.destination_pool().get_short_destination_cards().len(), 34);
        assert_eq!(
            game.log(),
            &[
                String::from("Alice selected 4 destination cards out of 4."),
                String::from("Bob selected 4 destination cards out of 4."),
            ]
        );
    }

    #[test]
    fn final_round_gives_one_turn_to_every_other_player() {
        let mut session = Session::from_game(
            game(smallvec![
                player(0, "Alice", 3, &[Black]),
                player(1, "Bob", 45, &[]),
                player(2, "Carol", 45, &[]),
            ]),
            ScriptedFrontend::new(["R1", "black", "deck", "deck", "deck", "deck"]),
        );

        let outcome = session.play_turn().unwrap();
        assert_eq!(outcome.action, TurnAction::ClaimRoute(RouteId(0)));
        assert_eq!(session.game().phase(), GamePhase::LastTurn);
        assert_eq!(session.final_round_triggered_by(), Some(0));
        assert!(session.game().players()[0].is_done_playing());

        session.play_turn().unwrap();
        assert_eq!(session.game().phase(), GamePhase::LastTurn);
        assert_eq!(session.game().current_player(), 2);

        session.play_turn().unwrap();
        assert_eq!(session.game().phase(), GamePhase::Done);
        assert_eq!(session.final_scores().len(), 3);
        assert!(session
            .game()
            .players()
            .iter()
            .all(Player::is_done_playing));

        assert_eq!(session.play_turn(), Err(EngineError::GameOver));
        assert_eq!(session.frontend().remaining_inputs(), 0);
    }

    #[test]
    fn final_scores() {
        let mut game = game(smallvec![
            player(0, "Alice", 45, &[]),
            player(1, "Bob", 45, &[]),
        ]);

        // Alice claims Brest - Paris.
        let claimed_route = game.get_mut_map().claim_route_for_player(RouteId(23), 0).unwrap();
        let alice = game.get_mut_player(0).unwrap();
        alice.record_claimed_route(claimed_route, 4);
        alice.add_destination_cards([
            destination(City::Brest, City::Paris, 5),
            destination(City::Paris, City::Wien, 8),
        ]);

        let final_scores = compute_final_scores(&game);

        assert_eq!(
            final_scores,
            vec![
                FinalScore {
                    player_id: 0,
                    name: String::from("Alice"),
                    points: 16,
                    destination_points: -3,
                    num_fulfilled_destinations: 1,
                    longest_route: 3,
                    european_express: true,
                    total: 23,
                },
                FinalScore {
                    player_id: 1,
                    name: String::from("Bob"),
                    points: 12,
                    destination_points: 0,
                    num_fulfilled_destinations: 0,
                    longest_route: 0,
                    european_express: false,
                    total: 12,
                },
            ]
        );
    }

    #[test]
    fn european_express_is_shared_on_ties() {
        let mut game = game(smallvec![
            player(0, "Alice", 45, &[]),
            player(1, "Bob", 45, &[]),
        ]);

        for (route_id, player_id) in [(RouteId(23), 0), (RouteId(58), 1)] {
            let claimed_route = game
                .get_mut_map()
                .claim_route_for_player(route_id, player_id)
                .unwrap();
            game.get_mut_player(player_id)
                .unwrap()
                .record_claimed_route(claimed_route, 4);
        }

        let final_scores = compute_final_scores(&game);

        assert!(final_scores.iter().all(|final_score| final_score.european_express));
        assert!(final_scores.iter().all(|final_score| final_score.total == 26));
    }

    #[test]
    fn stations_borrow_routes_of_other_players() {
        let mut game = game(smallvec![
            player(0, "Alice", 45, &[]),
            player(1, "Bob", 45, &[]),
        ]);

        // Alice claims Brest - Paris, Bob claims Frankfurt - Paris.
        for (route_id, player_id) in [(RouteId(23), 0), (RouteId(58), 1)] {
            let claimed_route = game
                .get_mut_map()
                .claim_route_for_player(route_id, player_id)
                .unwrap();
            game.get_mut_player(player_id)
                .unwrap()
                .record_claimed_route(claimed_route, 4);
        }
        game.get_mut_player(0)
            .unwrap()
            .add_destination_cards([destination(City::Brest, City::Frankfurt, 7)]);

        assert_eq!(compute_final_scores(&game)[0].destination_points, -7);

        // A station in Frankfurt lets Alice use Bob's route.
        game.get_mut_map().build_station(City::Frankfurt, 0).unwrap();
        game.get_mut_player(0)
            .unwrap()
            .record_station(City::Frankfurt, 4);

        let alice_score = &compute_final_scores(&game)[0];
        assert_eq!(alice_score.destination_points, 7);
        assert_eq!(alice_score.num_fulfilled_destinations, 1);
    }
}
