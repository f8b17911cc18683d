use crate::card::TrainColor;
use crate::city::City;
use crate::decision::{request_choice, Frontend, Prompt};
use crate::destination::{DestinationCard, NUM_DRAWN_DESTINATION_CARDS};
use crate::error::EngineError;
use crate::game_state::Game;
use crate::map::{Route, RouteId};
use crate::payment::Cost;
use crate::player::Player;

use log::debug;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Token of the close deck, when drawing train cards.
pub const DECK_TOKEN: &str = "deck";
/// Token of the *draw destinations* action.
pub const DESTINATIONS_TOKEN: &str = "destinations";
/// Number of cards revealed when claiming a tunnel.
pub const NUM_TUNNEL_REVEALED_CARDS: usize = 3;
/// Destination cards a player must keep after drawing new ones during their turn.
const MIN_DESTINATION_CARDS_KEPT: usize = 1;

/// All actions resolved by the turn engine have the same `Result`:
///
/// * Either it succeeded, which we mark with an empty tuple.
/// * Or it was declined, which includes a human-readable reason.
pub type ActionResult = Result<(), String>;

/// Top-level actions a player can pick at the start of their turn.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TurnAction {
    DrawOpenTrainCard(TrainColor),
    DrawCloseTrainCard,
    DrawDestinationCards,
    BuildStation(City),
    ClaimRoute(RouteId),
    /// Only happens when nothing else can be done.
    Pass,
}

impl TurnAction {
    /// The token standing for this action in a [`Prompt`].
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::card::TrainColor;
    /// use ticket_to_ride_europe::city::City;
    /// use ticket_to_ride_europe::map::RouteId;
    /// use ticket_to_ride_europe::turn::TurnAction;
    ///
    /// assert_eq!(TurnAction::DrawOpenTrainCard(TrainColor::Wild).token(), "wild");
    /// assert_eq!(TurnAction::DrawCloseTrainCard.token(), "deck");
    /// assert_eq!(TurnAction::BuildStation(City::Zurich).token(), "Zürich");
    /// assert_eq!(TurnAction::ClaimRoute(RouteId(41)).token(), "R42");
    /// assert_eq!(TurnAction::Pass.token(), "");
    /// ```
    pub fn token(&self) -> String {
        match self {
            Self::DrawOpenTrainCard(color) => color.to_string(),
            Self::DrawCloseTrainCard => DECK_TOKEN.to_string(),
            Self::DrawDestinationCards => DESTINATIONS_TOKEN.to_string(),
            Self::BuildStation(city) => city.to_string(),
            Self::ClaimRoute(route_id) => route_id.to_string(),
            Self::Pass => String::new(),
        }
    }

    /// Whether this action is picked on the board rather than with a button.
    fn is_on_map(&self) -> bool {
        matches!(self, Self::BuildStation(_) | Self::ClaimRoute(_))
    }
}

/// States of a turn, which act as nodes in the turn's finite-state machine.
///
/// Every turn starts with [`TurnPhase::ChoosingAction`] and ends with [`TurnPhase::Complete`].
/// A declined action goes back to [`TurnPhase::ChoosingAction`], for the same player.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnPhase {
    ChoosingAction,
    /// The first train card was drawn, and it was not an open wild card.
    DrawingTrainCards,
    DrawingDestinations,
    BuildingStation(City),
    ClaimingRoute(RouteId),
    Complete,
}

/// How a turn went.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TurnOutcome {
    /// The action that completed the turn.
    pub action: TurnAction,
    /// How many actions were declined before that.
    pub num_declined: usize,
}

/// Plays a single turn of the current player, asking them every decision through a [`Frontend`].
///
/// Only the current player, and the shared map and decks, are mutated.
pub struct TurnEngine<'a, F: Frontend + ?Sized> {
    game: &'a mut Game,
    frontend: &'a mut F,
    player_id: usize,
    num_declined: usize,
}

impl<'a, F: Frontend + ?Sized> TurnEngine<'a, F> {
    pub fn new(game: &'a mut Game, frontend: &'a mut F) -> Self {
        let player_id = game.current_player;

        Self {
            game,
            frontend,
            player_id,
            num_declined: 0,
        }
    }

    /// Every action the current player can take right now.
    ///
    /// An empty list means that the player has to pass.
    pub fn legal_actions(&self) -> Vec<TurnAction> {
        let player = self.player();
        let train_card_deck = &self.game.train_card_deck;
        let map = &self.game.map;

        let open_colors: BTreeSet<TrainColor> = train_card_deck
            .get_open_train_card_deck()
            .iter()
            .copied()
            .collect();
        let mut actions: Vec<TurnAction> = open_colors
            .into_iter()
            .map(TurnAction::DrawOpenTrainCard)
            .collect();

        if train_card_deck.can_draw_close_card() {
            actions.push(TurnAction::DrawCloseTrainCard);
        }

        if !self
            .game
            .destination_pool
            .get_short_destination_cards()
            .is_empty()
        {
            actions.push(TurnAction::DrawDestinationCards);
        }

        if let Some(cost) = Cost::station(player.stations()) {
            if cost.is_payable(player.train_cards()) {
                actions.extend(map.free_cities().map(TurnAction::BuildStation));
            }
        }

        actions.extend(
            map.unclaimed_routes()
                .filter(|route| {
                    player.cars() >= route.length
                        && Cost::route(route).is_payable(player.train_cards())
                })
                .map(|route| TurnAction::ClaimRoute(route.id)),
        );

        actions
    }

    /// Plays the turn until an action completes.
    ///
    /// # Panics
    /// If the player has staged cards at the start or at the end of the turn,
    /// or if train cards appeared or vanished.
    pub fn play_turn(mut self) -> Result<TurnOutcome, EngineError> {
        assert!(self.player().staged_train_cards().is_empty());

        let mut phase = TurnPhase::ChoosingAction;
        let mut action = TurnAction::Pass;

        loop {
            phase = match phase {
                TurnPhase::ChoosingAction => {
                    action = self.choose_action()?;
                    self.start_action(action)
                }
                TurnPhase::DrawingTrainCards => {
                    self.draw_second_train_card()?;
                    TurnPhase::Complete
                }
                TurnPhase::DrawingDestinations => {
                    let result = self.draw_destination_cards()?;
                    self.resolve(result)
                }
                TurnPhase::BuildingStation(city) => {
                    let result = self.build_station(city)?;
                    self.resolve(result)
                }
                TurnPhase::ClaimingRoute(route_id) => {
                    let result = self.claim_route(route_id)?;
                    self.resolve(result)
                }
                TurnPhase::Complete => break,
            };
        }

        assert!(self.player().staged_train_cards().is_empty());
        self.game.assert_train_cards_conserved();

        Ok(TurnOutcome {
            action,
            num_declined: self.num_declined,
        })
    }

    /// Asks the player to keep some of `destination_cards`, and gives the others back to the pool.
    ///
    /// Declining is only offered while more than `min_kept` cards are kept.
    pub(crate) fn select_destination_cards(
        &mut self,
        mut destination_cards: Vec<DestinationCard>,
        min_kept: usize,
    ) -> Result<Vec<DestinationCard>, EngineError> {
        let mut declined_destination_cards = Vec::new();

        while destination_cards.len() > min_kept {
            let prompt = Prompt::new(format!(
                "{}, select a destination card to give back, or pass to keep the remaining ones. At least {} must be kept.",
                self.player().name(),
                min_kept
            ))
            .with_selectable(destination_cards.iter().map(DestinationCard::name))
            .passable();

            let choice = self.ask(prompt)?;
            match destination_cards
                .iter()
                .position(|destination_card| destination_card.name() == choice)
            {
                Some(index) => declined_destination_cards.push(destination_cards.remove(index)),
                None => break,
            }
        }

        self.game
            .destination_pool
            .return_declined(declined_destination_cards);

        Ok(destination_cards)
    }

    fn player(&self) -> &Player {
        &self.game.players[self.player_id]
    }

    fn player_mut(&mut self) -> &mut Player {
        &mut self.game.players[self.player_id]
    }

    /// Renders the latest state to the player, and waits for their decision.
    fn ask(&mut self, prompt: Prompt) -> Result<String, EngineError> {
        let snapshot = self.game.get_state(self.player_id);
        request_choice(&mut *self.frontend, &snapshot, &prompt)
    }

    fn choose_action(&mut self) -> Result<TurnAction, EngineError> {
        let actions: BTreeMap<String, TurnAction> = self
            .legal_actions()
            .into_iter()
            .map(|action| (action.token(), action))
            .collect();

        let mut prompt = Prompt::new(format!(
            "{}, it is your turn: draw train cards, draw destinations, build a station or claim a route.",
            self.player().name()
        ));
        for (token, action) in &actions {
            if action.is_on_map() {
                prompt.selectable.insert(token.clone());
            } else {
                prompt.buttons.insert(token.clone());
            }
        }

        let choice = self.ask(prompt)?;

        // Nothing offered means an empty choice, which is a pass.
        Ok(actions.get(&choice).copied().unwrap_or(TurnAction::Pass))
    }

    fn start_action(&mut self, action: TurnAction) -> TurnPhase {
        match action {
            TurnAction::DrawOpenTrainCard(color) => match self.take_open_train_card(color) {
                // An open wild card is a whole turn on its own.
                Ok(()) if color.is_wild() => TurnPhase::Complete,
                Ok(()) => TurnPhase::DrawingTrainCards,
                Err(reason) => self.decline(reason),
            },
            TurnAction::DrawCloseTrainCard => match self.draw_close_train_card() {
                Ok(()) => TurnPhase::DrawingTrainCards,
                Err(reason) => self.decline(reason),
            },
            TurnAction::DrawDestinationCards => TurnPhase::DrawingDestinations,
            TurnAction::BuildStation(city) => TurnPhase::BuildingStation(city),
            TurnAction::ClaimRoute(route_id) => TurnPhase::ClaimingRoute(route_id),
            TurnAction::Pass => {
                let description = self.player().passed_description();
                self.game.push_log(description);
                TurnPhase::Complete
            }
        }
    }

    fn resolve(&mut self, result: ActionResult) -> TurnPhase {
        match result {
            Ok(()) => TurnPhase::Complete,
            Err(reason) => self.decline(reason),
        }
    }

    /// Gives the staged cards back, and lets the player choose another action.
    fn decline(&mut self, reason: String) -> TurnPhase {
        debug!(
            "Declined an action of {}: {}",
            self.player().name(),
            reason
        );

        self.player_mut().unstage_train_cards();
        self.num_declined += 1;
        self.game.push_log(reason);

        TurnPhase::ChoosingAction
    }

    fn take_open_train_card(&mut self, color: TrainColor) -> ActionResult {
        let was_reset = self
            .game
            .train_card_deck
            .take_open(color)
            .map_err(|err| err.to_string())?;

        let player = &mut self.game.players[self.player_id];
        player.add_train_card(color);
        let description = player.drew_open_train_card_description(color, was_reset);
        self.game.push_log(description);

        Ok(())
    }

    fn draw_close_train_card(&mut self) -> ActionResult {
        let train_card = self
            .game
            .train_card_deck
            .draw()
            .map_err(|err| err.to_string())?;

        let player = &mut self.game.players[self.player_id];
        player.add_train_card(train_card);
        let description = player.drew_close_train_card_description();
        self.game.push_log(description);

        Ok(())
    }

    /// Draws the second train card of the turn, if any is left.
    ///
    /// Open wild cards cannot be picked as a second card.
    fn draw_second_train_card(&mut self) -> Result<(), EngineError> {
        let train_card_deck = &self.game.train_card_deck;
        if !train_card_deck.can_player_draw_again_this_turn() {
            return Ok(());
        }

        let mut buttons: BTreeSet<String> = train_card_deck
            .get_open_train_card_deck()
            .iter()
            .filter(|train_card| train_card.is_not_wild())
            .map(ToString::to_string)
            .collect();
        if train_card_deck.can_draw_close_card() {
            buttons.insert(DECK_TOKEN.to_string());
        }

        let prompt = Prompt::new(format!(
            "{}, draw a second train card: either a non-wild card from the open deck, or a card from the close deck.",
            self.player().name()
        ))
        .with_buttons(buttons);

        let choice = self.ask(prompt)?;
        let result = if choice == DECK_TOKEN {
            self.draw_close_train_card()
        } else {
            choice
                .parse::<TrainColor>()
                .map_err(|_| format!("There is no {} train card to draw.", choice))
                .and_then(|color| self.take_open_train_card(color))
        };

        // Whatever happens, the turn is over.
        if let Err(reason) = result {
            debug!("No second train card was drawn: {}", reason);
            self.game.push_log(reason);
        }

        Ok(())
    }

    fn draw_destination_cards(&mut self) -> Result<ActionResult, EngineError> {
        let destination_cards = self
            .game
            .destination_pool
            .draw_for_action(NUM_DRAWN_DESTINATION_CARDS);
        if destination_cards.is_empty() {
            return Ok(Err(String::from("There are no destination cards left.")));
        }

        let num_drawn = destination_cards.len();
        let kept_destination_cards =
            self.select_destination_cards(destination_cards, MIN_DESTINATION_CARDS_KEPT)?;

        let player = &mut self.game.players[self.player_id];
        let description =
            player.selected_destination_cards_description(kept_destination_cards.len(), num_drawn);
        player.add_destination_cards(kept_destination_cards);
        self.game.push_log(description);

        Ok(Ok(()))
    }

    fn build_station(&mut self, city: City) -> Result<ActionResult, EngineError> {
        let cost = match Cost::station(self.player().stations()) {
            Some(cost) => cost,
            None => {
                return Ok(Err(format!(
                    "{} has no station left to build.",
                    self.player().name()
                )))
            }
        };

        if self.game.map.station_owner(city).is_some() {
            return Ok(Err(format!("A station is already built in {}.", city)));
        }

        if !self.stage_train_cards(cost, &format!("a station in {}", city))? {
            return Ok(Err(format!(
                "{} did not pay for a station in {}.",
                self.player().name(),
                city
            )));
        }

        if let Err(reason) = self.game.map.build_station(city, self.player_id) {
            return Ok(Err(reason));
        }

        let station_value = self.game.rules.station_value;
        let player = &mut self.game.players[self.player_id];
        let paid = player.take_staged_train_cards();
        player.record_station(city, station_value);
        let description = player.built_station_description(city, &paid);

        self.game.train_card_deck.discard_train_cards(paid);
        self.game.push_log(description);

        Ok(Ok(()))
    }

    fn claim_route(&mut self, route_id: RouteId) -> Result<ActionResult, EngineError> {
        let route = match self.game.map.get_route(route_id) {
            Some(route) => route.clone(),
            None => return Ok(Err(format!("No route {} exists.", route_id))),
        };
        let (start, end) = route.cities;

        if route.claimer().is_some() {
            return Ok(Err(format!(
                "Route {} between {} and {} is already claimed.",
                route_id, start, end
            )));
        }

        if self.player().cars() < route.length {
            return Ok(Err(format!(
                "{} does not have enough cars left to claim the route between {} and {}.",
                self.player().name(),
                start,
                end
            )));
        }

        let route_description = format!("the route between {} and {}", start, end);
        if !self.stage_train_cards(Cost::route(&route), &route_description)? {
            return Ok(Err(format!(
                "{} did not pay for {}.",
                self.player().name(),
                route_description
            )));
        }

        if route.is_tunnel() {
            let num_extra_cards = self.reveal_tunnel_cards(&route);

            if num_extra_cards > 0 {
                let surcharge = Cost::tunnel_surcharge(
                    &route,
                    num_extra_cards,
                    self.player().staged_train_cards(),
                );

                if !self.stage_train_cards(
                    surcharge,
                    &format!("the extra cards of {}", route_description),
                )? {
                    return Ok(Err(format!(
                        "{} could not pay the {} extra cards of the tunnel between {} and {}.",
                        self.player().name(),
                        num_extra_cards,
                        start,
                        end
                    )));
                }
            }
        }

        let claimed_route = match self.game.map.claim_route_for_player(route_id, self.player_id) {
            Ok(claimed_route) => claimed_route,
            Err(reason) => return Ok(Err(reason)),
        };

        let points = route.points();
        let player = &mut self.game.players[self.player_id];
        let paid = player.take_staged_train_cards();
        let description = player.claimed_route_description(&claimed_route, points, &paid);
        player.record_claimed_route(claimed_route, points);

        self.game.train_card_deck.discard_train_cards(paid);
        self.game.push_log(description);

        Ok(Ok(()))
    }

    /// Reveals the top cards of the close deck, and discards them.
    ///
    /// Returns how many extra cards the tunnel costs: one per revealed card of the route's color,
    /// or one per revealed wild card for a gray tunnel.
    fn reveal_tunnel_cards(&mut self, route: &Route) -> u8 {
        let train_card_deck = &mut self.game.train_card_deck;

        // All cards are revealed before any is discarded, so that a reshuffle cannot reveal them twice.
        let revealed: SmallVec<[TrainColor; NUM_TUNNEL_REVEALED_CARDS]> = (0
            ..NUM_TUNNEL_REVEALED_CARDS)
            .map_while(|_| train_card_deck.draw().ok())
            .collect();
        train_card_deck.discard_train_cards(revealed.iter().copied());

        let num_extra_cards = revealed
            .iter()
            .filter(|train_card| **train_card == route.train_color)
            .count() as u8;

        debug!(
            "Tunnel {} revealed {:?}, costing {} extra cards.",
            route.id, revealed, num_extra_cards
        );

        let revealed_description = if revealed.is_empty() {
            String::from("no card")
        } else {
            revealed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.game.push_log(format!(
            "The tunnel between {} and {} revealed {}: {} extra cards are needed.",
            route.cities.0, route.cities.1, revealed_description, num_extra_cards
        ));

        num_extra_cards
    }

    /// Asks the player to stage train cards until `cost` is paid.
    ///
    /// Only colors that keep the cost payable are offered. Returns `false` if the player passed,
    /// or if nothing can be staged anymore. Cards staged earlier in the action are left untouched.
    fn stage_train_cards(&mut self, cost: Cost, purpose: &str) -> Result<bool, EngineError> {
        let num_staged_before = self.player().staged_train_cards().len();

        loop {
            let player = self.player();
            let staged = &player.staged_train_cards()[num_staged_before..];
            if cost.is_paid(staged) {
                return Ok(true);
            }

            let selectable = cost.selectable_colors(player.train_cards(), staged);
            if selectable.is_empty() {
                return Ok(false);
            }

            let prompt = Prompt::new(format!(
                "{}, select train card {} of {} to pay for {}, or pass to cancel.",
                player.name(),
                staged.len() + 1,
                cost.num_cards,
                purpose
            ))
            .with_buttons(selectable.iter().map(ToString::to_string))
            .passable();

            let choice = self.ask(prompt)?;
            let color = match choice.parse::<TrainColor>() {
                Ok(color) if selectable.contains(&color) => color,
                _ => return Ok(false),
            };

            if self.player_mut().stage_train_card(color).is_err() {
                return Ok(false);
            }
        }
    }
}
