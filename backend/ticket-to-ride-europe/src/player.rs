use crate::card::TrainColor;
use crate::city::City;
use crate::destination::DestinationCard;
use crate::map::ClaimedRoute;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Every player has their own color.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayerColor {
    Yellow,
    Red,
    Blue,
    Green,
    Pink,
}

/// All the information about a player's current state, returned by [`Player::get_player_state`].
#[derive(Debug, PartialEq, Serialize)]
pub struct PlayerState<'a> {
    /// Encapsulates information that is visible to all players. Always populated!
    pub public_player_state: &'a PublicPlayerState,
    /// Encapsulates information that is *only* visible to the current player.
    /// Therefore, we only populate this if the request originated from the same player.
    pub private_player_state: Option<&'a PrivatePlayerState>,
}

/// Information about a player's state that is visible to all players.
#[derive(Debug, PartialEq, Serialize)]
pub struct PublicPlayerState {
    /// Position of the player in the turn order.
    pub id: usize,
    /// Unique to each player in the game.
    pub name: String,
    /// Unique to each player in the game.
    pub color: PlayerColor,
    /// Denotes whether the player is done playing.
    /// That is, once a player has two cars or less left, everyone has one turn left to play.
    pub is_done_playing: bool,
    /// The number of cars the player has left.
    /// This is the currency used, alongside train cards, to claim routes.
    pub cars: u8,
    /// The number of stations the player has left.
    pub stations: u8,
    /// How many points the player has so far.
    /// Unused stations are worth points from the start, and claiming routes or building stations
    /// grants more. Destinations and the longest path are only scored when the game is over.
    pub points: u16,
    /// List of routes claimed by the player.
    pub claimed_routes: Vec<ClaimedRoute>,
    /// Cities where the player built a station.
    pub built_stations: Vec<City>,
    /// How many train cards a player has, staged ones included.
    pub num_train_cards: u8,
    pub num_destination_cards: usize,
}

/// Information about a player's state that is only visible to that player.
#[derive(Debug, PartialEq, Serialize)]
pub struct PrivatePlayerState {
    /// Maps how many of a train color a player has in hand.
    /// It is guaranteed that the map has at all times key-value pairs for all train colors.
    pub train_cards: BTreeMap<TrainColor, u8>,
    /// Train cards taken out of the hand to pay for the action in progress.
    /// They go back to the hand if the action is declined, and to the discarded deck otherwise.
    pub staged_train_cards: SmallVec<[TrainColor; 8]>,
    /// Destination cards that the player has to fulfill.
    pub destination_cards: Vec<DestinationCard>,
}

/// Encapsulates all the player information.
///
/// A [`Player`] is not aware of other players in this game, nor of the rules deciding whether an
/// action is legal: this is the concern of the [`crate::turn::TurnEngine`].
#[derive(Debug)]
pub struct Player {
    public: PublicPlayerState,
    private: PrivatePlayerState,
}

impl Player {
    /// Creates a new player, with `cars` cars and `stations` stations left, and `points` points.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::player::{Player, PlayerColor};
    ///
    /// let player = Player::new(0, PlayerColor::Red, String::from("Alice"), 45, 3, 12);
    /// assert_eq!(player.cars(), 45);
    /// assert_eq!(player.points(), 12);
    /// assert_eq!(player.num_train_cards(), 0);
    /// ```
    pub fn new(
        id: usize,
        color: PlayerColor,
        name: String,
        cars: u8,
        stations: u8,
        points: u16,
    ) -> Self {
        Self {
            public: PublicPlayerState {
                id,
                name,
                color,
                is_done_playing: false,
                cars,
                stations,
                points,
                claimed_routes: Vec::new(),
                built_stations: Vec::new(),
                num_train_cards: 0,
                num_destination_cards: 0,
            },
            private: PrivatePlayerState {
                train_cards: TrainColor::iter().map(|color| (color, 0)).collect(),
                staged_train_cards: SmallVec::new(),
                destination_cards: Vec::new(),
            },
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.public.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.public.name
    }

    #[inline]
    pub fn color(&self) -> PlayerColor {
        self.public.color
    }

    #[inline]
    pub fn cars(&self) -> u8 {
        self.public.cars
    }

    #[inline]
    pub fn stations(&self) -> u8 {
        self.public.stations
    }

    #[inline]
    pub fn points(&self) -> u16 {
        self.public.points
    }

    #[inline]
    pub fn is_done_playing(&self) -> bool {
        self.public.is_done_playing
    }

    pub fn set_done_playing(&mut self) {
        self.public.is_done_playing = true;
    }

    /// Train cards in hand, staged ones excluded.
    #[inline]
    pub fn train_cards(&self) -> &BTreeMap<TrainColor, u8> {
        &self.private.train_cards
    }

    #[inline]
    pub fn num_train_cards_of(&self, color: TrainColor) -> u8 {
        self.private.train_cards.get(&color).copied().unwrap_or(0)
    }

    /// Number of train cards held, staged ones included.
    #[inline]
    pub fn num_train_cards(&self) -> u8 {
        self.public.num_train_cards
    }

    #[inline]
    pub fn staged_train_cards(&self) -> &[TrainColor] {
        &self.private.staged_train_cards
    }

    #[inline]
    pub fn destination_cards(&self) -> &[DestinationCard] {
        &self.private.destination_cards
    }

    #[inline]
    pub fn claimed_routes(&self) -> &[ClaimedRoute] {
        &self.public.claimed_routes
    }

    #[inline]
    pub fn built_stations(&self) -> &[City] {
        &self.public.built_stations
    }

    pub fn add_train_card(&mut self, color: TrainColor) {
        *self.private.train_cards.entry(color).or_insert(0) += 1;
        self.public.num_train_cards += 1;
    }

    /// Moves one card of the given color from the hand to the staged cards.
    pub fn stage_train_card(&mut self, color: TrainColor) -> Result<(), String> {
        match self.private.train_cards.get_mut(&color) {
            Some(num) if *num > 0 => {
                *num -= 1;
                self.private.staged_train_cards.push(color);
                Ok(())
            }
            _ => Err(format!(
                "{} has no {} train card left to stage.",
                self.public.name, color
            )),
        }
    }

    /// Puts every staged card back in the hand.
    pub fn unstage_train_cards(&mut self) {
        for color in self.private.staged_train_cards.drain(..) {
            *self.private.train_cards.entry(color).or_insert(0) += 1;
        }
    }

    /// Removes the staged cards from the player, so that they can be discarded.
    pub fn take_staged_train_cards(&mut self) -> SmallVec<[TrainColor; 8]> {
        let staged_train_cards = std::mem::take(&mut self.private.staged_train_cards);
        self.public.num_train_cards -= staged_train_cards.len() as u8;

        staged_train_cards
    }

    /// Records a route claimed by the player, spending one car per unit of length.
    ///
    /// # Panics
    /// If the player does not have enough cars left.
    pub fn record_claimed_route(&mut self, claimed_route: ClaimedRoute, points: u16) {
        assert!(self.public.cars >= claimed_route.length);

        self.public.cars -= claimed_route.length;
        self.public.points += points;
        self.public.claimed_routes.push(claimed_route);
    }

    /// Records a station built by the player.
    ///
    /// # Panics
    /// If the player does not have any station left.
    pub fn record_station(&mut self, city: City, points: u16) {
        assert!(self.public.stations > 0);

        self.public.stations -= 1;
        self.public.points += points;
        self.public.built_stations.push(city);
    }

    pub fn add_destination_cards(
        &mut self,
        destination_cards: impl IntoIterator<Item = DestinationCard>,
    ) {
        self.private.destination_cards.extend(destination_cards);
        self.public.num_destination_cards = self.private.destination_cards.len();
    }

    pub(crate) fn drew_open_train_card_description(
        &self,
        card: TrainColor,
        reset: bool,
    ) -> String {
        if reset {
            format!(
                "{} drew a {} train card from the open deck. The open deck was then reset because there were three wild cards.",
                self.public.name, card
            )
        } else {
            format!(
                "{} drew a {} train card from the open deck.",
                self.public.name, card
            )
        }
    }

    pub(crate) fn drew_close_train_card_description(&self) -> String {
        format!(
            "{} drew a train card from the close deck.",
            self.public.name
        )
    }

    pub(crate) fn selected_destination_cards_description(
        &self,
        num_kept: usize,
        num_drawn: usize,
    ) -> String {
        format!(
            "{} selected {} destination cards out of {}.",
            self.public.name, num_kept, num_drawn
        )
    }

    pub(crate) fn claimed_route_description(
        &self,
        claimed_route: &ClaimedRoute,
        points: u16,
        paid: &[TrainColor],
    ) -> String {
        let (start, end) = claimed_route.route;
        format!(
            "{} has claimed a route between {} and {} of length {} ({} points). They did so using {}.",
            self.public.name,
            start,
            end,
            claimed_route.length,
            points,
            Self::cards_used_description(paid)
        )
    }

    pub(crate) fn built_station_description(&self, city: City, paid: &[TrainColor]) -> String {
        format!(
            "{} has built a station in {}. They did so using {}.",
            self.public.name,
            city,
            Self::cards_used_description(paid)
        )
    }

    pub(crate) fn passed_description(&self) -> String {
        format!("{} could not do anything, and passed.", self.public.name)
    }

    fn cards_used_description(paid: &[TrainColor]) -> String {
        let num_wild_cards = paid.iter().filter(|card| card.is_wild()).count();
        let non_wild_cards = paid
            .iter()
            .find(|card| card.is_not_wild())
            .map(|color| (color, paid.len() - num_wild_cards));

        match (num_wild_cards, non_wild_cards) {
            (num_wild_cards, Some((color, num_non_wild_cards))) if num_wild_cards > 0 => {
                format!(
                    "{} wild cards and {} {} cards",
                    num_wild_cards, num_non_wild_cards, color
                )
            }
            (_, Some((color, num_non_wild_cards))) => {
                format!("{} {} cards", num_non_wild_cards, color)
            }
            (num_wild_cards, None) => format!("{} wild cards", num_wild_cards),
        }
    }

    /// Retrieve the player's state, which encapsulates both [`PublicPlayerState`] and [`PrivatePlayerState`].
    ///
    /// If the given `player_id` is not the same as the current player, only the public state will be populated --
    /// the private state will be left to `None`.
    /// Otherwise, both public and private states are populated.
    pub fn get_player_state(&self, player_id: usize) -> PlayerState {
        let private_player_state = if self.public.id == player_id {
            Some(&self.private)
        } else {
            None
        };

        PlayerState {
            public_player_state: &self.public,
            private_player_state,
        }
    }
}
