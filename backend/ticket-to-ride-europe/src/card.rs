use crate::error::DeckError;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::iter::repeat;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Number of train cards openly displayed, when enough cards are left.
pub const NUM_OPEN_TRAIN_CARDS: usize = 5;
/// Total number of train cards in a game, across all decks and hands.
pub const NUM_TRAIN_CARDS: usize = NUM_WILD_CARDS + 8 * NUM_NON_WILD_CARDS;
const NUM_WILD_CARDS: usize = 14;
const NUM_NON_WILD_CARDS: usize = 12;
const WILD_CARD_LIMIT: usize = 3;
/// With only 3 non-wild cards among 17 cards left, fewer than 2% of layouts are valid,
/// so resets are bounded well beyond the number of cards left.
const MAX_OPEN_TRAIN_CARD_DECK_RESETS: usize = 1000;

/// Represents the different variants of train cards.
///
/// On a route, `Wild` stands for a gray route, which can be paid with any single color.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrainColor {
    Black,
    Blue,
    Green,
    Orange,
    Pink,
    Red,
    White,
    /// Also known as the *Locomotive*.
    /// This is a special train that matches with any color.
    Wild,
    Yellow,
}

impl TrainColor {
    /// Whether the current color is wild, i.e. matches with any color.
    ///
    /// # Examples:
    /// ```
    /// use ticket_to_ride_europe::card::TrainColor;
    ///
    /// let color = TrainColor::Black;
    /// assert!(!color.is_wild());
    ///
    /// let wild_color = TrainColor::Wild;
    /// assert!(wild_color.is_wild());
    /// ```
    #[inline]
    pub fn is_wild(&self) -> bool {
        *self == TrainColor::Wild
    }

    /// Whether the current color is not wild, i.e. a regular color.
    ///
    /// # Examples:
    /// ```
    /// use ticket_to_ride_europe::card::TrainColor;
    ///
    /// let color = TrainColor::Black;
    /// assert!(color.is_not_wild());
    ///
    /// let wild_color = TrainColor::Wild;
    /// assert!(!wild_color.is_not_wild());
    /// ```
    #[inline]
    pub fn is_not_wild(&self) -> bool {
        !self.is_wild()
    }

    /// Iterates over the eight regular colors.
    pub fn non_wild_colors() -> impl Iterator<Item = TrainColor> {
        TrainColor::iter().filter(TrainColor::is_not_wild)
    }
}

/// Read-only view of the train card decks, as shown to every player.
#[derive(Debug, Serialize)]
pub struct TrainCardDeckState<'a> {
    open_train_card_deck: &'a [TrainColor],
    close_train_card_deck_size: usize,
    discarded_train_card_deck: &'a [TrainColor],
}

/// The three piles of train cards: the hidden close deck, the open deck, and the discarded deck.
///
/// Cards never leave the game: the sum of the cards in the three piles and in the players' hands
/// stays at [`NUM_TRAIN_CARDS`].
#[derive(Debug)]
pub struct TrainCardDeck {
    open_train_card_deck: SmallVec<[TrainColor; NUM_OPEN_TRAIN_CARDS]>,
    close_train_card_deck: Vec<TrainColor>,
    discarded_train_card_deck: Vec<TrainColor>,
    rng: StdRng,
}

impl TrainCardDeck {
    /// Creates a new `TrainCardDeck` with all 110 train cards shuffled in the close deck.
    ///
    /// The open deck starts empty, so that initial hands can be dealt first. Call
    /// [`TrainCardDeck::refill_open_train_card_deck`] to lay it out.
    ///
    /// # Example
    /// ```
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use ticket_to_ride_europe::card::TrainCardDeck;
    ///
    /// let mut train_card_deck = TrainCardDeck::new(StdRng::seed_from_u64(42));
    /// assert_eq!(train_card_deck.get_close_train_card_deck().len(), 110);
    ///
    /// train_card_deck.refill_open_train_card_deck();
    /// assert_eq!(train_card_deck.get_open_train_card_deck().len(), 5);
    /// ```
    pub fn new(mut rng: StdRng) -> Self {
        let mut all_train_cards = Vec::with_capacity(NUM_TRAIN_CARDS);

        for color in TrainColor::iter() {
            let num_of_train_cards_per_color = if color.is_wild() {
                NUM_WILD_CARDS
            } else {
                NUM_NON_WILD_CARDS
            };
            all_train_cards.extend(repeat(color).take(num_of_train_cards_per_color));
        }

        all_train_cards.shuffle(&mut rng);

        Self {
            open_train_card_deck: SmallVec::new(),
            close_train_card_deck: all_train_cards,
            discarded_train_card_deck: Vec::new(),
            rng,
        }
    }

    /// Creates a `TrainCardDeck` from explicit piles, used to set up specific situations.
    ///
    /// The top of the close deck is the *last* card. The open deck is taken as is, without refill.
    ///
    /// # Panics
    /// If more than 5 cards are given for the open deck.
    pub fn with_piles(
        close_train_card_deck: Vec<TrainColor>,
        open_train_card_deck: Vec<TrainColor>,
        discarded_train_card_deck: Vec<TrainColor>,
        rng: StdRng,
    ) -> Self {
        assert!(open_train_card_deck.len() <= NUM_OPEN_TRAIN_CARDS);

        Self {
            open_train_card_deck: open_train_card_deck.into_iter().collect(),
            close_train_card_deck,
            discarded_train_card_deck,
            rng,
        }
    }

    /// Draws from the top of the close train card deck, and returns the card.
    ///
    /// If the close deck is empty, the discarded deck is shuffled and becomes the close deck first.
    /// If both are empty, returns [`DeckError::Exhausted`]: this is a normal outcome.
    ///
    /// # Example
    /// ```
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use ticket_to_ride_europe::card::{TrainCardDeck, TrainColor};
    /// use ticket_to_ride_europe::error::DeckError;
    ///
    /// let mut train_card_deck = TrainCardDeck::with_piles(
    ///     vec![],
    ///     vec![],
    ///     vec![TrainColor::Red],
    ///     StdRng::seed_from_u64(0),
    /// );
    ///
    /// assert_eq!(train_card_deck.draw(), Ok(TrainColor::Red));
    /// assert_eq!(train_card_deck.draw(), Err(DeckError::Exhausted));
    /// ```
    pub fn draw(&mut self) -> Result<TrainColor, DeckError> {
        if self.close_train_card_deck.is_empty() {
            self.reshuffle_discarded_deck();
        }

        self.close_train_card_deck.pop().ok_or(DeckError::Exhausted)
    }

    /// Adds the given train card to the discarded deck.
    ///
    /// If the open deck is missing cards, which only happens once the close deck is empty,
    /// the card goes straight back to the open deck.
    pub fn discard(&mut self, train_card: TrainColor) {
        self.discarded_train_card_deck.push(train_card);

        if self.open_train_card_deck.len() < NUM_OPEN_TRAIN_CARDS
            && self.close_train_card_deck.is_empty()
        {
            self.refill_open_train_card_deck();
        }
    }

    /// Discards every given train card, in order.
    pub fn discard_train_cards(&mut self, train_cards: impl IntoIterator<Item = TrainColor>) {
        for train_card in train_cards {
            self.discard(train_card);
        }
    }

    /// Takes one card of the given color from the open deck, then refills the open deck.
    ///
    /// Returns whether the open deck had to be reset because of too many wild cards.
    ///
    /// # Example
    /// ```
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use ticket_to_ride_europe::card::{TrainCardDeck, TrainColor};
    ///
    /// let mut train_card_deck = TrainCardDeck::with_piles(
    ///     vec![TrainColor::Green],
    ///     vec![TrainColor::Blue, TrainColor::Red],
    ///     vec![],
    ///     StdRng::seed_from_u64(0),
    /// );
    ///
    /// assert!(train_card_deck.take_open(TrainColor::Black).is_err());
    /// assert_eq!(train_card_deck.take_open(TrainColor::Red), Ok(false));
    /// assert_eq!(
    ///     train_card_deck.get_open_train_card_deck(),
    ///     &[TrainColor::Blue, TrainColor::Green]
    /// );
    /// ```
    pub fn take_open(&mut self, color: TrainColor) -> Result<bool, DeckError> {
        let index = self
            .open_train_card_deck
            .iter()
            .position(|train_card| *train_card == color)
            .ok_or(DeckError::NotDisplayed(color))?;

        self.open_train_card_deck.remove(index);

        Ok(self.refill_open_train_card_deck())
    }

    /// Fills the open deck up to 5 cards, as long as cards are left in the close or discarded decks.
    ///
    /// If the open deck ends up with 3 wild cards or more, it is moved to the discarded deck and
    /// refilled again, as long as enough non-wild cards exist to make that worthwhile.
    ///
    /// Returns whether the open deck was reset at least once.
    pub fn refill_open_train_card_deck(&mut self) -> bool {
        let mut was_reset = false;
        let mut resets_left = MAX_OPEN_TRAIN_CARD_DECK_RESETS;

        loop {
            while self.open_train_card_deck.len() < NUM_OPEN_TRAIN_CARDS {
                match self.draw() {
                    Ok(train_card) => self.open_train_card_deck.push(train_card),
                    Err(_) => break,
                }
            }

            if resets_left == 0 || !self.should_reset_open_train_card_deck() {
                break;
            }

            resets_left -= 1;
            debug!(
                "Resetting the open deck {:?}, which holds too many wild cards.",
                self.open_train_card_deck
            );
            self.discarded_train_card_deck
                .extend(self.open_train_card_deck.drain(..));
            was_reset = true;
        }

        assert!(self.open_train_card_deck.len() <= NUM_OPEN_TRAIN_CARDS);

        was_reset
    }

    fn should_reset_open_train_card_deck(&self) -> bool {
        let num_wild_cards_in_open_train_card_deck = self
            .open_train_card_deck
            .iter()
            .filter(|train_card| train_card.is_wild())
            .count();

        // If there is less than 3 wild cards in the open deck, then we should not reset.
        if num_wild_cards_in_open_train_card_deck < WILD_CARD_LIMIT {
            return false;
        }

        // Otherwise, we should reset as long as there is at least 3 non-wild card in any decks.
        // If we did not verify that, we could end up resetting ad infinitum.
        self.open_train_card_deck
            .iter()
            .chain(&self.close_train_card_deck)
            .chain(&self.discarded_train_card_deck)
            .filter(|train_card| train_card.is_not_wild())
            .nth(WILD_CARD_LIMIT - 1)
            .is_some()
    }

    fn reshuffle_discarded_deck(&mut self) {
        if self.discarded_train_card_deck.is_empty() {
            return;
        }

        debug!(
            "Reshuffling {} discarded train cards into the close deck.",
            self.discarded_train_card_deck.len()
        );
        self.discarded_train_card_deck.shuffle(&mut self.rng);
        std::mem::swap(
            &mut self.close_train_card_deck,
            &mut self.discarded_train_card_deck,
        );
    }

    /// Whether a card can still be drawn from the close deck, possibly after a reshuffle.
    #[inline]
    pub fn can_draw_close_card(&self) -> bool {
        !self.close_train_card_deck.is_empty() || !self.discarded_train_card_deck.is_empty()
    }

    /// Predicate that determines whether a player should be allowed to draw a train card again this turn.
    ///
    /// Wild cards of the open deck cannot be picked as a second card, so if the only cards left are
    /// open wild cards, the player cannot draw again and their turn ends earlier.
    #[inline]
    pub fn can_player_draw_again_this_turn(&self) -> bool {
        self.can_draw_close_card()
            || self
                .open_train_card_deck
                .iter()
                .any(|train_card| train_card.is_not_wild())
    }

    /// Number of cards across the three decks, excluding the players' hands.
    #[inline]
    pub fn num_cards_in_decks(&self) -> usize {
        self.open_train_card_deck.len()
            + self.close_train_card_deck.len()
            + self.discarded_train_card_deck.len()
    }

    pub fn get_open_train_card_deck(&self) -> &[TrainColor] {
        &self.open_train_card_deck
    }

    pub fn get_close_train_card_deck(&self) -> &[TrainColor] {
        &self.close_train_card_deck
    }

    pub fn get_discarded_train_card_deck(&self) -> &[TrainColor] {
        &self.discarded_train_card_deck
    }

    pub fn get_state(&self) -> TrainCardDeckState {
        TrainCardDeckState {
            open_train_card_deck: &self.open_train_card_deck,
            close_train_card_deck_size: self.close_train_card_deck.len(),
            discarded_train_card_deck: &self.discarded_train_card_deck,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use std::collections::HashMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn num_wild_cards(train_cards: &[TrainColor]) -> usize {
        train_cards.iter().filter(|color| color.is_wild()).count()
    }

    // Tests for `TrainColor`.

    #[test]
    fn train_color_to_string() {
        assert_eq!(TrainColor::Orange.to_string(), "orange");
        assert_eq!(TrainColor::Wild.to_string(), "wild");
    }

    #[test]
    fn string_to_train_color() {
        assert_eq!("pink".parse::<TrainColor>(), Ok(TrainColor::Pink));
        assert!("deck".parse::<TrainColor>().is_err());
    }

    #[test]
    fn train_color_to_json() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&TrainColor::Blue)?, r#""blue""#);
        assert_eq!(serde_json::to_string(&TrainColor::Red)?, r#""red""#);
        Ok(())
    }

    #[test]
    fn json_to_train_color() -> serde_json::Result<()> {
        assert_eq!(
            serde_json::from_str::<TrainColor>(r#""wild""#)?,
            TrainColor::Wild
        );
        assert_eq!(
            serde_json::from_str::<TrainColor>(r#""green""#)?,
            TrainColor::Green
        );

        Ok(())
    }

    #[test]
    fn invalid_json_to_train_color() {
        assert!(serde_json::from_str::<TrainColor>(r#""turquoise""#).is_err());
    }

    #[test]
    fn non_wild_colors() {
        assert_eq!(TrainColor::non_wild_colors().count(), 8);
        assert!(TrainColor::non_wild_colors().all(|color| color.is_not_wild()));
    }

    // Tests for `TrainCardDeck`.

    #[test]
    fn new_train_card_deck() {
        let mut train_card_deck = TrainCardDeck::new(rng());
        assert!(train_card_deck.get_open_train_card_deck().is_empty());
        assert_eq!(train_card_deck.num_cards_in_decks(), NUM_TRAIN_CARDS);

        train_card_deck.refill_open_train_card_deck();

        assert_eq!(
            train_card_deck.get_open_train_card_deck().len(),
            NUM_OPEN_TRAIN_CARDS
        );
        assert!(num_wild_cards(train_card_deck.get_open_train_card_deck()) < WILD_CARD_LIMIT);
        assert_eq!(train_card_deck.num_cards_in_decks(), 110);

        let mut num_train_cards_per_color = HashMap::new();
        for deck in [
            train_card_deck.get_open_train_card_deck(),
            train_card_deck.get_close_train_card_deck(),
            train_card_deck.get_discarded_train_card_deck(),
        ] {
            for train_card in deck {
                *num_train_cards_per_color.entry(*train_card).or_insert(0) += 1;
            }
        }

        for color in TrainColor::iter() {
            let expected_num = if color.is_wild() {
                NUM_WILD_CARDS
            } else {
                NUM_NON_WILD_CARDS
            };
            assert_eq!(num_train_cards_per_color[&color], expected_num);
        }
    }

    #[test]
    fn same_seed_same_deck() {
        let first_train_card_deck = TrainCardDeck::new(StdRng::seed_from_u64(3));
        let second_train_card_deck = TrainCardDeck::new(StdRng::seed_from_u64(3));
        let third_train_card_deck = TrainCardDeck::new(StdRng::seed_from_u64(4));

        assert_eq!(
            first_train_card_deck.close_train_card_deck,
            second_train_card_deck.close_train_card_deck
        );
        assert_ne!(
            first_train_card_deck.close_train_card_deck,
            third_train_card_deck.close_train_card_deck
        );
    }

    #[test]
    fn draw_from_exhausted_deck() {
        let mut train_card_deck = TrainCardDeck::with_piles(vec![], vec![], vec![], rng());

        assert_eq!(train_card_deck.draw(), Err(DeckError::Exhausted));
        assert!(!train_card_deck.can_draw_close_card());
        assert!(!train_card_deck.can_player_draw_again_this_turn());
        assert_eq!(train_card_deck.num_cards_in_decks(), 0);
    }

    #[test]
    fn draw_reshuffles_discarded_deck_once_close_deck_is_empty() {
        let mut train_card_deck = TrainCardDeck::with_piles(
            vec![TrainColor::Blue],
            vec![],
            vec![TrainColor::Red, TrainColor::Red],
            rng(),
        );

        assert_eq!(train_card_deck.draw(), Ok(TrainColor::Blue));
        // The discarded deck is only reshuffled when actually needed.
        assert_eq!(train_card_deck.discarded_train_card_deck.len(), 2);

        assert_eq!(train_card_deck.draw(), Ok(TrainColor::Red));
        assert!(train_card_deck.discarded_train_card_deck.is_empty());
        assert_eq!(train_card_deck.close_train_card_deck, vec![TrainColor::Red]);
    }

    #[test]
    fn discard_goes_to_open_deck_when_missing_cards() {
        let mut train_card_deck = TrainCardDeck::with_piles(
            vec![],
            vec![TrainColor::Red, TrainColor::Blue],
            vec![],
            rng(),
        );

        train_card_deck.discard(TrainColor::Green);

        assert_eq!(
            train_card_deck.get_open_train_card_deck(),
            &[TrainColor::Red, TrainColor::Blue, TrainColor::Green]
        );
        assert!(train_card_deck.get_discarded_train_card_deck().is_empty());
    }

    #[test]
    fn discard_with_full_open_deck() {
        let open_train_card_deck = vec![TrainColor::Red; NUM_OPEN_TRAIN_CARDS];
        let mut train_card_deck =
            TrainCardDeck::with_piles(vec![], open_train_card_deck.clone(), vec![], rng());

        train_card_deck.discard_train_cards([TrainColor::Green, TrainColor::Wild]);

        assert_eq!(
            train_card_deck.get_open_train_card_deck(),
            open_train_card_deck.as_slice()
        );
        assert_eq!(
            train_card_deck.get_discarded_train_card_deck(),
            &[TrainColor::Green, TrainColor::Wild]
        );
    }

    #[test]
    fn take_open_card_not_displayed() {
        let mut train_card_deck = TrainCardDeck::with_piles(
            vec![TrainColor::Black],
            vec![TrainColor::Red],
            vec![],
            rng(),
        );

        assert_eq!(
            train_card_deck.take_open(TrainColor::Wild),
            Err(DeckError::NotDisplayed(TrainColor::Wild))
        );
        assert_eq!(train_card_deck.get_open_train_card_deck(), &[TrainColor::Red]);
        assert_eq!(train_card_deck.get_close_train_card_deck(), &[TrainColor::Black]);
    }

    #[test]
    fn take_open_card_with_empty_close_deck() {
        let mut train_card_deck = TrainCardDeck::with_piles(
            vec![],
            vec![TrainColor::White, TrainColor::Black, TrainColor::Wild],
            vec![],
            rng(),
        );

        assert_eq!(train_card_deck.take_open(TrainColor::White), Ok(false));
        assert_eq!(
            train_card_deck.get_open_train_card_deck(),
            &[TrainColor::Black, TrainColor::Wild]
        );
    }

    #[test]
    fn third_wild_card_resets_open_deck() {
        let mut train_card_deck = TrainCardDeck::with_piles(
            vec![
                TrainColor::Green,
                TrainColor::Yellow,
                TrainColor::Black,
                TrainColor::Orange,
                TrainColor::White,
                TrainColor::Wild,
            ],
            vec![
                TrainColor::Red,
                TrainColor::Red,
                TrainColor::Blue,
                TrainColor::Wild,
                TrainColor::Wild,
            ],
            vec![],
            rng(),
        );

        assert_eq!(train_card_deck.take_open(TrainColor::Red), Ok(true));

        assert_eq!(
            train_card_deck.get_open_train_card_deck(),
            &[
                TrainColor::White,
                TrainColor::Orange,
                TrainColor::Black,
                TrainColor::Yellow,
                TrainColor::Green,
            ]
        );
        assert_eq!(
            train_card_deck.get_discarded_train_card_deck(),
            &[
                TrainColor::Red,
                TrainColor::Blue,
                TrainColor::Wild,
                TrainColor::Wild,
                TrainColor::Wild,
            ]
        );
        assert!(train_card_deck.get_close_train_card_deck().is_empty());
    }

    #[test]
    fn two_wild_cards_do_not_reset_open_deck() {
        let open_train_card_deck = vec![
            TrainColor::Blue,
            TrainColor::Red,
            TrainColor::Black,
            TrainColor::Wild,
            TrainColor::Wild,
        ];
        let mut train_card_deck = TrainCardDeck::with_piles(
            vec![TrainColor::Pink],
            open_train_card_deck.clone(),
            vec![],
            rng(),
        );

        assert!(!train_card_deck.refill_open_train_card_deck());
        assert_eq!(
            train_card_deck.get_open_train_card_deck(),
            open_train_card_deck.as_slice()
        );
    }

    #[test]
    fn no_reset_if_not_enough_non_wild_cards_left() {
        let open_train_card_deck = vec![
            TrainColor::Wild,
            TrainColor::Black,
            TrainColor::Wild,
            TrainColor::Wild,
        ];
        let mut train_card_deck = TrainCardDeck::with_piles(
            vec![],
            open_train_card_deck.clone(),
            vec![TrainColor::Wild],
            rng(),
        );

        assert!(!train_card_deck.refill_open_train_card_deck());
        assert_eq!(train_card_deck.get_open_train_card_deck().len(), 5);
        assert_eq!(num_wild_cards(train_card_deck.get_open_train_card_deck()), 4);
    }

    #[test]
    fn can_player_draw_again_with_only_open_wild_cards() {
        let train_card_deck = TrainCardDeck::with_piles(
            vec![],
            vec![TrainColor::Wild, TrainColor::Wild],
            vec![],
            rng(),
        );

        assert!(!train_card_deck.can_player_draw_again_this_turn());

        let train_card_deck = TrainCardDeck::with_piles(
            vec![],
            vec![TrainColor::Wild, TrainColor::Orange],
            vec![],
            rng(),
        );

        assert!(train_card_deck.can_player_draw_again_this_turn());
    }

    #[test]
    fn train_card_deck_state_to_json() -> serde_json::Result<()> {
        let train_card_deck = TrainCardDeck::with_piles(
            vec![TrainColor::Pink, TrainColor::Pink],
            vec![TrainColor::Red],
            vec![TrainColor::Wild],
            rng(),
        );

        assert_eq!(
            serde_json::to_string(&train_card_deck.get_state())?,
            r#"{"open_train_card_deck":["red"],"close_train_card_deck_size":2,"discarded_train_card_deck":["wild"]}"#
        );

        Ok(())
    }
}
