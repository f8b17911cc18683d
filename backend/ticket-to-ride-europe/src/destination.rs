use crate::city::{City, CityToCity};

use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Number of destination cards drawn by the *draw destinations* action.
pub const NUM_DRAWN_DESTINATION_CARDS: usize = 3;

/// Long destinations are dealt once, at the start of the game, and never come back.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DestinationLength {
    Short,
    Long,
}

/// Encapsulates information about a destination card.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct DestinationCard {
    /// The two cities that must be connected to fulfill the destination card.
    pub destination: CityToCity,
    /// How many points are granted once this card is fulfilled.
    /// If not fulfilled, the same amount will rather be substracted.
    pub points: u8,
    pub length: DestinationLength,
}

impl DestinationCard {
    /// Human-readable name of the destination card, also used as its decision token.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::city::City;
    /// use ticket_to_ride_europe::destination::{DestinationCard, DestinationLength};
    ///
    /// let destination_card = DestinationCard {
    ///     destination: (City::Paris, City::Wien),
    ///     points: 8,
    ///     length: DestinationLength::Short,
    /// };
    /// assert_eq!(destination_card.name(), "Paris - Wien");
    /// ```
    pub fn name(&self) -> String {
        format!("{} - {}", self.destination.0, self.destination.1)
    }

    #[inline]
    pub fn is_long(&self) -> bool {
        self.length == DestinationLength::Long
    }
}

/// Convenience macro to generate a destination card.
macro_rules! destination_card {
    ($start:ident - $end:ident, $points:literal) => {
        DestinationCard {
            destination: (City::$start, City::$end),
            points: $points,
            length: DestinationLength::Short,
        }
    };
    ($start:ident - $end:ident, $points:literal, long) => {
        DestinationCard {
            destination: (City::$start, City::$end),
            points: $points,
            length: DestinationLength::Long,
        }
    };
}

#[derive(Debug, Serialize)]
pub struct DestinationPoolState {
    short_destination_card_deck_size: usize,
    long_destination_card_deck_size: usize,
}

/// The shared pile of short destinations, and the separate pile of long destinations.
///
/// Cards are picked uniformly at random, so the order of each pile does not matter.
#[derive(Debug)]
pub struct DestinationPool {
    short_destination_cards: Vec<DestinationCard>,
    long_destination_cards: Vec<DestinationCard>,
    rng: StdRng,
}

impl DestinationPool {
    /// Creates the destination pool of the Europe map: 40 short destinations and 6 long ones.
    ///
    /// # Example
    /// ```
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use ticket_to_ride_europe::destination::DestinationPool;
    ///
    /// let destination_pool = DestinationPool::europe(StdRng::seed_from_u64(1));
    /// assert_eq!(destination_pool.get_short_destination_cards().len(), 40);
    /// assert_eq!(destination_pool.get_long_destination_cards().len(), 6);
    /// ```
    pub fn europe(rng: StdRng) -> Self {
        let long_destination_cards = vec![
            destination_card!(Brest - Petrograd, 20, long),
            destination_card!(Cadiz - Stockholm, 21, long),
            destination_card!(Edinburgh - Athina, 21, long),
            destination_card!(Kobenhavn - Erzurum, 21, long),
            destination_card!(Lisboa - Danzig, 20, long),
            destination_card!(Palermo - Moskva, 20, long),
        ];

        let short_destination_cards = vec![
            destination_card!(Amsterdam - Pamplona, 7),
            destination_card!(Amsterdam - Wilno, 12),
            destination_card!(Angora - Kharkov, 10),
            destination_card!(Athina - Angora, 5),
            destination_card!(Athina - Wilno, 11),
            destination_card!(Barcelona - Bruxelles, 8),
            destination_card!(Barcelona - Munchen, 8),
            destination_card!(Berlin - Bucuresti, 8),
            destination_card!(Berlin - Moskva, 12),
            destination_card!(Berlin - Roma, 9),
            destination_card!(Brest - Marseille, 7),
            destination_card!(Brest - Venezia, 8),
            destination_card!(Bruxelles - Danzig, 9),
            destination_card!(Budapest - Sofia, 5),
            destination_card!(Edinburgh - Paris, 7),
            destination_card!(Essen - Kyiv, 10),
            destination_card!(Frankfurt - Kobenhavn, 5),
            destination_card!(Frankfurt - Smolensk, 13),
            destination_card!(Kyiv - Petrograd, 6),
            destination_card!(Kyiv - Sochi, 8),
            destination_card!(London - Berlin, 7),
            destination_card!(London - Wien, 10),
            destination_card!(Madrid - Dieppe, 8),
            destination_card!(Madrid - Zurich, 8),
            destination_card!(Marseille - Essen, 8),
            destination_card!(Palermo - Constantinople, 8),
            destination_card!(Paris - Wien, 8),
            destination_card!(Paris - Zagrab, 7),
            destination_card!(Riga - Bucuresti, 10),
            destination_card!(Roma - Smyrna, 8),
            destination_card!(Rostov - Erzurum, 5),
            destination_card!(Sarajevo - Sevastopol, 8),
            destination_card!(Smolensk - Rostov, 8),
            destination_card!(Sofia - Smyrna, 5),
            destination_card!(Stockholm - Wien, 11),
            destination_card!(Venezia - Constantinople, 10),
            destination_card!(Warszawa - Smolensk, 6),
            destination_card!(Zagrab - Brindisi, 6),
            destination_card!(Zurich - Brindisi, 6),
            destination_card!(Zurich - Budapest, 6),
        ];

        Self::with_cards(short_destination_cards, long_destination_cards, rng)
    }

    /// Creates a pool out of the given cards.
    ///
    /// # Panics
    /// If a card is placed in the wrong pile.
    pub fn with_cards(
        short_destination_cards: Vec<DestinationCard>,
        long_destination_cards: Vec<DestinationCard>,
        rng: StdRng,
    ) -> Self {
        assert!(short_destination_cards.iter().all(|card| !card.is_long()));
        assert!(long_destination_cards.iter().all(DestinationCard::is_long));

        Self {
            short_destination_cards,
            long_destination_cards,
            rng,
        }
    }

    /// Removes `num_short` short destinations and `num_long` long destinations from the pool.
    ///
    /// Used once per player, at the start of the game. If a pile runs out, what is left is returned.
    pub fn deal_initial_hand(&mut self, num_short: usize, num_long: usize) -> Vec<DestinationCard> {
        let mut destination_cards =
            Self::sample(&mut self.long_destination_cards, num_long, &mut self.rng);
        destination_cards.extend(Self::sample(
            &mut self.short_destination_cards,
            num_short,
            &mut self.rng,
        ));

        destination_cards
    }

    /// Removes `n` short destinations from the pool, or what is left if there are less than `n`.
    pub fn draw_for_action(&mut self, n: usize) -> Vec<DestinationCard> {
        Self::sample(&mut self.short_destination_cards, n, &mut self.rng)
    }

    /// Gives declined destination cards back to the pool.
    ///
    /// Only short destinations go back; long destinations leave the game.
    /// Returns how many cards were returned.
    pub fn return_declined(
        &mut self,
        destination_cards: impl IntoIterator<Item = DestinationCard>,
    ) -> usize {
        let mut num_returned = 0;

        for destination_card in destination_cards {
            if destination_card.is_long() {
                debug!(
                    "Long destination {} leaves the game.",
                    destination_card.name()
                );
                continue;
            }

            self.short_destination_cards.push(destination_card);
            num_returned += 1;
        }

        num_returned
    }

    fn sample(
        pile: &mut Vec<DestinationCard>,
        n: usize,
        rng: &mut StdRng,
    ) -> Vec<DestinationCard> {
        (0..n)
            .map_while(|_| {
                if pile.is_empty() {
                    None
                } else {
                    let index = rng.gen_range(0..pile.len());
                    Some(pile.swap_remove(index))
                }
            })
            .collect()
    }

    pub fn get_short_destination_cards(&self) -> &[DestinationCard] {
        &self.short_destination_cards
    }

    pub fn get_long_destination_cards(&self) -> &[DestinationCard] {
        &self.long_destination_cards
    }

    pub fn get_state(&self) -> DestinationPoolState {
        DestinationPoolState {
            short_destination_card_deck_size: self.short_destination_cards.len(),
            long_destination_card_deck_size: self.long_destination_cards.len(),
        }
    }
}
