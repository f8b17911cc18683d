//! Which train cards may pay for a station or a route.
//!
//! A cost is paid one card at a time: after each staged card, the remaining cards must still be
//! payable out of the hand. This lets the turn engine only offer colors that cannot lead to a dead end.

use crate::card::TrainColor;
use crate::map::Route;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Train cards a player must hand over.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Cost {
    pub num_cards: u8,
    /// All non-wild cards paid must be of this color.
    /// `Wild` means that any single color can be picked by the first non-wild card paid.
    pub color: TrainColor,
    /// How many of the cards paid must be wild cards.
    pub min_locomotives: u8,
}

impl Cost {
    /// Cost of the next station, given how many stations the player has left.
    ///
    /// The first station costs one card, the second two cards, and the third three cards.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::payment::Cost;
    ///
    /// assert_eq!(Cost::station(3).map(|cost| cost.num_cards), Some(1));
    /// assert_eq!(Cost::station(1).map(|cost| cost.num_cards), Some(3));
    /// assert!(Cost::station(0).is_none());
    /// ```
    pub fn station(stations_left: u8) -> Option<Self> {
        if stations_left == 0 || stations_left > 3 {
            return None;
        }

        Some(Self {
            num_cards: 4 - stations_left,
            color: TrainColor::Wild,
            min_locomotives: 0,
        })
    }

    /// Cost of claiming a route, before any tunnel surcharge.
    pub fn route(route: &Route) -> Self {
        Self {
            num_cards: route.length,
            color: route.train_color,
            min_locomotives: route.min_locomotives(),
        }
    }

    /// Extra cost of a tunnel, once `num_extra_cards` revealed cards matched.
    ///
    /// On a colored tunnel, the surcharge is paid with cards of the route's color or wild cards.
    /// On a gray tunnel, it is paid in the color already used for the route, or with wild cards
    /// only if no other color was used.
    pub fn tunnel_surcharge(route: &Route, num_extra_cards: u8, paid: &[TrainColor]) -> Self {
        if route.train_color.is_not_wild() {
            return Self {
                num_cards: num_extra_cards,
                color: route.train_color,
                min_locomotives: 0,
            };
        }

        match paid.iter().find(|card| card.is_not_wild()) {
            Some(color) => Self {
                num_cards: num_extra_cards,
                color: *color,
                min_locomotives: 0,
            },
            None => Self {
                num_cards: num_extra_cards,
                color: TrainColor::Wild,
                min_locomotives: num_extra_cards,
            },
        }
    }

    /// The color non-wild cards must have, once `staged` cards are committed to this cost.
    fn committed_color(&self, staged: &[TrainColor]) -> Option<TrainColor> {
        if self.color.is_not_wild() {
            return Some(self.color);
        }

        staged.iter().copied().find(TrainColor::is_not_wild)
    }

    /// Whether `hand` holds enough cards to pay for this cost at all.
    ///
    /// # Example
    /// ```
    /// use std::collections::BTreeMap;
    /// use ticket_to_ride_europe::card::TrainColor;
    /// use ticket_to_ride_europe::payment::Cost;
    ///
    /// let cost = Cost { num_cards: 3, color: TrainColor::Blue, min_locomotives: 1 };
    ///
    /// let hand = BTreeMap::from([(TrainColor::Blue, 2), (TrainColor::Wild, 1)]);
    /// assert!(cost.is_payable(&hand));
    ///
    /// let hand = BTreeMap::from([(TrainColor::Blue, 3)]);
    /// assert!(!cost.is_payable(&hand));
    /// ```
    pub fn is_payable(&self, hand: &BTreeMap<TrainColor, u8>) -> bool {
        Self::can_complete(
            hand,
            self.committed_color(&[]),
            self.num_cards,
            self.min_locomotives,
        )
    }

    /// Colors of `hand` that can be staged next, given the cards already `staged` for this cost.
    ///
    /// A color is only selectable if the rest of the cost can still be paid afterwards.
    /// The returned set is empty once the cost is paid.
    pub fn selectable_colors(
        &self,
        hand: &BTreeMap<TrainColor, u8>,
        staged: &[TrainColor],
    ) -> BTreeSet<TrainColor> {
        let num_left = (self.num_cards as usize).saturating_sub(staged.len()) as u8;
        if num_left == 0 {
            return BTreeSet::new();
        }

        let num_wild_cards_staged = staged.iter().filter(|card| card.is_wild()).count() as u8;
        let num_wild_cards_needed = self.min_locomotives.saturating_sub(num_wild_cards_staged);
        let committed_color = self.committed_color(staged);

        hand.iter()
            .filter(|(_, num)| **num > 0)
            .map(|(color, _)| *color)
            .filter(|color| {
                let next_committed_color = match (committed_color, color.is_wild()) {
                    (committed_color, true) => committed_color,
                    (None, false) => Some(*color),
                    (Some(committed_color), false) if committed_color == *color => {
                        Some(committed_color)
                    }
                    (Some(_), false) => return false,
                };

                let mut hand = hand.clone();
                if let Some(num) = hand.get_mut(color) {
                    *num -= 1;
                }

                Self::can_complete(
                    &hand,
                    next_committed_color,
                    num_left - 1,
                    num_wild_cards_needed.saturating_sub(color.is_wild() as u8),
                )
            })
            .collect()
    }

    /// Whether `staged` cards fully pay for this cost.
    pub fn is_paid(&self, staged: &[TrainColor]) -> bool {
        let num_wild_cards = staged.iter().filter(|card| card.is_wild()).count();
        let mut non_wild_colors = staged.iter().filter(|card| card.is_not_wild());
        let single_color = match non_wild_colors.next() {
            Some(first) => {
                non_wild_colors.all(|color| color == first)
                    && (self.color.is_wild() || self.color == *first)
            }
            None => true,
        };

        staged.len() == self.num_cards as usize
            && num_wild_cards >= self.min_locomotives as usize
            && single_color
    }

    fn can_complete(
        hand: &BTreeMap<TrainColor, u8>,
        committed_color: Option<TrainColor>,
        num_cards: u8,
        num_wild_cards_needed: u8,
    ) -> bool {
        let num_wild_cards = hand.get(&TrainColor::Wild).copied().unwrap_or(0);
        if num_wild_cards < num_wild_cards_needed || num_cards < num_wild_cards_needed {
            return false;
        }

        let num_colored_cards = match committed_color {
            Some(color) => hand.get(&color).copied().unwrap_or(0),
            None => TrainColor::non_wild_colors()
                .map(|color| hand.get(&color).copied().unwrap_or(0))
                .max()
                .unwrap_or(0),
        };

        num_colored_cards as u16 + num_wild_cards as u16 >= num_cards as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::TrainColor::*;
    use crate::city::City;
    use crate::map::{Map, RouteDefinition, RouteKind};

    fn hand(cards: &[(TrainColor, u8)]) -> BTreeMap<TrainColor, u8> {
        cards.iter().copied().collect()
    }

    fn colors(colors: &[TrainColor]) -> BTreeSet<TrainColor> {
        colors.iter().copied().collect()
    }

    #[test]
    fn station_cost() {
        assert_eq!(
            Cost::station(2),
            Some(Cost {
                num_cards: 2,
                color: Wild,
                min_locomotives: 0
            })
        );
        assert!(Cost::station(4).is_none());
    }

    #[test]
    fn route_cost() {
        let map = Map::europe();
        let ferry = map
            .routes()
            .iter()
            .find(|route| route.kind == RouteKind::Ferry { locomotives: 2 })
            .unwrap();
        let cost = Cost::route(ferry);

        assert_eq!(cost.num_cards, ferry.length);
        assert_eq!(cost.color, Wild);
        assert_eq!(cost.min_locomotives, 2);
    }

    #[test]
    fn colored_cost_payable() {
        let cost = Cost {
            num_cards: 3,
            color: Red,
            min_locomotives: 0,
        };

        assert!(cost.is_payable(&hand(&[(Red, 3)])));
        assert!(cost.is_payable(&hand(&[(Red, 1), (Wild, 2)])));
        assert!(cost.is_payable(&hand(&[(Wild, 3)])));
        assert!(!cost.is_payable(&hand(&[(Red, 2), (Blue, 5)])));
        assert!(!cost.is_payable(&hand(&[])));
    }

    #[test]
    fn gray_cost_payable_with_single_color() {
        let cost = Cost {
            num_cards: 4,
            color: Wild,
            min_locomotives: 0,
        };

        assert!(cost.is_payable(&hand(&[(Green, 3), (Wild, 1), (Black, 2)])));
        // Two colors cannot be mixed.
        assert!(!cost.is_payable(&hand(&[(Green, 2), (Black, 2)])));
    }

    #[test]
    fn ferry_cost_needs_locomotives() {
        let cost = Cost {
            num_cards: 2,
            color: Wild,
            min_locomotives: 1,
        };

        assert!(!cost.is_payable(&hand(&[(Green, 5)])));
        assert!(cost.is_payable(&hand(&[(Green, 1), (Wild, 1)])));
    }

    #[test]
    fn selectable_colors_for_colored_cost() {
        let cost = Cost {
            num_cards: 2,
            color: Blue,
            min_locomotives: 0,
        };
        let hand = hand(&[(Blue, 1), (Wild, 1), (Red, 4)]);

        assert_eq!(cost.selectable_colors(&hand, &[]), colors(&[Blue, Wild]));
    }

    #[test]
    fn selectable_colors_for_gray_cost_commit_to_first_color() {
        let cost = Cost {
            num_cards: 2,
            color: Wild,
            min_locomotives: 0,
        };
        let full_hand = hand(&[(Blue, 2), (Red, 1), (Wild, 1)]);

        // Red can be paired with the wild card.
        assert_eq!(
            cost.selectable_colors(&full_hand, &[]),
            colors(&[Blue, Red, Wild])
        );

        // Once blue is staged, only blue or wild cards remain selectable.
        let hand_after_blue = hand(&[(Blue, 1), (Red, 1), (Wild, 1)]);
        assert_eq!(
            cost.selectable_colors(&hand_after_blue, &[Blue]),
            colors(&[Blue, Wild])
        );
    }

    #[test]
    fn selectable_colors_keep_room_for_locomotives() {
        let cost = Cost {
            num_cards: 2,
            color: Wild,
            min_locomotives: 1,
        };
        let hand_after_green = hand(&[(Green, 3), (Wild, 1)]);

        // The last card must be a wild card.
        assert_eq!(
            cost.selectable_colors(&hand_after_green, &[Green]),
            colors(&[Wild])
        );
    }

    #[test]
    fn nothing_selectable_once_paid() {
        let cost = Cost {
            num_cards: 1,
            color: Wild,
            min_locomotives: 0,
        };

        assert!(cost.selectable_colors(&hand(&[(Red, 3)]), &[Red]).is_empty());
        assert!(cost.is_paid(&[Red]));
    }

    #[test]
    fn is_paid() {
        let cost = Cost {
            num_cards: 3,
            color: Orange,
            min_locomotives: 0,
        };

        assert!(cost.is_paid(&[Orange, Wild, Orange]));
        assert!(!cost.is_paid(&[Orange, Wild]));
        assert!(!cost.is_paid(&[Orange, Red, Orange]));
        assert!(!cost.is_paid(&[Red, Red, Red]));
    }

    fn tunnel(train_color: TrainColor) -> Route {
        let map = Map::from_routes(vec![RouteDefinition {
            cities: (City::Madrid, City::Pamplona),
            length: 2,
            train_color,
            kind: RouteKind::Tunnel,
        }])
        .unwrap();

        map.routes()[0].clone()
    }

    #[test]
    fn gray_tunnel_surcharge_follows_paid_color() {
        let gray_tunnel = tunnel(Wild);

        assert_eq!(
            Cost::tunnel_surcharge(&gray_tunnel, 1, &[Wild, Blue]),
            Cost {
                num_cards: 1,
                color: Blue,
                min_locomotives: 0
            }
        );
        assert_eq!(
            Cost::tunnel_surcharge(&gray_tunnel, 2, &[Wild, Wild]),
            Cost {
                num_cards: 2,
                color: Wild,
                min_locomotives: 2
            }
        );
    }

    #[test]
    fn colored_tunnel_surcharge_follows_route_color() {
        let blue_tunnel = tunnel(Blue);
        let cost = Cost::tunnel_surcharge(&blue_tunnel, 1, &[Wild, Wild]);

        assert_eq!(
            cost,
            Cost {
                num_cards: 1,
                color: Blue,
                min_locomotives: 0
            }
        );
        assert_eq!(
            cost.selectable_colors(&hand(&[(Blue, 1), (Red, 2)]), &[]),
            colors(&[Blue])
        );
    }
}
