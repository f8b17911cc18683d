use crate::card::TrainColor;
use crate::card::TrainColor::*;
use crate::city::{City, CityToCity};
use crate::error::ConfigError;

use array_init::array_init;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::max;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use strum::{EnumCount, IntoEnumIterator};
use threadpool::ThreadPool;

lazy_static! {
    static ref THREAD_POOL: Mutex<ThreadPool> = Mutex::new(ThreadPool::default());
}

const NUM_CITIES: usize = City::COUNT;

// Paris has the highest number of routes, which is 10 (parallel routes included).
pub const MAX_ROUTES_PER_CITY: usize = 10;

/// Routes cannot be longer than the scoring table.
pub const MAX_ROUTE_LENGTH: u8 = 6;

/// Points granted when claiming a route, indexed by its length.
const ROUTE_POINTS: [u16; MAX_ROUTE_LENGTH as usize + 1] = [0, 1, 2, 4, 7, 15, 21];

/// Points granted for claiming a route of the given length.
///
/// # Example
/// ```
/// use ticket_to_ride_europe::map::route_points;
///
/// assert_eq!(route_points(1), 1);
/// assert_eq!(route_points(4), 7);
/// assert_eq!(route_points(6), 21);
/// ```
#[inline]
pub fn route_points(length: u8) -> u16 {
    ROUTE_POINTS
        .get(length as usize)
        .copied()
        .unwrap_or_default()
}

/// Identifies a route on the map. Routes are displayed as `R1`, `R2`, ...
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RouteId(pub usize);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0 + 1)
    }
}

/// How a route must be claimed, on top of its length and color.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteKind {
    Normal,
    /// Claiming a tunnel reveals three cards, which may increase its cost.
    Tunnel,
    /// Claiming a ferry requires at least `locomotives` wild cards.
    Ferry { locomotives: u8 },
}

/// Static description of a route, before any player claims it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteDefinition {
    pub cities: CityToCity,
    pub length: u8,
    pub train_color: TrainColor,
    pub kind: RouteKind,
}

/// Convenience macro to generate a route definition.
macro_rules! route {
    ($start:ident - $end:ident, $length:literal, $train_color:ident) => {
        RouteDefinition {
            cities: (City::$start, City::$end),
            length: $length,
            train_color: $train_color,
            kind: RouteKind::Normal,
        }
    };
    ($start:ident - $end:ident, $length:literal, $train_color:ident, tunnel) => {
        RouteDefinition {
            cities: (City::$start, City::$end),
            length: $length,
            train_color: $train_color,
            kind: RouteKind::Tunnel,
        }
    };
    ($start:ident - $end:ident, $length:literal, $train_color:ident, ferry $locomotives:literal) => {
        RouteDefinition {
            cities: (City::$start, City::$end),
            length: $length,
            train_color: $train_color,
            kind: RouteKind::Ferry {
                locomotives: $locomotives,
            },
        }
    };
}

/// There can be multiple "parallel" routes between two cities.
/// `Route` represents one of them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Route {
    pub id: RouteId,
    pub cities: CityToCity,
    /// The distance between two cities. This is analogous to the number of train cards needed to claim the route.
    pub length: u8,
    /// The color of this specific route.
    /// The `Wild` color means that any color matches, i.e. a gray route.
    pub train_color: TrainColor,
    pub kind: RouteKind,
    /// By whom this route is claimed, if any.
    claimer: Option<usize>,
}

impl Route {
    /// The player ID claiming this route, if any.
    #[inline]
    pub fn claimer(&self) -> Option<usize> {
        self.claimer
    }

    #[inline]
    pub fn is_tunnel(&self) -> bool {
        self.kind == RouteKind::Tunnel
    }

    /// Minimum number of wild cards needed to claim this route.
    #[inline]
    pub fn min_locomotives(&self) -> u8 {
        match self.kind {
            RouteKind::Ferry { locomotives } => locomotives,
            _ => 0,
        }
    }

    #[inline]
    pub fn connects(&self, city: City) -> bool {
        self.cities.0 == city || self.cities.1 == city
    }

    #[inline]
    pub fn points(&self) -> u16 {
        route_points(self.length)
    }
}

/// Holds the information about a route successfully claimed by a player.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimedRoute {
    pub id: RouteId,
    pub route: CityToCity,
    pub length: u8,
}

#[derive(Debug, Serialize)]
pub struct MapState<'a> {
    routes: &'a [Route],
    /// Station owner of each city, indexed by the city's integer representation.
    stations: &'a [Option<usize>],
}

/// The authoritative state of the map, per game.
/// This is mutated as players claim routes and build stations throughout the game.
#[derive(Debug)]
pub struct Map {
    routes: Vec<Route>,
    stations: [Option<usize>; NUM_CITIES],
}

impl Map {
    /// Creates the Europe map, where no route is claimed and no station is built.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::map::Map;
    ///
    /// let map = Map::europe();
    /// assert_eq!(map.routes().len(), 100);
    /// assert!(map.routes().iter().all(|route| route.claimer().is_none()));
    /// ```
    pub fn europe() -> Self {
        Self::new(Self::europe_routes())
    }

    /// Creates a map out of the given routes, after verifying that every route can be claimed.
    ///
    /// Route IDs follow the order of `route_definitions`.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::card::TrainColor;
    /// use ticket_to_ride_europe::city::City;
    /// use ticket_to_ride_europe::map::{Map, RouteDefinition, RouteKind};
    ///
    /// let mut definition = RouteDefinition {
    ///     cities: (City::Paris, City::Wien),
    ///     length: 3,
    ///     train_color: TrainColor::Red,
    ///     kind: RouteKind::Ferry { locomotives: 1 },
    /// };
    /// assert!(Map::from_routes(vec![definition]).is_ok());
    ///
    /// definition.kind = RouteKind::Ferry { locomotives: 4 };
    /// assert!(Map::from_routes(vec![definition]).is_err());
    /// ```
    pub fn from_routes(route_definitions: Vec<RouteDefinition>) -> Result<Self, ConfigError> {
        for definition in &route_definitions {
            Self::validate_route(definition)?;
        }

        Ok(Self::new(route_definitions))
    }

    fn new(route_definitions: Vec<RouteDefinition>) -> Self {
        Self {
            routes: route_definitions
                .into_iter()
                .enumerate()
                .map(|(index, definition)| Route {
                    id: RouteId(index),
                    cities: definition.cities,
                    length: definition.length,
                    train_color: definition.train_color,
                    kind: definition.kind,
                    claimer: None,
                })
                .collect(),
            stations: [None; NUM_CITIES],
        }
    }

    fn validate_route(definition: &RouteDefinition) -> Result<(), ConfigError> {
        let (start, end) = definition.cities;
        let invalid_route = |reason: String| ConfigError::InvalidRoute {
            start: start.to_string(),
            end: end.to_string(),
            reason,
        };

        if start == end {
            return Err(invalid_route(String::from(
                "a route must connect two different cities.",
            )));
        }

        if definition.length == 0 || definition.length > MAX_ROUTE_LENGTH {
            return Err(invalid_route(format!(
                "length {} is not between 1 and {}.",
                definition.length, MAX_ROUTE_LENGTH
            )));
        }

        if let RouteKind::Ferry { locomotives } = definition.kind {
            if locomotives == 0 || locomotives > definition.length {
                return Err(invalid_route(format!(
                    "a ferry of length {} cannot require {} locomotives.",
                    definition.length, locomotives
                )));
            }
        }

        Ok(())
    }

    /// All the routes of the Europe map.
    pub fn europe_routes() -> Vec<RouteDefinition> {
        vec![
            // Amsterdam.
            route!(Amsterdam - Bruxelles, 1, Black),
            route!(Amsterdam - Essen, 3, Yellow),
            route!(Amsterdam - Frankfurt, 2, White),
            route!(Amsterdam - London, 2, Wild, ferry 2),
            // Angora.
            route!(Angora - Constantinople, 2, Wild, tunnel),
            route!(Angora - Erzurum, 3, Black),
            route!(Angora - Smyrna, 3, Orange, tunnel),
            // Athina.
            route!(Athina - Brindisi, 4, Wild, ferry 1),
            route!(Athina - Sarajevo, 4, Green),
            route!(Athina - Smyrna, 2, Wild, ferry 1),
            route!(Athina - Sofia, 3, Pink),
            // Barcelona.
            route!(Barcelona - Madrid, 2, Yellow),
            route!(Barcelona - Marseille, 4, Wild),
            route!(Barcelona - Pamplona, 2, Wild, tunnel),
            // Berlin.
            route!(Berlin - Danzig, 4, Wild),
            route!(Berlin - Essen, 2, Blue),
            route!(Berlin - Frankfurt, 3, Black),
            route!(Berlin - Frankfurt, 3, Red),
            route!(Berlin - Warszawa, 4, Pink),
            route!(Berlin - Warszawa, 4, Yellow),
            route!(Berlin - Wien, 3, Green),
            // Brest.
            route!(Brest - Dieppe, 2, Orange),
            route!(Brest - Pamplona, 4, Pink),
            route!(Brest - Paris, 3, Black),
            // Brindisi.
            route!(Brindisi - Palermo, 3, Wild, ferry 1),
            route!(Brindisi - Roma, 2, White),
            // Bruxelles.
            route!(Bruxelles - Dieppe, 2, Green),
            route!(Bruxelles - Frankfurt, 2, Blue),
            route!(Bruxelles - Paris, 2, Yellow),
            route!(Bruxelles - Paris, 2, Red),
            // Bucureşti.
            route!(Bucuresti - Budapest, 4, Wild, tunnel),
            route!(Bucuresti - Constantinople, 3, Yellow),
            route!(Bucuresti - Kyiv, 4, Wild),
            route!(Bucuresti - Sevastopol, 4, White),
            route!(Bucuresti - Sofia, 2, Wild, tunnel),
            // Budapest.
            route!(Budapest - Kyiv, 6, Wild, tunnel),
            route!(Budapest - Sarajevo, 3, Pink),
            route!(Budapest - Wien, 1, Red),
            route!(Budapest - Wien, 1, White),
            route!(Budapest - Zagrab, 2, Orange),
            // Cadiz.
            route!(Cadiz - Lisboa, 2, Blue),
            route!(Cadiz - Madrid, 3, Orange),
            // Constantinople.
            route!(Constantinople - Sevastopol, 4, Wild, ferry 2),
            route!(Constantinople - Smyrna, 2, Wild, tunnel),
            route!(Constantinople - Sofia, 3, Blue),
            // Danzig.
            route!(Danzig - Riga, 3, Black),
            route!(Danzig - Warszawa, 2, Wild),
            // Dieppe.
            route!(Dieppe - London, 2, Wild, ferry 1),
            route!(Dieppe - London, 2, Wild, ferry 1),
            route!(Dieppe - Paris, 1, Pink),
            // Edinburgh.
            route!(Edinburgh - London, 4, Black),
            route!(Edinburgh - London, 4, Orange),
            // Erzurum.
            route!(Erzurum - Sevastopol, 4, Wild, ferry 2),
            route!(Erzurum - Sochi, 3, Red, tunnel),
            // Essen.
            route!(Essen - Frankfurt, 2, Green),
            route!(Essen - Kobenhavn, 3, Wild, ferry 1),
            route!(Essen - Kobenhavn, 3, Wild, ferry 1),
            // Frankfurt.
            route!(Frankfurt - Munchen, 2, Pink),
            route!(Frankfurt - Paris, 3, White),
            route!(Frankfurt - Paris, 3, Orange),
            // Kharkov.
            route!(Kharkov - Kyiv, 4, Wild),
            route!(Kharkov - Moskva, 4, Wild),
            route!(Kharkov - Rostov, 2, Green),
            // København.
            route!(Kobenhavn - Stockholm, 3, Yellow),
            route!(Kobenhavn - Stockholm, 3, White),
            // Kyiv.
            route!(Kyiv - Smolensk, 3, Red),
            route!(Kyiv - Warszawa, 4, Wild),
            route!(Kyiv - Wilno, 2, Wild),
            // Lisboa.
            route!(Lisboa - Madrid, 3, Pink),
            // Madrid.
            route!(Madrid - Pamplona, 3, Black, tunnel),
            route!(Madrid - Pamplona, 3, White, tunnel),
            // Marseille.
            route!(Marseille - Pamplona, 4, Red),
            route!(Marseille - Paris, 4, Wild),
            route!(Marseille - Roma, 4, Wild, tunnel),
            route!(Marseille - Zurich, 2, Pink, tunnel),
            // Moskva.
            route!(Moskva - Petrograd, 4, White),
            route!(Moskva - Smolensk, 2, Orange),
            // München.
            route!(Munchen - Venezia, 2, Blue, tunnel),
            route!(Munchen - Wien, 3, Orange),
            route!(Munchen - Zurich, 2, Yellow, tunnel),
            // Palermo.
            route!(Palermo - Roma, 4, Wild, ferry 1),
            route!(Palermo - Smyrna, 6, Wild, ferry 2),
            // Pamplona.
            route!(Pamplona - Paris, 4, Blue),
            route!(Pamplona - Paris, 4, Green),
            // Paris.
            route!(Paris - Zurich, 3, Wild, tunnel),
            // Petrograd.
            route!(Petrograd - Riga, 4, Wild),
            route!(Petrograd - Wilno, 4, Blue),
            // Riga.
            route!(Riga - Wilno, 4, Green),
            // Roma.
            route!(Roma - Venezia, 2, Black),
            // Rostov.
            route!(Rostov - Sevastopol, 4, Wild),
            route!(Rostov - Sochi, 2, Wild),
            // Sarajevo.
            route!(Sarajevo - Sofia, 2, Wild, tunnel),
            route!(Sarajevo - Zagrab, 3, Red),
            // Sevastopol.
            route!(Sevastopol - Sochi, 2, Wild, ferry 1),
            // Smolensk.
            route!(Smolensk - Wilno, 3, Yellow),
            // Venezia.
            route!(Venezia - Zagrab, 2, Wild),
            route!(Venezia - Zurich, 2, Green, tunnel),
            // Warszawa.
            route!(Warszawa - Wien, 4, Blue),
            route!(Warszawa - Wilno, 3, Red),
            // Wien.
            route!(Wien - Zagrab, 2, Wild),
        ]
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get_route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(id.0)
    }

    /// Routes that no player has claimed yet.
    pub fn unclaimed_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .filter(|route| route.claimer.is_none())
    }

    /// Routes with one end at `city`.
    pub fn routes_adjacent_to(&self, city: City) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(move |route| route.connects(city))
    }

    /// Request from a player `player_id` to claim a specific route.
    ///
    /// Paying for the route is not the map's concern: this only verifies that the route exists and
    /// is not claimed yet. Parallel routes are independent routes, each one may be claimed.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::city::City;
    /// use ticket_to_ride_europe::map::{ClaimedRoute, Map, RouteId};
    ///
    /// let mut map = Map::europe();
    ///
    /// assert_eq!(
    ///     map.claim_route_for_player(RouteId(0), 1),
    ///     Ok(ClaimedRoute {
    ///         id: RouteId(0),
    ///         route: (City::Amsterdam, City::Bruxelles),
    ///         length: 1,
    ///     })
    /// );
    ///
    /// assert_eq!(
    ///     map.claim_route_for_player(RouteId(0), 0),
    ///     Err(String::from("Route R1 between Amsterdam and Bruxelles is already claimed."))
    /// );
    /// ```
    pub fn claim_route_for_player(
        &mut self,
        id: RouteId,
        player_id: usize,
    ) -> Result<ClaimedRoute, String> {
        let route = self
            .routes
            .get_mut(id.0)
            .ok_or_else(|| format!("No route {} exists.", id))?;

        if route.claimer.is_some() {
            return Err(format!(
                "Route {} between {} and {} is already claimed.",
                id, route.cities.0, route.cities.1
            ));
        }

        route.claimer = Some(player_id);
        Ok(ClaimedRoute {
            id,
            route: route.cities,
            length: route.length,
        })
    }

    /// The player ID owning a station in `city`, if any.
    #[inline]
    pub fn station_owner(&self, city: City) -> Option<usize> {
        self.stations[city as usize]
    }

    /// Cities where a station can still be built.
    pub fn free_cities(&self) -> impl Iterator<Item = City> + '_ {
        City::iter().filter(move |city| self.stations[*city as usize].is_none())
    }

    /// Cities where `player_id` built a station.
    pub fn station_cities_of(&self, player_id: usize) -> impl Iterator<Item = City> + '_ {
        City::iter().filter(move |city| self.stations[*city as usize] == Some(player_id))
    }

    /// Builds a station for `player_id` in `city`. A city can host a single station.
    pub fn build_station(&mut self, city: City, player_id: usize) -> Result<(), String> {
        let station = &mut self.stations[city as usize];

        if station.is_some() {
            return Err(format!("A station is already built in {}.", city));
        }

        *station = Some(player_id);
        Ok(())
    }

    /// Routes adjacent to `city` claimed by someone else than `player_id`.
    ///
    /// A station lets its owner use one of them when scoring destinations.
    pub fn borrowable_routes(
        &self,
        city: City,
        player_id: usize,
    ) -> SmallVec<[RouteId; MAX_ROUTES_PER_CITY]> {
        self.routes_adjacent_to(city)
            .filter(|route| matches!(route.claimer, Some(claimer) if claimer != player_id))
            .map(|route| route.id)
            .collect()
    }

    /// Predicate that assess whether a given player has connected two cities on the map, based on their claimed routes.
    ///
    /// Routes in `borrowed_routes` count as if the player had claimed them, which is how stations
    /// are taken into account.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::city::City;
    /// use ticket_to_ride_europe::map::{Map, RouteId};
    ///
    /// let mut map = Map::europe();
    /// let destination = (City::Amsterdam, City::Essen);
    ///
    /// // Player has not claimed any route.
    /// assert!(!map.has_player_fulfilled_destination(destination, 0, &[]));
    ///
    /// // Amsterdam - Essen is claimed by another player.
    /// assert!(map.claim_route_for_player(RouteId(1), 1).is_ok());
    /// assert!(!map.has_player_fulfilled_destination(destination, 0, &[]));
    ///
    /// // Unless the player borrows it with a station.
    /// assert!(map.has_player_fulfilled_destination(destination, 0, &[RouteId(1)]));
    /// ```
    pub fn has_player_fulfilled_destination(
        &self,
        (destination_start, destination_end): CityToCity,
        player_id: usize,
        borrowed_routes: &[RouteId],
    ) -> bool {
        let mut cities_visited = [false; NUM_CITIES];
        let mut cities_to_visit = VecDeque::with_capacity(NUM_CITIES);

        cities_visited[destination_start as usize] = true;
        cities_to_visit.push_back(destination_start);

        while let Some(city) = cities_to_visit.pop_front() {
            if city == destination_end {
                return true;
            }

            for route in self.routes_adjacent_to(city) {
                if route.claimer != Some(player_id) && !borrowed_routes.contains(&route.id) {
                    continue;
                }

                let next_city = if route.cities.0 == city {
                    route.cities.1
                } else {
                    route.cities.0
                };

                if !cities_visited[next_city as usize] {
                    cities_visited[next_city as usize] = true;
                    cities_to_visit.push_back(next_city);
                }
            }
        }

        false
    }

    /// Every route claimed by `player_id`.
    pub fn claimed_routes_of(&self, player_id: usize) -> Vec<ClaimedRoute> {
        self.routes
            .iter()
            .filter(|route| route.claimer == Some(player_id))
            .map(|route| ClaimedRoute {
                id: route.id,
                route: route.cities,
                length: route.length,
            })
            .collect()
    }

    /// Returns the longest continuous path spanned from the claimed routes.
    ///
    /// Note that a continous path may visit a city multiple times, but may not go through the same
    /// route twice. Parallel routes are different routes.
    ///
    /// # Example
    /// ```
    /// use ticket_to_ride_europe::city::City;
    /// use ticket_to_ride_europe::map::{ClaimedRoute, Map, RouteId};
    ///
    /// let claimed_routes = vec![
    ///     ClaimedRoute {
    ///         id: RouteId(23),
    ///         route: (City::Brest, City::Paris),
    ///         length: 3,
    ///     },
    ///     ClaimedRoute {
    ///         id: RouteId(58),
    ///         route: (City::Frankfurt, City::Paris),
    ///         length: 3,
    ///     },
    /// ];
    ///
    /// // Route Brest -> Paris is of length 3.
    /// // Route Paris -> Frankfurt is of length 3.
    /// assert_eq!(Map::get_longest_route(&claimed_routes), 6);
    /// ```
    pub fn get_longest_route(claimed_routes: &[ClaimedRoute]) -> u16 {
        let mut cities_to_visit = HashSet::new();

        // Maps each city to a list of adjacent cities, including the route connecting the two.
        // Start cities are indexed by their usize representation.
        let mut all_routes: [SmallVec<[(City, u8, RouteId); MAX_ROUTES_PER_CITY]>; NUM_CITIES] =
            array_init(|_| SmallVec::new());

        // Deduplicate the cities that will be explored.
        for claimed_route in claimed_routes {
            let (start, end) = claimed_route.route;

            cities_to_visit.insert(start);
            cities_to_visit.insert(end);

            all_routes[start as usize].push((end, claimed_route.length, claimed_route.id));
            all_routes[end as usize].push((start, claimed_route.length, claimed_route.id));
        }

        // Prepare multi-threading.
        let all_routes = Arc::new(all_routes);
        let (tx, rx) = mpsc::sync_channel(0);
        let num_cities_to_visit = cities_to_visit.len();
        let thread_pool = THREAD_POOL
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Each city will spawn a separate job in the pool, and compute the longest route
        // starting at that city.
        for city in cities_to_visit {
            let all_routes = all_routes.clone();
            let tx = tx.clone();

            thread_pool.execute(move || {
                // The receiver only goes away once every result is collected.
                let _ = tx.send(Self::get_longest_route_from_city(
                    city,
                    &all_routes,
                    HashSet::new(),
                    0,
                ));
            });
        }
        drop(tx);

        rx.iter().take(num_cities_to_visit).fold(0, max)
    }

    fn get_longest_route_from_city(
        start: City,
        all_routes: &[SmallVec<[(City, u8, RouteId); MAX_ROUTES_PER_CITY]>; NUM_CITIES],
        routes_visited: HashSet<RouteId>,
        current_length: u16,
    ) -> u16 {
        let mut longest_route_from_city = current_length;

        for (end, length, id) in &all_routes[start as usize] {
            if routes_visited.contains(id) {
                continue;
            }

            let mut routes_visited = routes_visited.clone();
            routes_visited.insert(*id);

            longest_route_from_city = max(
                longest_route_from_city,
                Self::get_longest_route_from_city(
                    *end,
                    all_routes,
                    routes_visited,
                    current_length + *length as u16,
                ),
            );
        }

        longest_route_from_city
    }

    pub fn get_state(&self) -> MapState {
        MapState {
            routes: &self.routes,
            stations: &self.stations,
        }
    }
}
