//! Rules engine of Ticket to Ride: Europe.
//!
//! A [`session::Session`] owns the [`game_state::Game`] and plays it turn after turn, each turn
//! being resolved by a [`turn::TurnEngine`]. Players decide through a [`decision::Frontend`].

pub mod card;
pub mod city;
pub mod config;
pub mod decision;
pub mod destination;
pub mod error;
pub mod game_state;
pub mod map;
pub mod payment;
pub mod player;
pub mod session;
pub mod turn;
