//! cafe-core: deterministic simulation of a café's business day.
//!
//! [`engine::Cafe`] owns every component and drives the tick pipeline;
//! everything else is a component it coordinates.

pub mod clock;
pub mod config;
pub mod customer;
pub mod economy;
pub mod engine;
pub mod error;
pub mod event;
pub mod events;
pub mod facility;
pub mod modifiers;
pub mod rng;
pub mod snapshot;
pub mod staff;
pub mod store;
pub mod types;
pub mod upgrades;
