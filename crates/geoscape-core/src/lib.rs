//! Core types and definitions for the Geoscape simulation.
//!
//! This crate defines the vocabulary shared by the simulation and any host:
//! calendar and globe geometry, entity records, the ruleset model, player
//! commands, popups, state snapshots, and constants. It has no dependency on
//! a runtime framework or RNG.

pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod ruleset;
pub mod state;
pub mod types;
