//! spotsim: terminal spot trading simulator.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], session wiring in [`app`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod app;
pub mod cli;
pub mod logging;
