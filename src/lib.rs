//! `DriftJack`: controlled GPS-spoofing attack simulator.
//!
//! Connects to a (simulated) autonomous vehicle and executes adversarial
//! spoofing strategies that make the vehicle believe it is somewhere
//! other than its true position, to test how its navigation stack reacts
//! to corrupted position input.

pub mod attack;
pub mod cli;
pub mod config;
pub mod error;
pub mod fix;
pub mod geo;
pub mod observability;
pub mod server;
pub mod telemetry;
pub mod vehicle;
