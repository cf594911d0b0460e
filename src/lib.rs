//! camera-session library crate.
//!
//! A camera capture session manager and frame publisher. The platform's
//! capture framework is reached through the traits in [`camera`]; [`sim`]
//! provides an in-process implementation of them.

pub mod broadcast;
pub mod camera;
pub mod cli;
pub mod config;
pub mod queue;
pub mod sim;
