//! # ridefare-server
//!
//! HTTP server library for ridefare trip fare estimates.
//!
//! Provides the API handlers, the Google Maps capability adapters, state
//! management and logging setup.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod maps;
pub mod state;
