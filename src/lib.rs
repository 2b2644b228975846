//! Tailtrack: client-side ad tracking for server-side stitched streams
//!
//! Follows player time against the ad schedule published by the stitcher,
//! emits ad lifecycle events and fires tracking beacons.
//! The demo binary entry point is in main.rs.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod player;
pub mod schedule;
pub mod session;
pub mod tracking;
