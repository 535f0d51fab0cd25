//! `sim_server`
//!
//! Server-side systems:
//! - Fixed timestep simulation loop
//! - Authority copies of every replicated object
//! - Central pickup/throw validation and multicast
//! - Per-object snapshot replication cadence

pub mod server;

pub use server::GameServer;
