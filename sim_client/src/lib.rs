//! `sim_client`
//!
//! Client-side systems:
//! - Connection management (reliable channel)
//! - Input intents and character control
//! - Remote object reconciliation (snap or smoothed)
//! - Inventory mirroring and console

pub mod character;
pub mod client;
pub mod input;

pub use client::GameClient;
