//! Configuration system.
//!
//! Loads configuration from JSON strings/files (file IO left to app).

use serde::{Deserialize, Serialize};

/// Root configuration shared by client/server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Server listen address, e.g. `127.0.0.1:40000`.
    pub server_addr: String,
    /// Fixed simulation tick rate.
    pub tick_hz: u32,
    /// Authority snapshot broadcast frequency per object.
    #[serde(default = "default_replicate_hz")]
    pub replicate_hz: f32,
    /// Remote blend weight toward the authoritative state per step.
    #[serde(default = "default_interp_factor")]
    pub interp_factor: f32,
    /// Per-axis magnitude threshold for vector equality.
    #[serde(default = "default_precision")]
    pub precision: f32,
    /// Smooth remote copies between snapshots instead of snapping.
    #[serde(default)]
    pub smoothing: bool,
    #[serde(default = "default_inventory_capacity")]
    pub inventory_capacity: usize,
    /// Interaction raycast length.
    #[serde(default = "default_interaction_distance")]
    pub interaction_distance: f32,
    /// Distance in front of the camera where thrown objects spawn.
    #[serde(default = "default_throw_spawn_distance")]
    pub throw_spawn_distance: f32,
    #[serde(default = "default_throw_force")]
    pub throw_force: f32,
    /// Player name (client only).
    #[serde(default = "default_player_name")]
    pub player_name: String,
}

fn default_replicate_hz() -> f32 {
    1.0
}

fn default_interp_factor() -> f32 {
    0.01
}

fn default_precision() -> f32 {
    1.0
}

fn default_inventory_capacity() -> usize {
    5
}

fn default_interaction_distance() -> f32 {
    200.0
}

fn default_throw_spawn_distance() -> f32 {
    150.0
}

fn default_throw_force() -> f32 {
    10.0
}

fn default_player_name() -> String {
    "Player".to_string()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:40000".to_string(),
            tick_hz: 60,
            replicate_hz: default_replicate_hz(),
            interp_factor: default_interp_factor(),
            precision: default_precision(),
            smoothing: false,
            inventory_capacity: default_inventory_capacity(),
            interaction_distance: default_interaction_distance(),
            throw_spawn_distance: default_throw_spawn_distance(),
            throw_force: default_throw_force(),
            player_name: default_player_name(),
        }
    }
}

impl SimConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
