//! Player character.
//!
//! Owns the camera rig, the interaction focus, and the inventory
//! protocol. Movement and look handling are local plumbing; the
//! interesting outputs are [`CharacterAction`]s, which the client turns
//! into server requests (the pickup/throw decision itself is made once,
//! centrally, and multicast back).

use tracing::{debug, warn};

use sim_shared::config::SimConfig;
use sim_shared::inventory::{Inventory, InventoryUi, NullUi};
use sim_shared::math::{forward_from_yaw_pitch, Vec3};
use sim_shared::object::ObjectId;
use sim_shared::world::WorldQuery;

use crate::input::Intent;

const MAX_PITCH: f32 = 1.55; // just under 89 degrees

/// Tuning for character movement and interaction.
#[derive(Debug, Clone, Copy)]
pub struct CharacterConfig {
    pub interaction_distance: f32,
    pub throw_spawn_distance: f32,
    pub throw_force: f32,
    pub move_speed: f32,
    pub look_speed: f32,
    pub eye_height: f32,
    pub boom_length: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            interaction_distance: 200.0,
            throw_spawn_distance: 150.0,
            throw_force: 10.0,
            move_speed: 500.0,
            look_speed: 2.0,
            eye_height: 90.0,
            boom_length: 400.0,
        }
    }
}

impl CharacterConfig {
    pub fn from_sim_config(cfg: &SimConfig) -> Self {
        Self {
            interaction_distance: cfg.interaction_distance,
            throw_spawn_distance: cfg.throw_spawn_distance,
            throw_force: cfg.throw_force,
            ..Default::default()
        }
    }
}

/// An interaction request for the server, produced by an intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacterAction {
    RequestPickup(ObjectId),
    RequestThrow {
        id: ObjectId,
        position: Vec3,
        direction: Vec3,
        force: f32,
    },
}

pub struct Character {
    cfg: CharacterConfig,
    pub position: Vec3,
    yaw: f32,
    pitch: f32,
    third_person: bool,
    airborne: bool,

    pub inventory: Inventory,
    ui: Box<dyn InventoryUi + Send>,
    focused: Option<ObjectId>,
    prompt_visible: bool,
}

impl Character {
    pub fn new(cfg: CharacterConfig, inventory_capacity: usize) -> Self {
        Self {
            cfg,
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            third_person: true,
            airborne: false,
            inventory: Inventory::new(inventory_capacity),
            ui: Box::new(NullUi),
            focused: None,
            prompt_visible: false,
        }
    }

    /// Attaches an inventory UI sink. Without one, notifications fall
    /// through to [`NullUi`] (logged, skipped).
    pub fn set_ui(&mut self, ui: Box<dyn InventoryUi + Send>) {
        self.ui = ui;
    }

    pub fn focused(&self) -> Option<ObjectId> {
        self.focused
    }

    pub fn prompt_visible(&self) -> bool {
        self.prompt_visible
    }

    pub fn third_person(&self) -> bool {
        self.third_person
    }

    pub fn airborne(&self) -> bool {
        self.airborne
    }

    /// Unit view direction for the active camera.
    pub fn camera_forward(&self) -> Vec3 {
        forward_from_yaw_pitch(self.yaw, self.pitch)
    }

    /// World-space location of the active camera.
    pub fn camera_location(&self) -> Vec3 {
        if self.third_person {
            self.position - self.camera_forward() * self.cfg.boom_length
        } else {
            self.first_person_camera_location()
        }
    }

    fn first_person_camera_location(&self) -> Vec3 {
        self.position + Vec3::new(0.0, 0.0, self.cfg.eye_height)
    }

    /// Applies one intent. Interaction intents may produce an action for
    /// the server.
    pub fn apply_intent(&mut self, intent: Intent, dt: f32) -> Option<CharacterAction> {
        match intent {
            Intent::Move { x, y } => {
                let (sy, cy) = self.yaw.sin_cos();
                let forward = Vec3::new(cy, sy, 0.0);
                let right = Vec3::new(-sy, cy, 0.0);
                self.position =
                    self.position + (forward * y + right * x) * self.cfg.move_speed * dt;
                None
            }
            Intent::Look { x, y } => {
                self.yaw += x * self.cfg.look_speed * dt;
                self.pitch = (self.pitch + y * self.cfg.look_speed * dt).clamp(-MAX_PITCH, MAX_PITCH);
                None
            }
            Intent::Jump => {
                self.airborne = true;
                None
            }
            Intent::StopJumping => {
                self.airborne = false;
                None
            }
            Intent::SwitchCamera => {
                self.third_person = !self.third_person;
                debug!(third_person = self.third_person, "camera switched");
                None
            }
            Intent::Interact => self.try_interact(),
            Intent::Throw => self.try_throw(),
        }
    }

    fn try_interact(&mut self) -> Option<CharacterAction> {
        if self.inventory.is_full() {
            return None;
        }
        let id = self.focused?;
        Some(CharacterAction::RequestPickup(id))
    }

    fn try_throw(&mut self) -> Option<CharacterAction> {
        let id = self.inventory.selected_item()?;

        let direction = self.camera_forward();
        // Throws always launch from the first-person viewpoint, whichever
        // camera is active.
        let position =
            self.first_person_camera_location() + direction * self.cfg.throw_spawn_distance;
        Some(CharacterAction::RequestThrow {
            id,
            position,
            direction,
            force: self.cfg.throw_force,
        })
    }

    /// Applies a server-confirmed pickup. Inventory membership only ever
    /// changes here and in [`Character::confirm_throw`], so it cannot
    /// diverge from the central decision.
    pub fn confirm_pickup(&mut self, id: ObjectId) {
        match self.inventory.push(id) {
            Ok(_) => self.ui.notify_added(id),
            Err(e) => warn!(?id, error = %e, "confirmed pickup dropped"),
        }
    }

    /// Applies a server-confirmed throw: removes `id` if this character
    /// holds it. A miss means another character threw it.
    pub fn confirm_throw(&mut self, id: ObjectId) {
        if let Some(index) = self.inventory.remove(id) {
            self.ui.notify_removed_at(index);
        }
    }

    /// Per-frame focus update: raycast along the active camera up to the
    /// interaction distance. Skipped entirely while the inventory is full
    /// (nothing is interactable then).
    pub fn check_for_interaction(&mut self, world: &dyn WorldQuery) -> Option<ObjectId> {
        if self.inventory.is_full() {
            self.focused = None;
            self.show_interaction_prompt(false);
            return None;
        }

        let start = self.position;
        let end = start + self.camera_forward() * self.cfg.interaction_distance;
        self.focused = world.raycast(start, end, None).map(|hit| hit.object);
        self.show_interaction_prompt(self.focused.is_some());
        self.focused
    }

    fn show_interaction_prompt(&mut self, visible: bool) {
        if self.prompt_visible != visible {
            debug!(visible, "interaction prompt");
        }
        self.prompt_visible = visible;
    }
}
