//! Physics abstraction.
//!
//! Only kinematic integration is in scope: the authority advances thrown
//! bodies ballistically and lets them come to rest on the ground plane.

use crate::math::Vec3;
use crate::object::RigidBody;

/// Physics parameters.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -9.81),
        }
    }
}

/// Physics stepper trait.
pub trait PhysicsBackend: Send + Sync {
    fn step(&mut self, body: &mut RigidBody, dt_sec: f32);
}

/// No-op physics for headless tests.
#[derive(Default)]
pub struct NullPhysics;

impl PhysicsBackend for NullPhysics {
    fn step(&mut self, _body: &mut RigidBody, _dt_sec: f32) {}
}

/// Gravity integration with a hard ground plane at z = 0.
#[derive(Debug, Default)]
pub struct BallisticPhysics {
    pub cfg: PhysicsConfig,
}

impl BallisticPhysics {
    pub fn new(cfg: PhysicsConfig) -> Self {
        Self { cfg }
    }
}

impl PhysicsBackend for BallisticPhysics {
    fn step(&mut self, body: &mut RigidBody, dt_sec: f32) {
        body.velocity = body.velocity + self.cfg.gravity * dt_sec;
        body.transform.position = body.transform.position + body.velocity * dt_sec;

        // Rest on the ground instead of tunneling through it.
        if body.transform.position.z < 0.0 {
            body.transform.position.z = 0.0;
            body.velocity = Vec3::ZERO;
        }
    }
}
