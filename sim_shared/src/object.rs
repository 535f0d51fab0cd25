//! Replicated pickup objects.
//!
//! Each process holds one copy of every pickupable object. Exactly one
//! copy is [`NetRole::Authority`] (it samples its body and broadcasts);
//! all others are [`NetRole::Remote`] (they receive snapshots and
//! reconcile their body toward them). The role is chosen once at
//! construction, so the per-call paths stay branch-free on role checks.
//!
//! Reconciliation keeps two snapshots: `current` (the body state observed
//! just before the latest correction) and `true_state` (the most recent
//! authoritative sample). `true_state` is only ever written by
//! [`PickupObject::apply_replication`] on remote copies; it is never
//! itself interpolated.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interp::{self, InterpParams, Sample};
use crate::math::{Quat, Transform, Vec3};

/// Opaque replicated-object id, assigned by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Which side of the replication channel this copy sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetRole {
    /// Ground truth: simulates and broadcasts.
    Authority,
    /// Receives snapshots and reconciles.
    Remote,
}

/// Transform + linear velocity pair, as sampled or as replicated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BodySnapshot {
    pub transform: Transform,
    pub velocity: Vec3,
}

/// The owned physics/render body. Stands in for the engine-side mesh
/// component: the only contract is set/sample transform and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidBody {
    pub transform: Transform,
    pub velocity: Vec3,
}

impl RigidBody {
    pub fn set_world_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn set_world_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    pub fn snapshot(&self) -> BodySnapshot {
        BodySnapshot {
            transform: self.transform,
            velocity: self.velocity,
        }
    }
}

/// Per-object replication tuning. Configuration only; never mutated by
/// the state machine itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Authority broadcast frequency (snapshots per second).
    pub replicate_hz: f32,
    /// Whether remote copies smooth between snapshots. Off by default:
    /// the observed legacy behavior is a hard snap at each receipt.
    pub smoothing: bool,
    pub interp: InterpParams,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            replicate_hz: 1.0,
            smoothing: false,
            interp: InterpParams::default(),
        }
    }
}

/// One copy of a replicated pickupable object.
#[derive(Debug, Clone)]
pub struct PickupObject {
    pub id: ObjectId,
    role: NetRole,
    cfg: ObjectConfig,

    pub body: RigidBody,

    current: BodySnapshot,
    true_state: BodySnapshot,

    since_replicate: f32,
    /// Secondary cadence counter. Advanced but never consumed; kept for
    /// parity with the original actor.
    since_update: f32,

    hidden: bool,
    collision_enabled: bool,
    tick_enabled: bool,
}

impl PickupObject {
    pub fn new(id: ObjectId, role: NetRole, spawn: Transform, cfg: ObjectConfig) -> Self {
        let body = RigidBody {
            transform: spawn,
            velocity: Vec3::ZERO,
        };
        let snap = body.snapshot();
        Self {
            id,
            role,
            cfg,
            body,
            current: snap,
            true_state: snap,
            since_replicate: 0.0,
            since_update: 0.0,
            hidden: false,
            collision_enabled: true,
            tick_enabled: true,
        }
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn config(&self) -> &ObjectConfig {
        &self.cfg
    }

    /// Replaces the replication tuning (console-driven retune).
    pub fn set_config(&mut self, cfg: ObjectConfig) {
        self.cfg = cfg;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub fn tick_enabled(&self) -> bool {
        self.tick_enabled
    }

    /// Last state observed before the most recent correction.
    pub fn current(&self) -> BodySnapshot {
        self.current
    }

    /// Most recent authoritative snapshot.
    pub fn true_state(&self) -> BodySnapshot {
        self.true_state
    }

    /// Advances one frame. On the authority, returns a body sample to
    /// broadcast whenever the replication interval has elapsed. On remote
    /// copies, optionally applies one smoothing step toward `true_state`.
    ///
    /// Held objects (tick disabled) do not advance at all.
    pub fn tick(&mut self, dt: f32) -> Option<BodySnapshot> {
        if !self.tick_enabled {
            return None;
        }

        self.since_replicate += dt;
        self.since_update += dt;

        match self.role {
            NetRole::Authority => {
                if self.since_replicate >= 1.0 / self.cfg.replicate_hz {
                    self.since_replicate = 0.0;
                    return Some(self.body.snapshot());
                }
            }
            NetRole::Remote => {
                if self.cfg.smoothing {
                    let observed = Sample {
                        position: self.body.transform.position,
                        rotation: self.body.transform.rotation,
                        velocity: self.body.velocity,
                    };
                    let target = Sample {
                        position: self.true_state.transform.position,
                        rotation: self.true_state.transform.rotation,
                        velocity: self.true_state.velocity,
                    };
                    let correction = interp::correct(&observed, &target, &self.cfg.interp);

                    // Rotation and velocity only; position converges via
                    // the reconstructed velocity.
                    self.body.set_world_rotation(correction.rotation);
                    self.body.set_linear_velocity(correction.velocity);
                    self.current = self.body.snapshot();
                }
            }
        }
        None
    }

    /// Remote-side handler for an authoritative snapshot.
    ///
    /// Captures the pre-correction body state as `current`, stores the
    /// snapshot as `true_state`, and hard-sets the body to it
    /// (last-received-wins; blending only happens in later ticks).
    pub fn apply_replication(&mut self, transform: Transform, velocity: Vec3) {
        if self.role == NetRole::Authority {
            // Echo guard: the authority never adopts its own broadcast.
            debug!(id = ?self.id, "ignoring replication echo on authority copy");
            return;
        }

        self.current = self.body.snapshot();
        self.true_state = BodySnapshot {
            transform,
            velocity,
        };

        self.body.set_world_transform(transform);
        self.body.set_linear_velocity(velocity);
    }

    /// Transition into the held state: invisible, no collision, no tick.
    /// Idempotent.
    pub fn on_pickup(&mut self) {
        self.hidden = true;
        self.tick_enabled = false;
        self.collision_enabled = false;
    }

    /// Transition back into the world: visible and simulating, placed at
    /// `position` facing `direction`, moving at `direction * force`.
    /// Both snapshots are re-seeded from the new body state, discarding
    /// any stale interpolation target.
    pub fn on_throw(&mut self, position: Vec3, direction: Vec3, force: f32) {
        self.hidden = false;
        self.tick_enabled = true;
        self.collision_enabled = true;

        self.body.set_world_transform(Transform {
            position,
            rotation: Quat::facing(direction),
            scale: self.body.transform.scale,
        });
        self.body.set_linear_velocity(direction * force);

        let snap = self.body.snapshot();
        self.current = snap;
        self.true_state = snap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority(id: u64) -> PickupObject {
        PickupObject::new(
            ObjectId(id),
            NetRole::Authority,
            Transform::default(),
            ObjectConfig::default(),
        )
    }

    fn remote(id: u64) -> PickupObject {
        PickupObject::new(
            ObjectId(id),
            NetRole::Remote,
            Transform::default(),
            ObjectConfig::default(),
        )
    }

    #[test]
    fn authority_replicates_on_cadence() {
        let mut obj = authority(1);
        assert!(obj.tick(0.5).is_none());
        assert!(obj.tick(0.5).is_some());
        // Counter reset: the next half second stays quiet.
        assert!(obj.tick(0.5).is_none());
    }

    #[test]
    fn held_object_does_not_replicate() {
        let mut obj = authority(1);
        obj.on_pickup();
        assert!(obj.tick(5.0).is_none());
    }

    #[test]
    fn reconcile_hard_sets_remote_body() {
        let mut obj = remote(1);
        let transform = Transform::from_position(Vec3::new(10.0, 20.0, 30.0));
        let velocity = Vec3::new(1.0, 2.0, 3.0);

        obj.apply_replication(transform, velocity);

        assert_eq!(obj.true_state().transform, transform);
        assert_eq!(obj.true_state().velocity, velocity);
        assert_eq!(obj.body.transform, transform);
        assert_eq!(obj.body.velocity, velocity);
        // Pre-correction state was the spawn state.
        assert_eq!(obj.current().transform, Transform::default());
    }

    #[test]
    fn authority_ignores_replication_echo() {
        let mut obj = authority(1);
        let before = obj.body;
        obj.apply_replication(
            Transform::from_position(Vec3::new(99.0, 0.0, 0.0)),
            Vec3::new(1.0, 0.0, 0.0),
        );
        assert_eq!(obj.body, before);
        assert_eq!(obj.true_state().transform, Transform::default());
    }

    #[test]
    fn pickup_then_throw_restores_flags_and_velocity() {
        let mut obj = authority(1);
        obj.on_pickup();
        assert!(obj.is_hidden());
        assert!(!obj.collision_enabled());
        assert!(!obj.tick_enabled());

        let direction = Vec3::new(0.0, 1.0, 0.0);
        obj.on_throw(Vec3::new(1.0, 2.0, 3.0), direction, 10.0);
        assert!(!obj.is_hidden());
        assert!(obj.collision_enabled());
        assert!(obj.tick_enabled());
        assert_eq!(obj.body.velocity, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(obj.body.transform.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn throw_discards_stale_interpolation_target() {
        let mut obj = remote(1);
        obj.apply_replication(
            Transform::from_position(Vec3::new(500.0, 0.0, 0.0)),
            Vec3::ZERO,
        );
        obj.on_pickup();
        obj.on_throw(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 5.0);

        assert_eq!(obj.true_state(), obj.body.snapshot());
        assert_eq!(obj.current(), obj.body.snapshot());
    }

    #[test]
    fn smoothing_steers_remote_body_toward_snapshot() {
        let cfg = ObjectConfig {
            smoothing: true,
            ..Default::default()
        };
        let mut obj = PickupObject::new(ObjectId(1), NetRole::Remote, Transform::default(), cfg);

        obj.apply_replication(
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
            Vec3::ZERO,
        );
        // Local sim drifts the body away from the authoritative position.
        obj.body
            .set_world_transform(Transform::from_position(Vec3::ZERO));

        obj.tick(0.016);

        // Reconstructed velocity points at the authoritative position.
        assert_eq!(obj.body.velocity, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(obj.current().velocity, Vec3::new(10.0, 0.0, 0.0));
    }
}
