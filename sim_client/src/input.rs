//! Input handling.
//!
//! In a real build this would integrate with windowing, raw mouse and
//! keyboard, and action bindings. This scaffold turns a sampled
//! [`InputState`] into discrete [`Intent`] events once per frame.

/// A player intent for one frame. Fire-and-forget; no return values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Move { x: f32, y: f32 },
    Look { x: f32, y: f32 },
    Jump,
    StopJumping,
    Interact,
    Throw,
    SwitchCamera,
}

/// User input state at a moment in time. Axis fields are level-triggered;
/// button fields are set for the frame they fired.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub move_x: f32,
    pub move_y: f32,
    pub look_x: f32,
    pub look_y: f32,
    pub jump: bool,
    pub stop_jump: bool,
    pub interact: bool,
    pub throw: bool,
    pub switch_camera: bool,
}

impl InputState {
    /// Converts the sampled state into this frame's intent events.
    pub fn intents(&self) -> Vec<Intent> {
        let mut out = Vec::new();
        if self.move_x != 0.0 || self.move_y != 0.0 {
            out.push(Intent::Move {
                x: self.move_x,
                y: self.move_y,
            });
        }
        if self.look_x != 0.0 || self.look_y != 0.0 {
            out.push(Intent::Look {
                x: self.look_x,
                y: self.look_y,
            });
        }
        if self.jump {
            out.push(Intent::Jump);
        }
        if self.stop_jump {
            out.push(Intent::StopJumping);
        }
        if self.switch_camera {
            out.push(Intent::SwitchCamera);
        }
        if self.interact {
            out.push(Intent::Interact);
        }
        if self.throw {
            out.push(Intent::Throw);
        }
        out
    }
}
