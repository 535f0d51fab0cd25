//! `sim_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - Deterministic and modular where practical.
//! - Clear separation of concerns (net, object state, math, inventory).
//! - Traits for abstraction and dependency injection.
//! - No `unsafe`.

pub mod config;
pub mod console;
pub mod interp;
pub mod inventory;
pub mod math;
pub mod net;
pub mod object;
pub mod physics;
pub mod world;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::interp::*;
    pub use crate::inventory::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::object::*;
    pub use crate::world::*;
}
