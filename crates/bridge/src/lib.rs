// Media session bridge: mirrors engine state onto host session surfaces
// and routes host actions back into the engine

pub mod bridge;
pub mod mirror;
pub mod presenter;
pub mod router;

#[cfg(test)]
mod testing;

pub use bridge::{Bridge, Lifecycle};
pub use mirror::SessionMirror;
pub use presenter::{build_notification, NotificationPresenter};
pub use router::{ActionRouter, EngineCommand};

// Re-export the core types so bindings only need this crate
pub use mediabridge_core::*;
