// Core types and traits for the media session bridge

pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod report;
pub mod state;

// Re-export commonly used types
pub use action::{ActionDescriptor, ActionSet, HostAction, MediaButtonEvent, RoutingKey};
pub use config::BridgeConfig;
pub use engine::EngineControl;
pub use error::{BridgeError, Result};
pub use host::{
    ChannelDescriptor, HostPlaybackMode, Importance, NotificationDescriptor, NotificationHost,
    SessionActions, SessionConfig, SessionHandle, SessionHost, SessionMetadata,
    SessionPlaybackState, Visibility,
};
pub use report::EngineReport;
pub use state::{PlaybackState, Transport};
