// Error handling for the media session bridge

use std::fmt;

/// Bridge error types
///
/// None of these are fatal to the host application. Components log and absorb
/// them at their boundaries; the public entry points return them so callers can
/// tell the cases apart.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// A report arrived before `activate()` or after `deactivate()`
    PreconditionViolation(String),

    /// The host session or notification service could not be obtained
    HostUnavailable(String),

    /// Routing key is not part of the fixed action set
    UnknownAction(String),

    /// A report carried a value outside its domain (e.g. speed <= 0)
    InvalidReport(String),

    /// The playback engine rejected a control call
    Engine(String),

    /// JNI error (Android-specific)
    #[cfg(target_os = "android")]
    Jni(String),

    /// Generic error
    Other(String),
}

impl BridgeError {
    /// Whether the condition only degrades the bridge until the host recovers
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::HostUnavailable(_))
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BridgeError::PreconditionViolation(msg) => write!(f, "Precondition violation: {}", msg),
            BridgeError::HostUnavailable(msg) => write!(f, "Host unavailable: {}", msg),
            BridgeError::UnknownAction(msg) => write!(f, "Unknown action: {}", msg),
            BridgeError::InvalidReport(msg) => write!(f, "Invalid report: {}", msg),
            BridgeError::Engine(msg) => write!(f, "Engine error: {}", msg),
            #[cfg(target_os = "android")]
            BridgeError::Jni(msg) => write!(f, "JNI error: {}", msg),
            BridgeError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(target_os = "android")]
impl From<jni::errors::Error> for BridgeError {
    fn from(err: jni::errors::Error) -> Self {
        BridgeError::Jni(err.to_string())
    }
}
