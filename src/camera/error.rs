//! Error types for camera session operations.

use std::fmt;
use std::sync::Arc;

/// A failure reported by the underlying camera platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    /// Platform-specific error code
    pub code: i64,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for PlatformError {}

/// Errors surfaced through the session manager's last-error slot.
#[derive(Debug, Clone)]
pub enum CameraError {
    /// No capture device could be found
    CameraUnavailable,
    /// The session refused the device input
    CannotAddInput,
    /// The session refused the video output
    CannotAddOutput,
    /// The platform failed to build an input for the selected device
    CreateCaptureInput(Arc<PlatformError>),
    /// The user denied camera access
    DeniedAuthorization,
    /// Camera access is restricted on this device
    RestrictedAuthorization,
    /// The platform reported an authorization state we do not recognise
    UnknownAuthorization,
}

impl PartialEq for CameraError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CameraError::CreateCaptureInput(a), CameraError::CreateCaptureInput(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for CameraError {}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::CameraUnavailable => write!(f, "Camera unavailable"),
            CameraError::CannotAddInput => write!(f, "Cannot add capture input to session"),
            CameraError::CannotAddOutput => write!(f, "Cannot add video output to session"),
            CameraError::CreateCaptureInput(cause) => {
                write!(f, "Error creating capture device input: {}", cause)
            }
            CameraError::DeniedAuthorization => {
                write!(f, "Camera access denied by user")
            }
            CameraError::RestrictedAuthorization => {
                write!(
                    f,
                    "Attempting to access a restricted capture device. Check device policy settings"
                )
            }
            CameraError::UnknownAuthorization => {
                write!(f, "Unknown camera authorization status")
            }
        }
    }
}

impl std::error::Error for CameraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CameraError::CreateCaptureInput(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<PlatformError> for CameraError {
    fn from(cause: PlatformError) -> Self {
        CameraError::CreateCaptureInput(Arc::new(cause))
    }
}
