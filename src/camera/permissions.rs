//! Camera authorization handling.

use super::types::AuthorizationStatus;
use super::CameraError;

/// What configuration should do for a given authorization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access granted, configure now
    Proceed,
    /// Ask the user, holding the session queue until they answer
    Request,
    /// Access is not available; mark the session unauthorized with this error
    Reject(CameraError),
}

/// Map the platform's authorization state to a decision.
pub fn decide(status: AuthorizationStatus) -> AccessDecision {
    match status {
        AuthorizationStatus::Authorized => AccessDecision::Proceed,
        AuthorizationStatus::NotDetermined => AccessDecision::Request,
        AuthorizationStatus::Restricted => {
            AccessDecision::Reject(CameraError::RestrictedAuthorization)
        }
        AuthorizationStatus::Denied => AccessDecision::Reject(CameraError::DeniedAuthorization),
        AuthorizationStatus::Unknown(raw) => {
            log::warn!("Unrecognised camera authorization status {}", raw);
            AccessDecision::Reject(CameraError::UnknownAuthorization)
        }
    }
}

/// Error to record once the user has answered an access request.
pub fn answer_error(granted: bool) -> Option<CameraError> {
    (!granted).then_some(CameraError::DeniedAuthorization)
}
