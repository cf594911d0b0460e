//! End-to-end tests for session configuration against the simulated platform.
//!
//! These cover the authorization outcomes, wiring failures, device fallback
//! and camera switching, including the single reconfiguration retry.

use camera_session::camera::{
    AuthorizationStatus, CameraError, DeviceInfo, DeviceType, PlatformError, Position,
    SessionManager, SessionOptions, SessionStatus,
};
use camera_session::queue::{QualityOfService, SerialQueue};
use camera_session::sim::{SimPlatform, SimSession};
use std::sync::Arc;
use std::time::Duration;

fn start(platform: &SimPlatform, session: &SimSession, position: Position) -> SessionManager {
    let main = SerialQueue::new("e2e.main", QualityOfService::UserInteractive).unwrap();
    let manager = SessionManager::new(
        Arc::new(platform.clone()),
        Box::new(session.clone()),
        main,
        SessionOptions {
            position,
            ..SessionOptions::default()
        },
    )
    .unwrap();
    settle(&manager);
    manager
}

/// Wait until queued session work and error publication have finished.
fn settle(manager: &SessionManager) {
    // A retry may queue more session work, so drain twice.
    for _ in 0..2 {
        manager.session_queue().sync(|| ());
        manager.main_queue().sync(|| ());
    }
}

fn assert_brackets_balanced(session: &SimSession) {
    let state = session.snapshot();
    assert_eq!(state.begin_count, state.commit_count);
    assert!(!state.in_configuration);
}

#[test]
fn test_not_determined_then_granted_configures() {
    let platform = SimPlatform::new();
    platform.set_authorization(AuthorizationStatus::NotDetermined);
    platform.set_access_answer(true, Duration::from_millis(100));
    let session = SimSession::new();

    let main = SerialQueue::new("e2e.main", QualityOfService::UserInteractive).unwrap();
    let manager = SessionManager::new(
        Arc::new(platform.clone()),
        Box::new(session.clone()),
        main,
        SessionOptions::default(),
    )
    .unwrap();

    // The session queue is held while the prompt is open.
    assert!(session.snapshot().inputs.is_empty());
    assert_eq!(manager.status(), SessionStatus::Unconfigured);

    settle(&manager);
    assert_eq!(platform.access_requests(), 1);
    assert_eq!(manager.status(), SessionStatus::Configured);
    assert_eq!(manager.last_error(), None);
    assert_eq!(session.snapshot().inputs.len(), 1);
}

#[test]
fn test_not_determined_then_denied_is_unauthorized() {
    let platform = SimPlatform::new();
    platform.set_authorization(AuthorizationStatus::NotDetermined);
    platform.set_access_answer(false, Duration::from_millis(20));
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);

    assert_eq!(manager.status(), SessionStatus::Unauthorized);
    assert_eq!(manager.last_error(), Some(CameraError::DeniedAuthorization));
    assert!(session.snapshot().inputs.is_empty());
    assert!(!session.snapshot().output_attached);
}

#[test]
fn test_each_authorization_state_maps_to_one_outcome() {
    let cases = [
        (AuthorizationStatus::Authorized, SessionStatus::Configured, None),
        (
            AuthorizationStatus::Restricted,
            SessionStatus::Unauthorized,
            Some(CameraError::RestrictedAuthorization),
        ),
        (
            AuthorizationStatus::Denied,
            SessionStatus::Unauthorized,
            Some(CameraError::DeniedAuthorization),
        ),
        (
            AuthorizationStatus::Unknown(42),
            SessionStatus::Unauthorized,
            Some(CameraError::UnknownAuthorization),
        ),
    ];

    for (authorization, status, error) in cases {
        let platform = SimPlatform::new();
        platform.set_authorization(authorization);
        let session = SimSession::new();
        let manager = start(&platform, &session, Position::Back);

        assert_eq!(manager.status(), status, "status for {:?}", authorization);
        assert_eq!(manager.last_error(), error, "error for {:?}", authorization);
        assert_eq!(platform.access_requests(), 0);
    }
}

#[test]
fn test_cannot_add_input_fails_without_input() {
    let platform = SimPlatform::new();
    let session = SimSession::new();
    session.set_accept_inputs(false);
    let manager = start(&platform, &session, Position::Back);

    assert_eq!(manager.status(), SessionStatus::Failed);
    assert_eq!(manager.last_error(), Some(CameraError::CannotAddInput));
    let state = session.snapshot();
    assert!(state.inputs.is_empty());
    assert!(!state.output_attached);
    assert_brackets_balanced(&session);
}

#[test]
fn test_input_construction_failure_is_wrapped() {
    let platform = SimPlatform::new();
    platform.fail_inputs(Some(PlatformError::new(-11852, "device in use")));
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);

    assert_eq!(manager.status(), SessionStatus::Failed);
    match manager.last_error() {
        Some(CameraError::CreateCaptureInput(cause)) => {
            assert_eq!(cause.code, -11852);
            assert_eq!(cause.message, "device in use");
        }
        other => panic!("Expected CreateCaptureInput, got {:?}", other),
    }
    assert_brackets_balanced(&session);
}

#[test]
fn test_no_devices_is_camera_unavailable() {
    let platform = SimPlatform::new();
    platform.set_devices(Vec::new());
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);

    assert_eq!(manager.status(), SessionStatus::Failed);
    assert_eq!(manager.last_error(), Some(CameraError::CameraUnavailable));
    assert!(manager.list_devices().is_empty());
    assert_brackets_balanced(&session);
}

#[test]
fn test_missing_position_falls_back_to_first_device() {
    let platform = SimPlatform::new();
    platform.set_devices(vec![DeviceInfo {
        id: "front-only".to_string(),
        name: "Front Camera".to_string(),
        device_type: DeviceType::TrueDepth,
        position: Position::Front,
    }]);
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);

    assert_eq!(manager.status(), SessionStatus::Configured);
    assert_eq!(manager.current_device().unwrap().id, "front-only");
    assert_eq!(session.snapshot().inputs[0].device.id, "front-only");
}

#[test]
fn test_output_settings_applied_on_wiring() {
    let platform = SimPlatform::new();
    let session = SimSession::new();
    let _manager = start(&platform, &session, Position::Back);

    let state = session.snapshot();
    let settings = state.output_settings.expect("settings applied");
    assert!(settings.discards_late_frames);
    assert_eq!(settings.orientation, camera_session::camera::VideoOrientation::Portrait);
    assert_eq!(settings.pixel_format, camera_session::camera::PixelFormat::Bgra32);
    assert_eq!(state.output_configurations, 1);
}

#[test]
fn test_position_round_trip_keeps_one_input_and_output() {
    let platform = SimPlatform::new();
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);
    manager.open();

    manager.set_position(Position::Front);
    settle(&manager);
    assert_eq!(manager.current_device().unwrap().position, Position::Front);

    manager.set_position(Position::Back);
    settle(&manager);

    let state = session.snapshot();
    assert_eq!(state.inputs.len(), 1);
    assert_eq!(state.inputs[0].device.position, Position::Back);
    assert!(state.output_attached);
    assert_eq!(state.output_configurations, 3);
    assert!(state.running);
    assert_eq!(manager.status(), SessionStatus::Configured);
    assert_eq!(manager.position(), Position::Back);
    assert_brackets_balanced(&session);
}

#[test]
fn test_position_switch_resumes_even_when_closed_before() {
    let platform = SimPlatform::new();
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);
    assert!(!manager.is_running());

    manager.set_position(Position::Front);
    settle(&manager);
    assert!(manager.is_running());
}

#[test]
fn test_position_change_before_configuration_is_deferred() {
    let platform = SimPlatform::new();
    platform.set_authorization(AuthorizationStatus::Denied);
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);

    manager.set_position(Position::Front);
    settle(&manager);

    assert_eq!(manager.position(), Position::Front);
    assert_eq!(manager.status(), SessionStatus::Unauthorized);
    assert!(session.snapshot().inputs.is_empty());
}

#[test]
fn test_switch_failure_self_heals_once() {
    let platform = SimPlatform::new();
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);
    manager.open();

    session.refuse_next_outputs(1);
    manager.set_position(Position::Front);
    settle(&manager);

    // The refused wiring is reported even though the retry recovered.
    assert_eq!(manager.status(), SessionStatus::Configured);
    assert_eq!(manager.last_error(), Some(CameraError::CannotAddOutput));
    let state = session.snapshot();
    assert_eq!(state.inputs.len(), 1);
    assert_eq!(state.inputs[0].device.position, Position::Front);
    assert!(state.output_attached);
    assert!(state.running);
    assert_brackets_balanced(&session);
}

#[test]
fn test_switch_failure_retry_fails_terminally() {
    let platform = SimPlatform::new();
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);
    manager.open();

    session.set_accept_outputs(false);
    manager.set_position(Position::Front);
    settle(&manager);

    assert_eq!(manager.status(), SessionStatus::Failed);
    assert_eq!(manager.last_error(), Some(CameraError::CannotAddOutput));
    let state = session.snapshot();
    assert!(state.inputs.len() <= 1);
    assert!(!state.output_attached);
    assert!(!state.running);

    // Failed is terminal: no further attempts.
    manager.configure();
    settle(&manager);
    assert_eq!(manager.status(), SessionStatus::Failed);
    assert_brackets_balanced(&session);
}

#[test]
fn test_status_watch_observes_configuration() {
    let platform = SimPlatform::new();
    platform.set_authorization(AuthorizationStatus::NotDetermined);
    platform.set_access_answer(true, Duration::from_millis(50));
    let session = SimSession::new();

    let main = SerialQueue::new("e2e.main", QualityOfService::UserInteractive).unwrap();
    let manager = SessionManager::new(
        Arc::new(platform),
        Box::new(session),
        main,
        SessionOptions::default(),
    )
    .unwrap();
    let mut status = manager.watch_status();
    let errors = manager.watch_errors();

    settle(&manager);
    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SessionStatus::Configured);
    assert_eq!(*errors.borrow(), None);
}

#[test]
fn test_failed_switch_input_is_reported() {
    let platform = SimPlatform::new();
    let session = SimSession::new();
    let manager = start(&platform, &session, Position::Back);
    let mut errors = manager.watch_errors();

    platform.fail_inputs(Some(PlatformError::new(-11814, "camera busy")));
    manager.set_position(Position::Front);
    settle(&manager);

    assert!(errors.has_changed().unwrap());
    assert!(matches!(
        manager.last_error(),
        Some(CameraError::CreateCaptureInput(_))
    ));
    assert_eq!(manager.status(), SessionStatus::Failed);
}

#[test]
fn test_error_follows_failed_status_after_main_queue() {
    let platform = SimPlatform::new();
    platform.set_authorization(AuthorizationStatus::Restricted);
    let session = SimSession::new();

    let main = SerialQueue::new("e2e.main", QualityOfService::UserInteractive).unwrap();
    let hold = main.suspend();
    let manager = SessionManager::new(
        Arc::new(platform),
        Box::new(session),
        main,
        SessionOptions::default(),
    )
    .unwrap();

    // Status is set right away; the error waits for the main queue.
    assert_eq!(manager.status(), SessionStatus::Unauthorized);
    assert_eq!(manager.last_error(), None);

    hold.resume();
    manager.main_queue().sync(|| ());
    assert_eq!(
        manager.last_error(),
        Some(CameraError::RestrictedAuthorization)
    );
}

#[test]
fn test_accessors_do_not_wait_for_access_prompt() {
    let platform = SimPlatform::new();
    platform.set_authorization(AuthorizationStatus::NotDetermined);
    platform.set_access_answer(true, Duration::from_millis(150));
    let session = SimSession::new();

    let main = SerialQueue::new("e2e.main", QualityOfService::UserInteractive).unwrap();
    let manager = SessionManager::new(
        Arc::new(platform),
        Box::new(session),
        main,
        SessionOptions::default(),
    )
    .unwrap();

    let started = std::time::Instant::now();
    assert_eq!(manager.status(), SessionStatus::Unconfigured);
    assert_eq!(manager.position(), Position::Back);
    assert!(manager.current_device().is_none());
    assert!(started.elapsed() < Duration::from_millis(150));

    // is_running waits behind the prompt and the configuration.
    assert!(!manager.is_running());
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(manager.status(), SessionStatus::Configured);
}
