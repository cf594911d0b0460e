//! Capture session lifecycle.
//!
//! [`SessionManager`] owns one capture session and wires one camera input and
//! one video output into it. All session mutation runs on a private serial
//! queue; the last-error slot is written from the application's main queue.
//! Failures never surface as return values: they land in the error slot and
//! the session status.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::device;
use super::permissions::{self, AccessDecision};
use super::platform::{CaptureSession, Configuration, Platform, SampleBufferDelegate};
use super::types::{DeviceInfo, DeviceInput, OutputSettings, Position, SessionPreset, SessionStatus};
use super::CameraError;
use crate::queue::{QualityOfService, SerialQueue};

/// Label of the queue that serializes session mutation.
pub const SESSION_QUEUE_LABEL: &str = "camera-session.session";

/// Initial choices for a new session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub position: Position,
    pub output: OutputSettings,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What is currently attached to the session.
#[derive(Debug, Default)]
struct Wiring {
    position: Position,
    input: Option<DeviceInput>,
    output_attached: bool,
    /// Start the session once a pending reconfiguration succeeds
    resume_after_configure: bool,
}

struct Shared {
    platform: Arc<dyn Platform>,
    session: Mutex<Box<dyn CaptureSession>>,
    wiring: Mutex<Wiring>,
    output: OutputSettings,
    status: watch::Sender<SessionStatus>,
    last_error: watch::Sender<Option<CameraError>>,
    session_queue: SerialQueue,
    main: SerialQueue,
}

/// Handle to the camera session. Clones refer to the same session.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.status())
            .field("position", &self.position())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create the manager and start configuring the session.
    ///
    /// Configuration runs in the background; watch [`status`](Self::status)
    /// and [`last_error`](Self::last_error) for the outcome.
    ///
    /// # Errors
    /// Fails only if the session queue's thread cannot be spawned.
    pub fn new(
        platform: Arc<dyn Platform>,
        session: Box<dyn CaptureSession>,
        main: SerialQueue,
        options: SessionOptions,
    ) -> std::io::Result<Self> {
        let session_queue = SerialQueue::new(SESSION_QUEUE_LABEL, QualityOfService::UserInitiated)?;
        let (status, _) = watch::channel(SessionStatus::Unconfigured);
        let (last_error, _) = watch::channel(None);

        let manager = Self {
            shared: Arc::new(Shared {
                platform,
                session: Mutex::new(session),
                wiring: Mutex::new(Wiring {
                    position: options.position,
                    ..Wiring::default()
                }),
                output: options.output,
                status,
                last_error,
                session_queue,
                main,
            }),
        };
        manager.configure();
        Ok(manager)
    }

    /// Start the session. No-op if it is already running.
    pub fn open(&self) {
        let shared = Arc::clone(&self.shared);
        self.shared.session_queue.dispatch(move || {
            let mut session = shared.session();
            if !session.is_running() {
                session.start_running();
                log::info!("Capture session started");
            }
        });
    }

    /// Stop the session. No-op if it is already stopped.
    pub fn close(&self) {
        let shared = Arc::clone(&self.shared);
        self.shared.session_queue.dispatch(move || {
            let mut session = shared.session();
            if session.is_running() {
                session.stop_running();
                log::info!("Capture session stopped");
            }
        });
    }

    /// Apply a quality preset if the session supports it.
    ///
    /// Unsupported presets are ignored without touching the error slot.
    pub fn set_quality(&self, preset: SessionPreset) {
        let shared = Arc::clone(&self.shared);
        self.shared.session_queue.dispatch(move || {
            let mut session = shared.session();
            let mut config = Configuration::begin(&mut **session);
            if config.can_set_preset(preset) {
                config.set_preset(preset);
                log::debug!("Session preset set to {:?}", preset);
            } else {
                log::debug!("Session preset {:?} not supported, ignored", preset);
            }
        });
    }

    /// Switch to the camera at `position`.
    ///
    /// Before the session is configured this only records the position and
    /// starts configuration.
    pub fn set_position(&self, position: Position) {
        let shared = Arc::clone(&self.shared);
        self.shared
            .session_queue
            .dispatch(move || shared.switch_position(position));
    }

    /// Register the consumer of output frames and the queue it runs on.
    pub fn set_delegate(&self, delegate: Arc<dyn SampleBufferDelegate>, queue: SerialQueue) {
        let shared = Arc::clone(&self.shared);
        self.shared.session_queue.dispatch(move || {
            log::debug!("Frame consumer registered on queue '{}'", queue.label());
            shared.session().set_sample_delegate(delegate, queue);
        });
    }

    /// Check permissions and wire the session. No-op unless unconfigured.
    pub fn configure(&self) {
        self.shared.configure();
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status.borrow()
    }

    /// Status changes are sent as soon as they happen, while errors reach
    /// [`watch_errors`](Self::watch_errors) through the main queue. An
    /// observer may see `Failed` or `Unauthorized` shortly before the
    /// matching error lands in the slot.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// The most recent failure, if any.
    pub fn last_error(&self) -> Option<CameraError> {
        self.shared.last_error.borrow().clone()
    }

    pub fn watch_errors(&self) -> watch::Receiver<Option<CameraError>> {
        self.shared.last_error.subscribe()
    }

    /// The position most recently requested.
    pub fn position(&self) -> Position {
        lock(&self.shared.wiring).position
    }

    /// Device of the attached input, if any.
    pub fn current_device(&self) -> Option<DeviceInfo> {
        lock(&self.shared.wiring)
            .input
            .as_ref()
            .map(|input| input.device.clone())
    }

    /// Whether the session is running once queued session work has finished.
    ///
    /// Blocks until the session queue reaches this call, which includes
    /// waiting out an open camera-access prompt. Do not call it from a
    /// queue that must stay responsive while the prompt is shown.
    pub fn is_running(&self) -> bool {
        let shared = Arc::clone(&self.shared);
        self.shared
            .session_queue
            .sync(move || shared.session().is_running())
    }

    pub fn list_devices(&self) -> Vec<DeviceInfo> {
        device::list_devices(self.shared.platform.as_ref())
    }

    pub fn session_queue(&self) -> &SerialQueue {
        &self.shared.session_queue
    }

    pub fn main_queue(&self) -> &SerialQueue {
        &self.shared.main
    }
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, Box<dyn CaptureSession>> {
        lock(&self.session)
    }

    fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    fn set_status(&self, status: SessionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            log::debug!("Session status {:?} -> {:?}", previous, status);
        }
    }

    /// Record `error` in the last-error slot from the main queue.
    fn report(self: &Arc<Self>, error: CameraError) {
        log::error!("Camera error: {}", error);
        let shared = Arc::clone(self);
        self.main.dispatch(move || {
            shared.last_error.send_replace(Some(error));
        });
    }

    fn configure(self: &Arc<Self>) {
        if self.status() != SessionStatus::Unconfigured {
            log::debug!("Configure skipped, session is {:?}", self.status());
            return;
        }
        self.check_permissions();

        let shared = Arc::clone(self);
        self.session_queue
            .dispatch(move || shared.configure_capture_session());
    }

    fn check_permissions(self: &Arc<Self>) {
        match permissions::decide(self.platform.authorization_status()) {
            AccessDecision::Proceed => {}
            AccessDecision::Request => {
                // Nothing on the session queue runs until the user answers.
                let suspension = self.session_queue.suspend();
                let shared = Arc::clone(self);
                log::info!("Requesting camera access");
                self.platform.request_access(Box::new(move |granted| {
                    match permissions::answer_error(granted) {
                        Some(error) => {
                            shared.set_status(SessionStatus::Unauthorized);
                            shared.report(error);
                        }
                        None => log::info!("Camera access granted"),
                    }
                    suspension.resume();
                }));
            }
            AccessDecision::Reject(error) => {
                self.set_status(SessionStatus::Unauthorized);
                self.report(error);
            }
        }
    }

    fn configure_capture_session(self: &Arc<Self>) {
        if self.status() != SessionStatus::Unconfigured {
            return;
        }

        let mut session = self.session();
        let mut wiring = lock(&self.wiring);

        let wired = self
            .wire_input(&mut **session, &mut wiring)
            .and_then(|()| self.wire_output(&mut **session, &mut wiring));

        match wired {
            Ok(()) => {
                self.set_status(SessionStatus::Configured);
                log::info!("Capture session configured ({})", wiring.position);
                if std::mem::take(&mut wiring.resume_after_configure) {
                    session.start_running();
                }
            }
            Err(error) => {
                wiring.resume_after_configure = false;
                self.set_status(SessionStatus::Failed);
                self.report(error);
            }
        }
    }

    fn wire_input(
        &self,
        session: &mut dyn CaptureSession,
        wiring: &mut Wiring,
    ) -> Result<(), CameraError> {
        let mut config = Configuration::begin(session);

        let device = device::select_device(self.platform.as_ref(), wiring.position)?;
        let input = self.platform.make_input(&device)?;

        if let Some(previous) = wiring.input.take() {
            config.remove_input(&previous);
        }
        if !config.can_add_input(&input) {
            return Err(CameraError::CannotAddInput);
        }
        config.add_input(&input);
        log::info!("Input wired: {}", device);
        wiring.input = Some(input);
        Ok(())
    }

    fn wire_output(
        &self,
        session: &mut dyn CaptureSession,
        wiring: &mut Wiring,
    ) -> Result<(), CameraError> {
        let mut config = Configuration::begin(session);

        if wiring.output_attached {
            config.remove_output();
            wiring.output_attached = false;
        }
        if !config.can_add_output() {
            return Err(CameraError::CannotAddOutput);
        }
        config.add_output();
        config.apply_output_settings(&self.output);
        wiring.output_attached = true;
        log::debug!("Output wired: {:?}", self.output);
        Ok(())
    }

    fn switch_position(self: &Arc<Self>, position: Position) {
        lock(&self.wiring).position = position;

        if self.status() != SessionStatus::Configured {
            self.configure();
            return;
        }

        let mut session = self.session();
        let mut wiring = lock(&self.wiring);
        let was_running = session.is_running();
        session.stop_running();

        {
            let mut config = Configuration::begin(&mut **session);
            if let Some(input) = wiring.input.take() {
                config.remove_input(&input);
            }
            if wiring.output_attached {
                config.remove_output();
                wiring.output_attached = false;
            }
        }

        let wired = self
            .wire_input(&mut **session, &mut wiring)
            .and_then(|()| self.wire_output(&mut **session, &mut wiring));

        match wired {
            Ok(()) => {
                session.start_running();
                log::info!("Switched to {} camera", position);
            }
            Err(error) => {
                log::warn!("Switching to {} camera failed, reconfiguring", position);
                self.report(error);
                wiring.resume_after_configure = was_running;
                drop(wiring);
                drop(session);
                self.set_status(SessionStatus::Unconfigured);
                self.configure();
            }
        }
    }
}
