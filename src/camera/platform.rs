//! Seams to the camera platform.
//!
//! Device discovery, authorization, the hardware capture session and frame
//! delivery are provided by the platform. The session manager talks to them
//! only through these traits.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::error::PlatformError;
use super::types::{
    AuthorizationStatus, DeviceInfo, DeviceInput, DeviceType, OutputSettings, Position,
    SampleBuffer, SessionPreset,
};
use crate::queue::SerialQueue;

/// Callback invoked once with the user's answer to an access request.
pub type AccessCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Authorization, discovery and input construction.
pub trait Platform: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for camera access. The callback may run on any thread.
    fn request_access(&self, callback: AccessCallback);

    /// Devices of the given types at `position`; `Position::Unspecified`
    /// matches every position.
    fn discover_devices(&self, types: &[DeviceType], position: Position) -> Vec<DeviceInfo>;

    fn make_input(&self, device: &DeviceInfo) -> Result<DeviceInput, PlatformError>;
}

/// Receives frames from the session's video output.
pub trait SampleBufferDelegate: Send + Sync {
    fn did_output(&self, sample: &SampleBuffer);
}

/// The hardware capture session: one or more inputs wired to one output.
pub trait CaptureSession: Send {
    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);

    fn can_set_preset(&self, preset: SessionPreset) -> bool;
    fn set_preset(&mut self, preset: SessionPreset);

    fn can_add_input(&self, input: &DeviceInput) -> bool;
    fn add_input(&mut self, input: &DeviceInput);
    fn remove_input(&mut self, input: &DeviceInput);

    fn can_add_output(&self) -> bool;
    fn add_output(&mut self);
    fn remove_output(&mut self);

    /// Apply pixel format, late-frame policy and connection orientation to
    /// the attached output.
    fn apply_output_settings(&mut self, settings: &OutputSettings);

    /// Route output frames to `delegate`, invoked on `queue`.
    fn set_sample_delegate(&mut self, delegate: Arc<dyn SampleBufferDelegate>, queue: SerialQueue);

    fn start_running(&mut self);
    fn stop_running(&mut self);
    fn is_running(&self) -> bool;
}

/// A begin/commit configuration bracket.
///
/// `begin_configuration` is called on creation and `commit_configuration` on
/// drop, so the commit happens on every exit path including early returns.
pub struct Configuration<'a> {
    session: &'a mut (dyn CaptureSession + 'a),
}

impl<'a> Configuration<'a> {
    pub fn begin(session: &'a mut (dyn CaptureSession + 'a)) -> Self {
        session.begin_configuration();
        Self { session }
    }
}

impl<'a> Deref for Configuration<'a> {
    type Target = dyn CaptureSession + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.session
    }
}

impl<'a> DerefMut for Configuration<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.session
    }
}

impl Drop for Configuration<'_> {
    fn drop(&mut self) {
        self.session.commit_configuration();
    }
}
