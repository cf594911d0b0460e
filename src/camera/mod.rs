//! Camera capture session management.
//!
//! This module provides the session-level API:
//! - Session lifecycle via [`SessionManager`]
//! - Frame republishing via [`FramePublisher`]
//! - Platform seams via [`Platform`] and [`CaptureSession`]
//! - Device selection via [`select_device`]

mod device;
mod error;
mod manager;
mod permissions;
mod platform;
mod publisher;
mod types;

pub use device::{choose_device, list_devices, select_device, DISCOVERY_TYPES};
pub use error::{CameraError, PlatformError};
pub use manager::{SessionManager, SessionOptions, SESSION_QUEUE_LABEL};
pub use permissions::{decide as decide_access, AccessDecision};
pub use platform::{AccessCallback, CaptureSession, Configuration, Platform, SampleBufferDelegate};
pub use publisher::{FramePublisher, DELIVERY_QUEUE_LABEL};
pub use types::{
    AuthorizationStatus, DeviceInfo, DeviceInput, DeviceType, ImageBuffer, OutputSettings,
    PixelFormat, Position, SampleBuffer, SessionPreset, SessionStatus, VideoOrientation,
};
