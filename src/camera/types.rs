//! Camera types and data structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Physical placement of a camera on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    Unspecified,
    #[default]
    Back,
    Front,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::Unspecified => "unspecified",
            Position::Back => "back",
            Position::Front => "front",
        };
        f.write_str(name)
    }
}

/// Kind of built-in camera, as reported by device discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Depth-sensing camera (usually front facing)
    TrueDepth,
    /// Wide + telephoto pair exposed as one device
    DualCamera,
    /// Standard wide-angle camera
    WideAngle,
}

/// A discovered capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Stable platform identifier
    pub id: String,
    /// Human-readable device name
    pub name: String,
    pub device_type: DeviceType,
    pub position: Position,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {}) [{}]",
            self.name, self.device_type, self.position, self.id
        )
    }
}

/// An input built from a device, ready to be attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub device: DeviceInfo,
}

/// Capture quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPreset {
    Photo,
    #[default]
    High,
    Medium,
    Low,
    Vga640x480,
    Hd1280x720,
    Hd1920x1080,
    Hd4k,
}

/// Pixel layout of an image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    /// 32-bit BGRA, 4 bytes per pixel
    #[default]
    Bgra32,
    /// Bi-planar 4:2:0 YUV, 12 bits per pixel
    Nv12,
    /// Packed RGB, 3 bytes per pixel
    Rgb24,
}

impl PixelFormat {
    /// Number of bytes a `width` x `height` image occupies in this format,
    /// or `None` if that does not fit in `usize`.
    pub fn frame_len(&self, width: u32, height: u32) -> Option<usize> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        match self {
            PixelFormat::Bgra32 => pixels.checked_mul(4),
            PixelFormat::Rgb24 => pixels.checked_mul(3),
            PixelFormat::Nv12 => pixels.checked_add(pixels / 2),
        }
    }
}

/// Orientation applied to the video connection of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// Settings applied to the video output every time it is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSettings {
    pub pixel_format: PixelFormat,
    /// Drop frames that arrive while the consumer is still busy
    pub discards_late_frames: bool,
    pub orientation: VideoOrientation,
}

impl OutputSettings {
    /// Portrait output that discards late frames, in the given pixel format.
    pub fn with_pixel_format(pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            ..Self::default()
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Bgra32,
            discards_late_frames: true,
            orientation: VideoOrientation::Portrait,
        }
    }
}

/// Decoded pixel data. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    data: Arc<[u8]>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("len", &self.data.len())
            .finish()
    }
}

impl ImageBuffer {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            format,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// True if both handles point at the same pixel storage.
    pub fn shares_storage(&self, other: &ImageBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.format.frame_len(self.width, self.height) == Some(self.data.len())
    }
}

/// One delivered frame: a presentation timestamp plus its image, if any.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub timestamp: Duration,
    image: Option<ImageBuffer>,
}

impl SampleBuffer {
    pub fn new(timestamp: Duration, image: ImageBuffer) -> Self {
        Self {
            timestamp,
            image: Some(image),
        }
    }

    /// A sample that carries no pixel data.
    pub fn empty(timestamp: Duration) -> Self {
        Self {
            timestamp,
            image: None,
        }
    }

    /// Extract the decoded image.
    ///
    /// Returns `None` if the sample has no image or its byte length does not
    /// match the declared geometry.
    pub fn image_buffer(&self) -> Option<ImageBuffer> {
        self.image
            .as_ref()
            .filter(|image| image.is_well_formed())
            .cloned()
    }
}

/// Configuration state of the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unconfigured,
    Configured,
    Unauthorized,
    Failed,
}

/// Camera access state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet
    NotDetermined,
    /// Access is blocked by policy (parental controls, MDM)
    Restricted,
    Denied,
    Authorized,
    /// A state this crate does not know about, with the platform's raw value
    Unknown(i64),
}
