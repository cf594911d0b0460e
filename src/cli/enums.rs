//! CLI enum types for camera position and quality options.

use clap::ValueEnum;

use crate::camera::{Position, SessionPreset};

/// Camera to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CameraPosition {
    #[default]
    Back,
    Front,
}

impl From<CameraPosition> for Position {
    fn from(p: CameraPosition) -> Self {
        match p {
            CameraPosition::Back => Position::Back,
            CameraPosition::Front => Position::Front,
        }
    }
}

/// Capture quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Quality {
    Photo,
    #[default]
    High,
    Medium,
    Low,
    #[value(name = "640x480")]
    Vga,
    #[value(name = "720p")]
    Hd720,
    #[value(name = "1080p")]
    Hd1080,
    #[value(name = "4k")]
    Hd4k,
}

impl From<Quality> for SessionPreset {
    fn from(q: Quality) -> Self {
        match q {
            Quality::Photo => SessionPreset::Photo,
            Quality::High => SessionPreset::High,
            Quality::Medium => SessionPreset::Medium,
            Quality::Low => SessionPreset::Low,
            Quality::Vga => SessionPreset::Vga640x480,
            Quality::Hd720 => SessionPreset::Hd1280x720,
            Quality::Hd1080 => SessionPreset::Hd1920x1080,
            Quality::Hd4k => SessionPreset::Hd4k,
        }
    }
}
