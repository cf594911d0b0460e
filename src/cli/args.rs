//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{CameraPosition, Quality};

/// Drive a camera capture session and watch its published frames
#[derive(Parser, Debug)]
#[command(name = "camera-session")]
#[command(version, about = "Camera capture session driver", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available cameras
    ListCameras,
    /// Open a session and log published frames (default)
    Preview(PreviewArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PreviewArgs {
    /// Camera position (overrides config)
    #[arg(long, short)]
    pub position: Option<CameraPosition>,

    /// Quality preset (overrides config)
    #[arg(long, short)]
    pub quality: Option<Quality>,

    /// Stop after this many frames
    #[arg(long, default_value = "30")]
    pub frames: u64,

    /// Frame rate of the synthetic source
    #[arg(long, default_value = "30")]
    pub fps: u32,

    /// Switch to the other camera halfway through
    #[arg(long)]
    pub flip: bool,
}

impl Default for PreviewArgs {
    fn default() -> Self {
        Self {
            position: None,
            quality: None,
            frames: 30,
            fps: 30,
            flip: false,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["camera-session"]);
        assert!(args.command.is_none());
        assert!(args.config.is_none());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_args_verbose_count() {
        let args = Args::parse_from(["camera-session", "-vv"]);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_args_config_option() {
        let args = Args::parse_from(["camera-session", "--config", "/tmp/config.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));

        let args = Args::parse_from(["camera-session", "list-cameras", "-c", "/tmp/test.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
    }

    #[test]
    fn test_args_list_cameras_subcommand() {
        let args = Args::parse_from(["camera-session", "list-cameras"]);
        assert!(matches!(args.command, Some(Command::ListCameras)));
    }

    #[test]
    fn test_args_preview_defaults() {
        let args = Args::parse_from(["camera-session", "preview"]);
        match args.command {
            Some(Command::Preview(preview)) => {
                assert!(preview.position.is_none());
                assert!(preview.quality.is_none());
                assert_eq!(preview.frames, 30);
                assert_eq!(preview.fps, 30);
                assert!(!preview.flip);
                let fallback = PreviewArgs::default();
                assert_eq!(preview.frames, fallback.frames);
                assert_eq!(preview.fps, fallback.fps);
            }
            _ => panic!("Expected Preview subcommand"),
        }
    }

    #[test]
    fn test_args_preview_options() {
        let args = Args::parse_from([
            "camera-session",
            "preview",
            "--position",
            "front",
            "-q",
            "720p",
            "--frames",
            "5",
            "--fps",
            "60",
            "--flip",
        ]);
        match args.command {
            Some(Command::Preview(preview)) => {
                assert_eq!(preview.position, Some(CameraPosition::Front));
                assert_eq!(preview.quality, Some(Quality::Hd720));
                assert_eq!(preview.frames, 5);
                assert_eq!(preview.fps, 60);
                assert!(preview.flip);
            }
            _ => panic!("Expected Preview subcommand"),
        }
    }

    #[test]
    fn test_args_config_subcommands() {
        let args = Args::parse_from(["camera-session", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));

        let args = Args::parse_from(["camera-session", "config", "init"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init
            })
        ));
    }
}
