//! Subcommand handlers for list-cameras, preview and config actions.

use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::args::{ConfigAction, PreviewArgs};
use crate::camera::{
    choose_device, FramePublisher, Position, SessionManager, SessionPreset, SessionStatus,
};
use crate::config::{default_path, Config};
use crate::queue::{QualityOfService, SerialQueue};
use crate::sim::{FrameSource, SimPlatform, SimSession};

const PREVIEW_WIDTH: u32 = 320;
const PREVIEW_HEIGHT: u32 = 240;

/// List available cameras and which one each position selects.
pub fn list_cameras() {
    let platform = SimPlatform::new();
    let devices = crate::camera::list_devices(&platform);

    if devices.is_empty() {
        println!("No cameras found.");
        return;
    }

    println!("Available cameras:");
    for device in &devices {
        println!("  {}", device);
    }
    println!();
    for position in [Position::Back, Position::Front] {
        if let Ok(device) = choose_device(&devices, position) {
            println!("  --position {} uses {}", position, device.name);
        }
    }
}

/// Outcome of a preview run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewSummary {
    /// Frames the session accepted from the source
    pub accepted: u64,
    /// Frames seen by the subscriber
    pub received: u64,
    /// Frames discarded by the output while the consumer was busy
    pub dropped: usize,
    pub final_position: Position,
}

/// Configure a session on the simulated platform, open it and log every
/// frame the publisher emits until `args.frames` frames were produced or
/// `stop` is set.
pub fn preview(
    config: &Config,
    args: &PreviewArgs,
    stop: Arc<AtomicBool>,
) -> Result<PreviewSummary, Box<dyn Error>> {
    let mut options = config.session_options();
    if let Some(position) = args.position {
        options.position = position.into();
    }
    let quality: SessionPreset = args
        .quality
        .map(Into::into)
        .unwrap_or(config.camera.quality);

    let session = SimSession::new();
    let main = SerialQueue::new("camera-session.main", QualityOfService::UserInteractive)?;
    let manager = SessionManager::new(
        Arc::new(SimPlatform::new()),
        Box::new(session.clone()),
        main,
        options,
    )?;
    let publisher = FramePublisher::new(&manager, config.publisher.capacity)?;

    manager.set_quality(quality);
    manager.open();
    manager.session_queue().sync(|| ());
    manager.main_queue().sync(|| ());

    if manager.status() != SessionStatus::Configured {
        return Err(match manager.last_error() {
            Some(error) => error.into(),
            None => format!("session not configured ({:?})", manager.status()).into(),
        });
    }
    if let Some(device) = manager.current_device() {
        log::info!("Previewing {} at {:?}", device, quality);
    }

    let mut frames = publisher.subscribe();
    let source = FrameSource {
        width: PREVIEW_WIDTH,
        height: PREVIEW_HEIGHT,
        fps: args.fps,
        limit: Some(args.frames),
    }
    .spawn(session.clone(), Arc::clone(&stop))?;

    let mut received = 0u64;
    let mut flipped = false;
    loop {
        if let Some(frame) = frames.try_recv() {
            received += 1;
            log::info!(
                "Frame {}: {}x{} {:?}",
                received,
                frame.width(),
                frame.height(),
                frame.format()
            );
            if args.flip && !flipped && received >= args.frames / 2 {
                let next = match manager.position() {
                    Position::Front => Position::Back,
                    _ => Position::Front,
                };
                log::info!("Switching to {} camera", next);
                manager.set_position(next);
                flipped = true;
            }
            continue;
        }
        if source.is_finished() || stop.load(Ordering::Relaxed) {
            break;
        }
        thread::sleep(Duration::from_millis(2));
    }

    stop.store(true, Ordering::Relaxed);
    let accepted = source.join().map_err(|_| "frame source thread panicked")?;

    // Collect frames still in flight toward the main queue.
    publisher.delivery_queue().sync(|| ());
    manager.main_queue().sync(|| ());
    while frames.try_recv().is_some() {
        received += 1;
    }

    manager.close();
    manager.session_queue().sync(|| ());

    let summary = PreviewSummary {
        accepted,
        received,
        dropped: session.snapshot().dropped,
        final_position: manager.position(),
    };
    log::info!(
        "Preview finished: {} accepted, {} received, {} dropped",
        summary.accepted,
        summary.received,
        summary.dropped
    );
    Ok(summary)
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config: &Config,
    path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml_string()?);
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'camera-session config show' to view current settings.",
                    config_path.display()
                )
                .into());
            }
            Config::default().save(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}
