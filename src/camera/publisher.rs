//! Republishes session frames on a broadcast channel.

use std::sync::Arc;

use super::manager::SessionManager;
use super::platform::SampleBufferDelegate;
use super::types::{ImageBuffer, SampleBuffer};
use crate::broadcast::{Broadcast, Subscription};
use crate::queue::{QualityOfService, SerialQueue};

/// Label of the queue frames are delivered on.
pub const DELIVERY_QUEUE_LABEL: &str = "camera-session.video-output";

/// Frame consumer registered with a [`SessionManager`].
///
/// Frames arrive on a dedicated delivery queue, separate from the session
/// queue, and are stored as the current frame from the main queue. Samples
/// without a usable image are dropped silently.
#[derive(Debug)]
pub struct FramePublisher {
    frames: Arc<Broadcast<ImageBuffer>>,
    main: SerialQueue,
    delivery: SerialQueue,
}

impl FramePublisher {
    /// Create a publisher and register it as `manager`'s frame consumer.
    ///
    /// `capacity` bounds how far a subscriber may fall behind before it
    /// skips frames.
    pub fn new(manager: &SessionManager, capacity: usize) -> std::io::Result<Arc<Self>> {
        let delivery = SerialQueue::new(DELIVERY_QUEUE_LABEL, QualityOfService::UserInitiated)?;
        let publisher = Arc::new(Self {
            frames: Arc::new(Broadcast::new(capacity)),
            main: manager.main_queue().clone(),
            delivery: delivery.clone(),
        });
        manager.set_delegate(publisher.clone(), delivery);
        Ok(publisher)
    }

    /// The most recently published frame.
    pub fn current_frame(&self) -> Option<ImageBuffer> {
        self.frames.latest()
    }

    /// Receive the current frame (if any) followed by every later frame.
    pub fn subscribe(&self) -> Subscription<ImageBuffer> {
        self.frames.subscribe()
    }

    pub fn delivery_queue(&self) -> &SerialQueue {
        &self.delivery
    }
}

impl SampleBufferDelegate for FramePublisher {
    fn did_output(&self, sample: &SampleBuffer) {
        let Some(image) = sample.image_buffer() else {
            log::trace!("Sample at {:?} has no usable image, dropped", sample.timestamp);
            return;
        };
        let frames = Arc::clone(&self.frames);
        self.main.dispatch(move || frames.publish(image));
    }
}
