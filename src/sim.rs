//! In-process camera platform.
//!
//! [`SimPlatform`] and [`SimSession`] implement the platform traits without
//! hardware: authorization answers, device lists and session refusals are
//! scriptable, and the session records every configuration call so callers
//! can inspect what the session manager did. [`FrameSource`] feeds synthetic
//! test-pattern frames into a session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::camera::{
    AccessCallback, AuthorizationStatus, CaptureSession, DeviceInfo, DeviceInput, DeviceType,
    ImageBuffer, OutputSettings, PixelFormat, Platform, PlatformError, Position,
    SampleBufferDelegate, SampleBuffer, SessionPreset,
};
use crate::queue::SerialQueue;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Devices a typical phone exposes.
pub fn default_devices() -> Vec<DeviceInfo> {
    vec![
        DeviceInfo {
            id: "sim-back-wide".to_string(),
            name: "Back Camera".to_string(),
            device_type: DeviceType::WideAngle,
            position: Position::Back,
        },
        DeviceInfo {
            id: "sim-back-dual".to_string(),
            name: "Back Dual Camera".to_string(),
            device_type: DeviceType::DualCamera,
            position: Position::Back,
        },
        DeviceInfo {
            id: "sim-front-truedepth".to_string(),
            name: "Front TrueDepth Camera".to_string(),
            device_type: DeviceType::TrueDepth,
            position: Position::Front,
        },
    ]
}

#[derive(Debug)]
struct PlatformState {
    status: AuthorizationStatus,
    /// What the simulated user answers when asked for access
    answer: bool,
    answer_delay: Duration,
    devices: Vec<DeviceInfo>,
    input_failure: Option<PlatformError>,
    access_requests: usize,
}

/// Scriptable [`Platform`].
#[derive(Debug, Clone)]
pub struct SimPlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPlatform {
    /// An authorized platform with [`default_devices`].
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState {
                status: AuthorizationStatus::Authorized,
                answer: true,
                answer_delay: Duration::ZERO,
                devices: default_devices(),
                input_failure: None,
                access_requests: 0,
            })),
        }
    }

    pub fn set_authorization(&self, status: AuthorizationStatus) {
        lock(&self.state).status = status;
    }

    /// Answer future access requests with `granted` after `delay`.
    pub fn set_access_answer(&self, granted: bool, delay: Duration) {
        let mut state = lock(&self.state);
        state.answer = granted;
        state.answer_delay = delay;
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        lock(&self.state).devices = devices;
    }

    /// Make every `make_input` call fail with `error` (or succeed with `None`).
    pub fn fail_inputs(&self, error: Option<PlatformError>) {
        lock(&self.state).input_failure = error;
    }

    pub fn access_requests(&self) -> usize {
        lock(&self.state).access_requests
    }
}

impl Platform for SimPlatform {
    fn authorization_status(&self) -> AuthorizationStatus {
        lock(&self.state).status
    }

    fn request_access(&self, callback: AccessCallback) {
        let (granted, delay) = {
            let mut state = lock(&self.state);
            state.access_requests += 1;
            (state.answer, state.answer_delay)
        };
        let state = Arc::clone(&self.state);
        // The answer arrives on a thread of its own, like a system prompt.
        thread::spawn(move || {
            thread::sleep(delay);
            lock(&state).status = if granted {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
            callback(granted);
        });
    }

    fn discover_devices(&self, types: &[DeviceType], position: Position) -> Vec<DeviceInfo> {
        lock(&self.state)
            .devices
            .iter()
            .filter(|d| types.contains(&d.device_type))
            .filter(|d| position == Position::Unspecified || d.position == position)
            .cloned()
            .collect()
    }

    fn make_input(&self, device: &DeviceInfo) -> Result<DeviceInput, PlatformError> {
        match &lock(&self.state).input_failure {
            Some(error) => Err(error.clone()),
            None => Ok(DeviceInput {
                device: device.clone(),
            }),
        }
    }
}

/// Observable state of a [`SimSession`].
#[derive(Debug, Clone)]
pub struct SimSessionState {
    pub inputs: Vec<DeviceInput>,
    pub output_attached: bool,
    pub output_settings: Option<OutputSettings>,
    /// Number of times output settings were applied
    pub output_configurations: usize,
    pub running: bool,
    pub preset: Option<SessionPreset>,
    pub supported_presets: Vec<SessionPreset>,
    pub in_configuration: bool,
    pub begin_count: usize,
    pub commit_count: usize,
    pub accept_inputs: bool,
    pub accept_outputs: bool,
    /// Refuse this many more output additions, then accept again
    pub refuse_outputs_remaining: usize,
    /// Frames handed to the delegate queue
    pub delivered: usize,
    /// Frames discarded because the delegate was still busy
    pub dropped: usize,
}

impl Default for SimSessionState {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_attached: false,
            output_settings: None,
            output_configurations: 0,
            running: false,
            preset: None,
            supported_presets: vec![
                SessionPreset::Photo,
                SessionPreset::High,
                SessionPreset::Medium,
                SessionPreset::Low,
                SessionPreset::Vga640x480,
                SessionPreset::Hd1280x720,
                SessionPreset::Hd1920x1080,
            ],
            in_configuration: false,
            begin_count: 0,
            commit_count: 0,
            accept_inputs: true,
            accept_outputs: true,
            refuse_outputs_remaining: 0,
            delivered: 0,
            dropped: 0,
        }
    }
}

type DelegateSlot = Option<(Arc<dyn SampleBufferDelegate>, SerialQueue)>;

struct SessionShared {
    state: Mutex<SimSessionState>,
    delegate: Mutex<DelegateSlot>,
    in_flight: AtomicBool,
}

/// Scriptable [`CaptureSession`]. Clones share the same session, so a clone
/// kept aside can inspect a session owned by the manager.
#[derive(Clone)]
pub struct SimSession {
    shared: Arc<SessionShared>,
}

impl std::fmt::Debug for SimSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimSession")
            .field("state", &*lock(&self.shared.state))
            .finish_non_exhaustive()
    }
}

impl Default for SimSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SimSession {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SessionShared {
                state: Mutex::new(SimSessionState::default()),
                delegate: Mutex::new(None),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub fn snapshot(&self) -> SimSessionState {
        lock(&self.shared.state).clone()
    }

    pub fn set_accept_inputs(&self, accept: bool) {
        lock(&self.shared.state).accept_inputs = accept;
    }

    pub fn set_accept_outputs(&self, accept: bool) {
        lock(&self.shared.state).accept_outputs = accept;
    }

    /// Refuse the next `count` output additions.
    pub fn refuse_next_outputs(&self, count: usize) {
        lock(&self.shared.state).refuse_outputs_remaining = count;
    }

    pub fn set_supported_presets(&self, presets: Vec<SessionPreset>) {
        lock(&self.shared.state).supported_presets = presets;
    }

    pub fn has_delegate(&self) -> bool {
        lock(&self.shared.delegate).is_some()
    }

    /// Push one frame through the output.
    ///
    /// Returns `false` if the frame was not handed to the delegate: the
    /// session is stopped, no output or delegate is attached, or the output
    /// discards late frames and the previous one is still being handled.
    pub fn deliver(&self, sample: SampleBuffer) -> bool {
        self.dispatch(sample).is_some()
    }

    /// Like [`deliver`](Self::deliver), then wait until the delegate has
    /// handled the frame.
    pub fn deliver_and_wait(&self, sample: SampleBuffer) -> bool {
        match self.dispatch(sample) {
            Some(queue) => {
                queue.sync(|| ());
                true
            }
            None => false,
        }
    }

    fn dispatch(&self, sample: SampleBuffer) -> Option<SerialQueue> {
        let (delegate, queue) = lock(&self.shared.delegate).clone()?;

        let mut state = lock(&self.shared.state);
        if !state.running || !state.output_attached {
            return None;
        }
        let discard = state
            .output_settings
            .map(|s| s.discards_late_frames)
            .unwrap_or(false);
        if discard && self.shared.in_flight.swap(true, Ordering::SeqCst) {
            state.dropped += 1;
            return None;
        }
        state.delivered += 1;
        drop(state);

        let shared = Arc::clone(&self.shared);
        queue.dispatch(move || {
            let _busy = discard.then(|| InFlight(shared));
            delegate.did_output(&sample);
        });
        Some(queue)
    }
}

/// Clears the in-flight flag when the delegate returns or unwinds.
struct InFlight(Arc<SessionShared>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}

impl CaptureSession for SimSession {
    fn begin_configuration(&mut self) {
        let mut state = lock(&self.shared.state);
        state.in_configuration = true;
        state.begin_count += 1;
    }

    fn commit_configuration(&mut self) {
        let mut state = lock(&self.shared.state);
        state.in_configuration = false;
        state.commit_count += 1;
    }

    fn can_set_preset(&self, preset: SessionPreset) -> bool {
        lock(&self.shared.state).supported_presets.contains(&preset)
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        lock(&self.shared.state).preset = Some(preset);
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        let state = lock(&self.shared.state);
        state.accept_inputs && !state.inputs.iter().any(|i| i.device.id == input.device.id)
    }

    fn add_input(&mut self, input: &DeviceInput) {
        lock(&self.shared.state).inputs.push(input.clone());
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        lock(&self.shared.state)
            .inputs
            .retain(|i| i.device.id != input.device.id);
    }

    fn can_add_output(&self) -> bool {
        let mut state = lock(&self.shared.state);
        if state.refuse_outputs_remaining > 0 {
            state.refuse_outputs_remaining -= 1;
            return false;
        }
        state.accept_outputs && !state.output_attached
    }

    fn add_output(&mut self) {
        lock(&self.shared.state).output_attached = true;
    }

    fn remove_output(&mut self) {
        let mut state = lock(&self.shared.state);
        state.output_attached = false;
        state.output_settings = None;
    }

    fn apply_output_settings(&mut self, settings: &OutputSettings) {
        let mut state = lock(&self.shared.state);
        if state.output_attached {
            state.output_settings = Some(*settings);
            state.output_configurations += 1;
        }
    }

    fn set_sample_delegate(&mut self, delegate: Arc<dyn SampleBufferDelegate>, queue: SerialQueue) {
        *lock(&self.shared.delegate) = Some((delegate, queue));
    }

    fn start_running(&mut self) {
        lock(&self.shared.state).running = true;
    }

    fn stop_running(&mut self) {
        lock(&self.shared.state).running = false;
    }

    fn is_running(&self) -> bool {
        lock(&self.shared.state).running
    }
}

/// BGRA gradient whose hue shifts with `sequence`.
pub fn test_pattern(width: u32, height: u32, sequence: u64) -> ImageBuffer {
    let mut data = Vec::with_capacity(PixelFormat::Bgra32.frame_len(width, height).unwrap_or(0));
    let shift = (sequence % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let b = ((x * 255) / width.max(1)) as u8;
            let g = ((y * 255) / height.max(1)) as u8;
            data.extend_from_slice(&[b, g, shift, 255]);
        }
    }
    ImageBuffer::new(width, height, PixelFormat::Bgra32, data)
}

/// Feeds synthetic frames into a [`SimSession`] at a fixed rate.
#[derive(Debug, Clone)]
pub struct FrameSource {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Stop after this many frames; `None` runs until stopped
    pub limit: Option<u64>,
}

impl FrameSource {
    /// Start feeding `session` on a background thread.
    ///
    /// The thread exits when `stop` is set or the limit is reached and
    /// returns the number of frames the session accepted.
    pub fn spawn(
        self,
        session: SimSession,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<u64>> {
        thread::Builder::new()
            .name("sim-frame-source".to_string())
            .spawn(move || self.run(&session, &stop))
    }

    fn run(&self, session: &SimSession, stop: &AtomicBool) -> u64 {
        let interval = Duration::from_secs(1) / self.fps.max(1);
        let started = Instant::now();
        let mut sequence = 0u64;
        let mut accepted = 0u64;

        while !stop.load(Ordering::Relaxed) && self.limit.map_or(true, |n| sequence < n) {
            let image = test_pattern(self.width, self.height, sequence);
            if session.deliver(SampleBuffer::new(started.elapsed(), image)) {
                accepted += 1;
            }
            sequence += 1;
            thread::sleep(interval);
        }

        log::debug!(
            "Frame source stopped after {} frame(s), {} accepted",
            sequence,
            accepted
        );
        accepted
    }
}
