use bevy::prelude::*;
use constants::sensor::START_RETRY_INTERVAL_TICKS;

use crate::engine::error::SensorError;
use crate::engine::sensor::frame::{ColorFrame, DepthFrame, Skeleton};
use crate::engine::sensor::source::SensorFrameSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Stopped,
    Starting,
    Capturing,
}

/// Owns the frame source and drives `Stopped → Starting → Capturing`.
///
/// A refused or stalled start drops back to `Stopped` and schedules exactly
/// one new attempt [`START_RETRY_INTERVAL_TICKS`] ticks later. `Capturing` is
/// only left through [`SensorDevice::shutdown`], which also runs on drop.
#[derive(Resource)]
pub struct SensorDevice {
    source: Box<dyn SensorFrameSource>,
    state: SensorState,
    tick: u64,
    next_attempt: u64,
    starting_since: u64,
    start_attempts: u32,
    last_error: Option<SensorError>,
}

impl SensorDevice {
    pub fn new(source: Box<dyn SensorFrameSource>) -> Self {
        Self {
            source,
            state: SensorState::Stopped,
            tick: 0,
            next_attempt: 0,
            starting_since: 0,
            start_attempts: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == SensorState::Capturing
    }

    pub fn start_attempts(&self) -> u32 {
        self.start_attempts
    }

    pub fn last_error(&self) -> Option<&SensorError> {
        self.last_error.as_ref()
    }

    /// Advance one tick. Returns the state after the tick.
    pub fn tick(&mut self) -> SensorState {
        match self.state {
            SensorState::Stopped if self.tick >= self.next_attempt => self.begin_start(),
            SensorState::Starting => self.confirm_start(),
            _ => {}
        }
        self.tick += 1;
        self.state
    }

    fn begin_start(&mut self) {
        self.state = SensorState::Starting;
        self.start_attempts += 1;
        self.starting_since = self.tick;
        info!(
            "Starting {} sensor (attempt {})",
            self.source.name(),
            self.start_attempts
        );

        match self.source.start() {
            Ok(()) => self.confirm_start(),
            Err(err) => self.fail_start(err),
        }
    }

    fn confirm_start(&mut self) {
        if self.source.is_capturing() {
            self.state = SensorState::Capturing;
            self.last_error = None;
            info!("✓ {} sensor capturing", self.source.name());
        } else if self.tick >= self.starting_since + START_RETRY_INTERVAL_TICKS {
            self.source.stop();
            self.fail_start(SensorError::StartTimedOut {
                ticks: START_RETRY_INTERVAL_TICKS,
            });
        }
    }

    fn fail_start(&mut self, err: SensorError) {
        warn!(
            "{}; retrying in {} ticks",
            err, START_RETRY_INTERVAL_TICKS
        );
        self.state = SensorState::Stopped;
        self.next_attempt = self.tick + START_RETRY_INTERVAL_TICKS;
        self.last_error = Some(err);
    }

    pub fn poll_depth_frame(&mut self) -> Option<DepthFrame> {
        self.is_capturing()
            .then(|| self.source.poll_depth_frame())
            .flatten()
    }

    pub fn poll_color_frame(&mut self) -> Option<ColorFrame> {
        self.is_capturing()
            .then(|| self.source.poll_color_frame())
            .flatten()
    }

    pub fn poll_skeletons(&mut self) -> Option<Vec<Skeleton>> {
        self.is_capturing()
            .then(|| self.source.poll_skeletons())
            .flatten()
    }

    pub fn shutdown(&mut self) {
        if self.state == SensorState::Stopped {
            return;
        }
        self.source.stop();
        self.state = SensorState::Stopped;
        info!("{} sensor stopped", self.source.name());
    }
}

impl Drop for SensorDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Frames delivered this tick. Cleared every tick; nothing here is retained.
#[derive(Resource, Default)]
pub struct SensorFrames {
    pub depth: Option<DepthFrame>,
    pub color: Option<ColorFrame>,
    pub skeletons: Option<Vec<Skeleton>>,
}

pub fn drive_sensor_device(mut device: ResMut<SensorDevice>) {
    device.tick();
}

pub fn poll_sensor_frames(mut device: ResMut<SensorDevice>, mut frames: ResMut<SensorFrames>) {
    frames.depth = device.poll_depth_frame();
    frames.color = device.poll_color_frame();
    frames.skeletons = device.poll_skeletons();
}

/// Stop the device as soon as the app is asked to exit, whichever path requested it.
pub fn release_sensor_on_exit(
    mut exit_events: EventReader<AppExit>,
    device: Option<ResMut<SensorDevice>>,
) {
    if exit_events.read().next().is_none() {
        return;
    }
    if let Some(mut device) = device {
        device.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Refuses a fixed number of starts and records every call.
    struct ScriptedSource {
        refusals: u32,
        starts: Arc<AtomicU32>,
        stops: Arc<AtomicU32>,
        capturing: bool,
        confirms: bool,
    }

    impl ScriptedSource {
        fn new(refusals: u32) -> (Self, Arc<AtomicU32>, Arc<AtomicU32>) {
            let starts = Arc::new(AtomicU32::new(0));
            let stops = Arc::new(AtomicU32::new(0));
            let source = Self {
                refusals,
                starts: starts.clone(),
                stops: stops.clone(),
                capturing: false,
                confirms: true,
            };
            (source, starts, stops)
        }
    }

    impl SensorFrameSource for ScriptedSource {
        fn start(&mut self) -> Result<(), SensorError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.refusals > 0 {
                self.refusals -= 1;
                return Err(SensorError::DeviceNotFound);
            }
            self.capturing = self.confirms;
            Ok(())
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.capturing = false;
        }

        fn is_capturing(&self) -> bool {
            self.capturing
        }

        fn poll_depth_frame(&mut self) -> Option<DepthFrame> {
            Some(DepthFrame::filled(2, 2, 1000))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn starts_on_first_tick() {
        let (source, starts, _) = ScriptedSource::new(0);
        let mut device = SensorDevice::new(Box::new(source));

        assert_eq!(device.state(), SensorState::Stopped);
        assert_eq!(device.tick(), SensorState::Capturing);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_start_retries_exactly_once_at_tick_ninety() {
        let (source, starts, _) = ScriptedSource::new(2);
        let mut device = SensorDevice::new(Box::new(source));

        // Tick 0: first attempt fails.
        assert_eq!(device.tick(), SensorState::Stopped);
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        // Ticks 1..=89: no attempts.
        for _ in 1..90 {
            assert_eq!(device.tick(), SensorState::Stopped);
        }
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        // Tick 90: exactly one retry, which fails again.
        device.tick();
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        device.tick();
        assert_eq!(starts.load(Ordering::SeqCst), 2);

        // Tick 180: third attempt succeeds.
        for _ in 92..180 {
            device.tick();
        }
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(device.tick(), SensorState::Capturing);
        assert_eq!(starts.load(Ordering::SeqCst), 3);
        assert_eq!(device.start_attempts(), 3);
    }

    #[test]
    fn stalled_start_times_out_and_schedules_retry() {
        let (mut source, starts, stops) = ScriptedSource::new(0);
        source.confirms = false;
        let mut device = SensorDevice::new(Box::new(source));

        assert_eq!(device.tick(), SensorState::Starting);
        for _ in 1..90 {
            assert_eq!(device.tick(), SensorState::Starting);
        }
        assert_eq!(device.tick(), SensorState::Stopped);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(matches!(
            device.last_error(),
            Some(SensorError::StartTimedOut { .. })
        ));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capturing_only_ends_on_shutdown() {
        let (source, _, stops) = ScriptedSource::new(0);
        let mut device = SensorDevice::new(Box::new(source));
        device.tick();

        for _ in 0..500 {
            assert_eq!(device.tick(), SensorState::Capturing);
        }
        assert!(device.poll_depth_frame().is_some());

        device.shutdown();
        assert_eq!(device.state(), SensorState::Stopped);
        assert!(device.poll_depth_frame().is_none());
        drop(device);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn polling_while_stopped_yields_nothing() {
        let (source, _, _) = ScriptedSource::new(1);
        let mut device = SensorDevice::new(Box::new(source));
        device.tick();
        assert!(device.poll_depth_frame().is_none());
        assert!(device.poll_skeletons().is_none());
    }

    #[test]
    fn frames_resource_follows_device() {
        let (source, _, _) = ScriptedSource::new(0);
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(SensorDevice::new(Box::new(source)))
            .init_resource::<SensorFrames>()
            .add_systems(Update, (drive_sensor_device, poll_sensor_frames).chain());

        app.update();

        let frames = app.world().resource::<SensorFrames>();
        assert_eq!(frames.depth.as_ref().map(DepthFrame::pixel_count), Some(4));
        assert!(frames.skeletons.is_none());
    }
}
