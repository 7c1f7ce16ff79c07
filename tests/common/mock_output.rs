//! Mock audio output for testing
//!
//! Devices can be listed yet missing at play time, like a cable unplugged
//! between a refresh and a submit.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use talkasmic::audio::{AudioOutput, Device, Waveform};
use talkasmic::{TalkError, TalkResult};

#[derive(Debug)]
pub struct MockOutput {
    pub devices: Mutex<Vec<Device>>,
    /// Names that fail with `DeviceUnavailable` when played on
    pub unplugged: Mutex<Vec<String>>,
    /// (device name, sample count) for every successful playback
    pub plays: Mutex<Vec<(String, usize)>>,
    pub fail_listing: AtomicBool,
    /// Names whose playback takes noticeably longer
    slow: Mutex<Vec<String>>,
    /// Plays currently running on a slow device, and the most ever seen
    slow_active: AtomicUsize,
    slow_max_active: AtomicUsize,
}

impl MockOutput {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices: Mutex::new(devices),
            unplugged: Mutex::new(Vec::new()),
            plays: Mutex::new(Vec::new()),
            fail_listing: AtomicBool::new(false),
            slow: Mutex::new(Vec::new()),
            slow_active: AtomicUsize::new(0),
            slow_max_active: AtomicUsize::new(0),
        }
    }

    pub fn unplug(&self, name: &str) {
        self.unplugged.lock().unwrap().push(name.to_string());
    }

    /// Make every play on `name` take 200ms
    pub fn slow_down(&self, name: &str) {
        self.slow.lock().unwrap().push(name.to_string());
    }

    /// Highest number of plays ever running at once on slowed devices
    pub fn max_concurrent_slow(&self) -> usize {
        self.slow_max_active.load(Ordering::SeqCst)
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn plays(&self) -> Vec<(String, usize)> {
        self.plays.lock().unwrap().clone()
    }

    pub fn plays_on(&self, name: &str) -> usize {
        self.plays.lock().unwrap().iter().filter(|(n, _)| n == name).count()
    }
}

impl AudioOutput for MockOutput {
    fn output_devices(&self) -> TalkResult<Vec<Device>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(TalkError::DeviceQuery("mock audio driver missing".into()));
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    fn play(&self, waveform: &Waveform, device: &Device) -> TalkResult<()> {
        let listed = self.devices.lock().unwrap().iter().any(|d| d.same_endpoint(device));
        let unplugged = self.unplugged.lock().unwrap().contains(&device.name);
        if !listed || unplugged {
            return Err(TalkError::DeviceUnavailable(device.to_string()));
        }

        if self.slow.lock().unwrap().contains(&device.name) {
            let now = self.slow_active.fetch_add(1, Ordering::SeqCst) + 1;
            self.slow_max_active.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            self.slow_active.fetch_sub(1, Ordering::SeqCst);
        } else {
            std::thread::sleep(Duration::from_millis(5));
        }

        self.plays
            .lock()
            .unwrap()
            .push((device.name.clone(), waveform.samples().len()));
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
