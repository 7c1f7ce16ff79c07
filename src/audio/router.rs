//! Routes one waveform to a primary device and, optionally, a monitor device
//!
//! The two streams are independent: the monitor runs on its own thread and
//! its outcome is only ever logged, never fed back into the primary result.
//! Monitor streams of consecutive calls queue up behind each other on
//! `monitor_lock`, so a device is never fed two utterances at once.

use super::{AudioOutput, Device, Waveform};
use crate::error::{TalkError, TalkResult};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, info, warn};

/// A monitor stream running alongside the primary one
#[derive(Debug)]
pub struct MonitorPlayback {
    device: Device,
    handle: thread::JoinHandle<TalkResult<()>>,
}

impl MonitorPlayback {
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Block until the monitor stream ends and return its outcome
    pub fn wait(self) -> TalkResult<()> {
        self.handle
            .join()
            .map_err(|_| TalkError::Playback(format!("monitor thread for {} panicked", self.device)))?
    }
}

#[derive(Debug)]
pub struct AudioRouter {
    output: Arc<dyn AudioOutput>,
    /// Held for the duration of one primary playback
    play_lock: Mutex<()>,
    /// Held by the monitor thread for the duration of one monitor playback
    monitor_lock: Arc<Mutex<()>>,
}

impl AudioRouter {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            play_lock: Mutex::new(()),
            monitor_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Play `waveform` on `primary`, mirroring it to `monitor` when that is a
    /// different endpoint.
    ///
    /// Returns once the primary stream finishes. The monitor stream, if one was
    /// started, is handed back so the caller can log its outcome; dropping it
    /// detaches the thread.
    pub fn play(
        &self,
        waveform: Arc<Waveform>,
        primary: &Device,
        monitor: Option<&Device>,
    ) -> TalkResult<Option<MonitorPlayback>> {
        if waveform.is_empty() {
            debug!("Nothing to play, skipping {}", primary);
            return Ok(None);
        }

        let _guard = self.play_lock.lock()?;

        let monitor = monitor
            .filter(|m| !m.same_endpoint(primary))
            .map(|m| self.spawn_monitor(Arc::clone(&waveform), m.clone()))
            .transpose()?;

        match self.output.play(&waveform, primary) {
            Ok(()) => {
                debug!("Primary playback complete on {}", primary);
                Ok(monitor)
            }
            Err(e) => {
                warn!("⚠️ Primary playback failed on {}: {}", primary, e);
                Err(e)
            }
        }
    }

    fn spawn_monitor(&self, waveform: Arc<Waveform>, device: Device) -> TalkResult<MonitorPlayback> {
        let output = Arc::clone(&self.output);
        let monitor_lock = Arc::clone(&self.monitor_lock);
        let target = device.clone();

        info!("🎧 Mirroring to monitor {}", device);
        let handle = thread::Builder::new()
            .name("talkasmic-monitor".into())
            .spawn(move || {
                let _guard = monitor_lock.lock()?;
                let result = output.play(&waveform, &target);
                if let Err(e) = &result {
                    warn!("⚠️ Monitor playback failed on {}: {}", target, e);
                }
                result
            })?;

        Ok(MonitorPlayback { device, handle })
    }
}
