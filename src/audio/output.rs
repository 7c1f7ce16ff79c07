//! Playback on OS output devices using cpal for enumeration and rodio for streaming
//!
//! rodio's `OutputStream` is not `Send`, so each `play` call opens its own
//! stream on the calling thread and drops it once the sink drains.

use super::{AudioOutput, Device, Waveform};
use crate::error::{TalkError, TalkResult};
use cpal::traits::{DeviceTrait, HostTrait};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a previously listed device against the current OS state
    ///
    /// The index is tried first; if the device at that position was renamed
    /// or replaced, fall back to a name match.
    fn resolve(&self, device: &Device) -> TalkResult<cpal::Device> {
        let host = cpal::default_host();
        let mut candidates: Vec<cpal::Device> = host
            .output_devices()
            .map_err(|e| TalkError::DeviceQuery(e.to_string()))?
            .collect();

        let matches = |d: &cpal::Device| d.name().ok().as_deref() == Some(device.name.as_str());
        let position = match candidates.get(device.index) {
            Some(d) if matches(d) => Some(device.index),
            _ => candidates.iter().position(matches),
        };

        position
            .map(|i| candidates.swap_remove(i))
            .ok_or_else(|| TalkError::DeviceUnavailable(device.to_string()))
    }
}

impl AudioOutput for CpalOutput {
    fn output_devices(&self) -> TalkResult<Vec<Device>> {
        let host = cpal::default_host();
        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let devices = host
            .output_devices()
            .map_err(|e| TalkError::DeviceQuery(e.to_string()))?
            .enumerate()
            .map(|(i, d)| {
                let name = d.name().unwrap_or_else(|_| "Unknown".to_string());
                let is_default = default_name.as_deref() == Some(name.as_str());
                Device::new(i, name, is_default)
            })
            .collect::<Vec<_>>();

        debug!("Found {} output devices on {:?}", devices.len(), host.id());
        Ok(devices)
    }

    fn play(&self, waveform: &Waveform, device: &Device) -> TalkResult<()> {
        let cpal_device = self.resolve(device)?;

        let (_stream, handle) = OutputStream::try_from_device(&cpal_device)
            .map_err(|e| TalkError::DeviceUnavailable(format!("{}: {}", device, e)))?;
        let sink = Sink::try_new(&handle).map_err(|e| TalkError::Playback(e.to_string()))?;

        info!("🔊 Playing {:?} on {}", waveform.duration(), device);
        sink.append(SamplesBuffer::new(
            waveform.channels(),
            waveform.sample_rate(),
            waveform.samples().to_vec(),
        ));
        sink.sleep_until_end();
        debug!("Playback finished on {}", device);

        Ok(())
    }

    fn name(&self) -> &str {
        "cpal"
    }
}
