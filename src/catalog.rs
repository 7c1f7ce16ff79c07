//! Device and voice catalog
//!
//! Holds the most recent enumeration of output devices and voices. The lists
//! only change when [`DeviceCatalog::refresh`] is called; there is no hot-plug
//! tracking.

use crate::audio::{AudioOutput, Device};
use crate::error::{TalkError, TalkResult};
use crate::tts::{Voice, VoiceBackend};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Case-insensitive substring match against any non-empty pattern
pub fn matches_any(name: &str, patterns: &[String]) -> bool {
    let name = name.to_lowercase();
    patterns
        .iter()
        .any(|p| !p.is_empty() && name.contains(&p.to_lowercase()))
}

/// Pick the output device to treat as the virtual microphone
///
/// First device (in enumeration order) whose name matches a cable pattern,
/// else the OS default, else the first device.
pub fn pick_default<'a>(devices: &'a [Device], patterns: &[String]) -> Option<&'a Device> {
    devices
        .iter()
        .find(|d| matches_any(&d.name, patterns))
        .or_else(|| devices.iter().find(|d| d.is_default))
        .or_else(|| devices.first())
}

/// One enumeration of both lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub devices: Vec<Device>,
    pub voices: Vec<Voice>,
}

#[derive(Debug)]
pub struct DeviceCatalog {
    output: Arc<dyn AudioOutput>,
    voices: Arc<dyn VoiceBackend>,
    cable_patterns: Vec<String>,
    snapshot: RwLock<CatalogSnapshot>,
}

fn query_error(err: TalkError) -> TalkError {
    match err {
        TalkError::DeviceQuery(_) => err,
        other => TalkError::DeviceQuery(other.to_string()),
    }
}

impl DeviceCatalog {
    /// Create an empty catalog; call [`refresh`](Self::refresh) to populate it
    pub fn new(
        output: Arc<dyn AudioOutput>,
        voices: Arc<dyn VoiceBackend>,
        cable_patterns: Vec<String>,
    ) -> Self {
        Self {
            output,
            voices,
            cable_patterns,
            snapshot: RwLock::new(CatalogSnapshot::default()),
        }
    }

    /// Query the OS for output devices without touching the cached lists
    pub fn list_output_devices(&self) -> TalkResult<Vec<Device>> {
        self.output.output_devices().map_err(query_error)
    }

    /// Query the OS for voices without touching the cached lists
    pub fn list_voices(&self) -> TalkResult<Vec<Voice>> {
        self.voices.voices().map_err(query_error)
    }

    pub fn pick_default<'a>(&self, devices: &'a [Device]) -> Option<&'a Device> {
        pick_default(devices, &self.cable_patterns)
    }

    /// Re-enumerate devices and voices, replacing the cached lists wholesale
    ///
    /// On failure the previous lists are left untouched.
    pub fn refresh(&self) -> TalkResult<CatalogSnapshot> {
        let fresh = CatalogSnapshot {
            devices: self.list_output_devices()?,
            voices: self.list_voices()?,
        };

        info!(
            "🔄 Catalog refreshed: {} devices, {} voices",
            fresh.devices.len(),
            fresh.voices.len()
        );
        *self.snapshot.write()? = fresh.clone();
        Ok(fresh)
    }

    /// Re-enumerate devices only, keeping the cached voices
    pub fn refresh_devices(&self) -> TalkResult<Vec<Device>> {
        let devices = self.list_output_devices()?;
        debug!("Device list refreshed: {} devices", devices.len());
        self.snapshot.write()?.devices = devices.clone();
        Ok(devices)
    }

    pub fn snapshot(&self) -> TalkResult<CatalogSnapshot> {
        Ok(self.snapshot.read()?.clone())
    }

    pub fn devices(&self) -> TalkResult<Vec<Device>> {
        Ok(self.snapshot.read()?.devices.clone())
    }

    pub fn voices(&self) -> TalkResult<Vec<Voice>> {
        Ok(self.snapshot.read()?.voices.clone())
    }

    /// Cached device at `index`
    pub fn device(&self, index: usize) -> TalkResult<Option<Device>> {
        Ok(self
            .snapshot
            .read()?
            .devices
            .iter()
            .find(|d| d.index == index)
            .cloned())
    }

    /// Cached device whose name contains `name`, case-insensitively
    pub fn device_named(&self, name: &str) -> TalkResult<Option<Device>> {
        let wanted = [name.to_string()];
        Ok(self
            .snapshot
            .read()?
            .devices
            .iter()
            .find(|d| matches_any(&d.name, &wanted))
            .cloned())
    }

    /// [`pick_default`] applied to the cached device list
    pub fn default_device(&self) -> TalkResult<Option<Device>> {
        let snapshot = self.snapshot.read()?;
        Ok(self.pick_default(&snapshot.devices).cloned())
    }
}
