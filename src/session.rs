//! Wiring for one run of the application
//!
//! Owns the long-lived catalog, engine and router and turns configuration plus
//! user choices into [`SpeechRequest`]s.

use crate::audio::{AudioOutput, AudioRouter, CpalOutput, Device};
use crate::catalog::DeviceCatalog;
use crate::config::Config;
use crate::error::{TalkError, TalkResult};
use crate::queue::{QueueEvent, SpeechQueue, SpeechRequest};
use crate::tts::{EspeakBackend, SpeechEngine, VoiceBackend};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Session {
    pub config: Config,
    pub catalog: Arc<DeviceCatalog>,
    pub engine: SpeechEngine,
    pub router: Arc<AudioRouter>,
}

impl Session {
    pub fn new(config: Config, output: Arc<dyn AudioOutput>, voices: Arc<dyn VoiceBackend>) -> Self {
        let catalog = Arc::new(DeviceCatalog::new(
            Arc::clone(&output),
            Arc::clone(&voices),
            config.virtual_cable_patterns.clone(),
        ));

        Self {
            catalog,
            engine: SpeechEngine::new(voices),
            router: Arc::new(AudioRouter::new(output)),
            config,
        }
    }

    /// Session backed by the OS audio stack and espeak-ng
    pub fn from_config(config: Config) -> TalkResult<Self> {
        config.validate()?;
        let output = Arc::new(CpalOutput::new());
        let voices = Arc::new(EspeakBackend::new(config.espeak_binary.clone()));
        info!("🛠️ Audio output: {}, voice engine: {}", output.name(), voices.name());
        Ok(Self::new(config, output, voices))
    }

    /// Resolve the device that plays into the virtual microphone
    ///
    /// An explicit index wins, then the configured name, then the catalog's
    /// cable heuristic.
    pub fn primary_device(&self, index: Option<usize>) -> TalkResult<Device> {
        if let Some(index) = index {
            return self
                .catalog
                .device(index)?
                .ok_or_else(|| TalkError::DeviceUnavailable(format!("no output device #{}", index)));
        }

        if let Some(name) = &self.config.primary_device {
            match self.catalog.device_named(name)? {
                Some(device) => return Ok(device),
                None => warn!("⚠️ Configured primary device '{}' not found", name),
            }
        }

        self.catalog.default_device()?.ok_or_else(|| {
            TalkError::DeviceUnavailable("no virtual microphone or output device found".into())
        })
    }

    /// Resolve the optional monitor device
    ///
    /// An explicit index must exist; a configured name that has disappeared
    /// just disables monitoring.
    pub fn monitor_device(&self, index: Option<usize>) -> TalkResult<Option<Device>> {
        if let Some(index) = index {
            return self
                .catalog
                .device(index)?
                .map(Some)
                .ok_or_else(|| TalkError::DeviceUnavailable(format!("no output device #{}", index)));
        }

        match &self.config.monitor_device {
            Some(name) => {
                let device = self.catalog.device_named(name)?;
                if device.is_none() {
                    warn!("⚠️ Configured monitor device '{}' not found, monitoring off", name);
                }
                Ok(device)
            }
            None => Ok(None),
        }
    }

    /// Build a request using the configured voice, rate and volume
    pub fn request(&self, text: &str, primary: Device, monitor: Option<Device>) -> SpeechRequest {
        SpeechRequest::new(text, primary)
            .voice(self.config.voice.clone())
            .rate(self.config.rate)
            .volume(self.config.volume)
            .monitor(monitor)
    }

    pub fn spawn_queue(&self) -> (SpeechQueue, UnboundedReceiver<QueueEvent>) {
        SpeechQueue::spawn(
            self.engine.clone(),
            Arc::clone(&self.router),
            Arc::clone(&self.catalog),
        )
    }
}
