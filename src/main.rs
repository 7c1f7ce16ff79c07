//! talkasmic - speak typed text through a virtual microphone
//!
//! Command-line front end over the speech queue.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use talkasmic::audio::Device;
use talkasmic::config::{self, Config};
use talkasmic::queue::{QueueEvent, RequestState, SpeechQueue};
use talkasmic::session::Session;
use talkasmic::shell::{self, ShellInput};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List audio output devices
    Devices,
    /// List installed voices
    Voices,
    /// Speak one piece of text and wait for it to finish
    Say {
        text: String,
        #[command(flatten)]
        route: RouteArgs,
        #[command(flatten)]
        speech: SpeechArgs,
    },
    /// Write synthesized speech to a WAV file
    Export {
        text: String,
        /// Destination WAV file
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        speech: SpeechArgs,
    },
    /// Read lines from stdin and speak each one (default)
    Interactive {
        #[command(flatten)]
        route: RouteArgs,
        #[command(flatten)]
        speech: SpeechArgs,
    },
    /// Write the default config file if none exists
    InitConfig,
}

#[derive(clap::Args, Debug, Default, Clone)]
struct RouteArgs {
    /// Output device index for the virtual microphone
    #[arg(short, long)]
    device: Option<usize>,

    /// Output device index to monitor on
    #[arg(short, long)]
    monitor: Option<usize>,
}

#[derive(clap::Args, Debug, Default, Clone)]
struct SpeechArgs {
    /// Voice id (see `voices`)
    #[arg(long)]
    voice: Option<String>,

    /// Speaking rate, -10 to 10
    #[arg(short, long, allow_negative_numbers = true)]
    rate: Option<i32>,

    /// Volume, 0 to 100
    #[arg(long)]
    volume: Option<i32>,
}

impl SpeechArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(voice) = &self.voice {
            config.voice = Some(voice.clone());
        }
        if let Some(rate) = self.rate {
            config.rate = rate;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
    }
}

fn init_logging(verbose: bool, configured: &str) -> Result<()> {
    let fallback = if verbose { "debug" } else { configured };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let (mut config, recovered) = Config::load_from(&config_path)?;

    init_logging(args.verbose, &config.log_level)?;
    info!("🎙️ talkasmic v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Config: {}", config_path.display());
    if let Some(recovered) = recovered {
        warn!(
            "⚠️ Config file corrupted or invalid, using defaults: {}",
            recovered.reason
        );
        if let Some(backup) = recovered.backup {
            warn!("⚠️ Unreadable config moved to {}", backup.display());
        }
    }

    let command = args.command.unwrap_or(Cmd::Interactive {
        route: RouteArgs::default(),
        speech: SpeechArgs::default(),
    });

    match &command {
        Cmd::InitConfig => return init_config(&config_path, &config),
        Cmd::Say { speech, .. } | Cmd::Export { speech, .. } | Cmd::Interactive { speech, .. } => {
            speech.apply(&mut config)
        }
        Cmd::Devices | Cmd::Voices => {}
    }

    let session = Session::from_config(config)?;
    if matches!(command, Cmd::Devices) {
        session.catalog.refresh_devices()?;
    } else {
        session.catalog.refresh()?;
    }

    match command {
        Cmd::Devices => list_devices(&session),
        Cmd::Voices => list_voices(&session),
        Cmd::Say { text, route, .. } => say(&session, &text, &route).await,
        Cmd::Export { text, out, .. } => export(&session, text, out).await,
        Cmd::Interactive { route, .. } => interactive(&session, &route).await,
        Cmd::InitConfig => Ok(()),
    }
}

fn init_config(path: &Path, config: &Config) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
    } else {
        config.save_to(path)?;
        println!("Wrote default config: {}", path.display());
    }
    Ok(())
}

fn list_devices(session: &Session) -> Result<()> {
    let devices = session.catalog.devices()?;
    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }

    let picked = session.catalog.pick_default(&devices).map(|d| d.index);
    for device in &devices {
        let mut tags = Vec::new();
        if picked == Some(device.index) {
            tags.push("virtual mic");
        }
        if device.is_default {
            tags.push("default");
        }
        if tags.is_empty() {
            println!("{}", device);
        } else {
            println!("{}  [{}]", device, tags.join(", "));
        }
    }
    Ok(())
}

fn list_voices(session: &Session) -> Result<()> {
    let voices = session.catalog.voices()?;
    if voices.is_empty() {
        println!("No voices installed. Install espeak-ng voice data first.");
    }
    for voice in voices {
        println!("{:>3}  {:<12} {}", voice.index, voice.id, voice);
    }
    Ok(())
}

async fn say(session: &Session, text: &str, route: &RouteArgs) -> Result<()> {
    let primary = session.primary_device(route.device)?;
    let monitor = session.monitor_device(route.monitor)?;

    let (queue, mut events) = session.spawn_queue();
    let id = queue.enqueue(session.request(text, primary, monitor))?;
    queue.shutdown()?;

    let mut outcome = None;
    while let Some(event) = events.recv().await {
        if let Some(line) = shell::describe(&event) {
            info!("{}", line);
        }
        if let QueueEvent::StateChanged { id: done, state } = event {
            if done == id && state.is_terminal() {
                outcome = Some(state);
            }
        }
    }

    match outcome {
        Some(RequestState::Completed) => Ok(()),
        Some(RequestState::Failed(e)) => bail!("{}", e),
        _ => bail!("Speech queue stopped before {} finished", id),
    }
}

async fn export(session: &Session, text: String, out: PathBuf) -> Result<()> {
    let engine = session.engine.clone();
    let voice = session.config.voice.clone();
    let (rate, volume) = (session.config.rate, session.config.volume);

    let target = out.clone();
    tokio::task::spawn_blocking(move || {
        engine.export(&text, voice.as_deref(), rate, volume, &target)
    })
    .await??;

    println!("Saved {}", out.display());
    Ok(())
}

async fn interactive(session: &Session, route: &RouteArgs) -> Result<()> {
    let primary = session.primary_device(route.device)?;
    let monitor = session.monitor_device(route.monitor)?;

    println!("Virtual microphone: {}", primary);
    match &monitor {
        Some(device) => println!("Monitor: {}", device),
        None => println!("Monitor: off"),
    }
    println!("{}", shell::HELP);

    let (queue, mut events) = session.spawn_queue();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(session, &queue, &line, &primary, &monitor)? {
                    break;
                }
            }
            Some(event) = events.recv() => report(&event, &primary, &monitor),
        }
    }

    queue.shutdown()?;
    drain(&mut events, &primary, &monitor).await;
    Ok(())
}

/// Act on one line of input; `false` once the user asks to quit
fn handle_line(
    session: &Session,
    queue: &SpeechQueue,
    line: &str,
    primary: &Device,
    monitor: &Option<Device>,
) -> Result<bool> {
    match shell::parse_line(line) {
        ShellInput::Quit => return Ok(false),
        ShellInput::Speak(text) => submit(session, queue, &text, primary, monitor)?,
        ShellInput::Test => submit(session, queue, shell::TEST_PHRASE, primary, monitor)?,
        ShellInput::Clear => queue.clear()?,
        ShellInput::Refresh => queue.refresh()?,
        ShellInput::Help => println!("{}", shell::HELP),
        ShellInput::Empty => println!("Please enter some text to speak."),
        ShellInput::Unknown(cmd) => println!("Unknown command ':{}', try :help", cmd),
    }
    Ok(true)
}

fn submit(
    session: &Session,
    queue: &SpeechQueue,
    text: &str,
    primary: &Device,
    monitor: &Option<Device>,
) -> Result<()> {
    let request = session.request(text, primary.clone(), monitor.clone());
    println!("{}", shell::stamp(&request.preview()));
    queue.enqueue(request)?;
    Ok(())
}

fn report(event: &QueueEvent, primary: &Device, monitor: &Option<Device>) {
    if let Some(line) = shell::describe(event) {
        println!("{}", shell::stamp(&line));
    }

    // Selections are kept across refreshes; only flag the ones that vanished
    if let QueueEvent::CatalogRefreshed(snapshot) = event {
        let present = |d: &Device| snapshot.devices.iter().any(|s| s.same_endpoint(d));
        if !present(primary) {
            warn!("⚠️ Virtual microphone {} is no longer listed", primary);
        }
        if let Some(monitor) = monitor.as_ref().filter(|m| !present(*m)) {
            warn!("⚠️ Monitor {} is no longer listed", monitor);
        }
    }
}

async fn drain(events: &mut UnboundedReceiver<QueueEvent>, primary: &Device, monitor: &Option<Device>) {
    while let Some(event) = events.recv().await {
        report(&event, primary, monitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use talkasmic::audio::{AudioOutput, Waveform};
    use talkasmic::tts::{Voice, VoiceBackend};
    use talkasmic::TalkResult;

    #[derive(Debug)]
    struct Quiet;

    impl AudioOutput for Quiet {
        fn output_devices(&self) -> TalkResult<Vec<Device>> {
            Ok(vec![Device::new(0, "CABLE Input (VB-Audio Virtual Cable)", true)])
        }

        fn play(&self, _waveform: &Waveform, _device: &Device) -> TalkResult<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "quiet"
        }
    }

    impl VoiceBackend for Quiet {
        fn voices(&self) -> TalkResult<Vec<Voice>> {
            Ok(Vec::new())
        }

        fn render(&self, _text: &str, _voice: Option<&Voice>, _rate: i32, _volume: i32)
            -> TalkResult<Waveform> {
            Ok(Waveform::new(vec![0.1; 16], 16000, 1))
        }

        fn name(&self) -> &str {
            "quiet"
        }
    }

    #[tokio::test]
    async fn test_shell_lines_drive_the_queue() {
        let quiet = Arc::new(Quiet);
        let session = Session::new(Config::default(), quiet.clone(), quiet);
        session.catalog.refresh().expect("refresh");
        let primary = session.primary_device(None).expect("primary");
        let (queue, mut events) = session.spawn_queue();

        for line in ["hello", ":test", ":refresh", ":help", "   ", ":bogus"] {
            assert!(handle_line(&session, &queue, line, &primary, &None).expect(line));
        }
        assert!(!handle_line(&session, &queue, ":quit", &primary, &None).expect("quit"));

        queue.shutdown().expect("shutdown");
        let mut submitted = 0;
        while let Some(event) = events.recv().await {
            if let QueueEvent::StateChanged { state: RequestState::Pending, .. } = event {
                submitted += 1;
            }
        }
        assert_eq!(submitted, 2);
    }

    #[test]
    fn test_negative_rate_is_accepted() {
        let args = Args::try_parse_from(["talkasmic", "say", "hi", "-r", "-3"]).expect("parse");
        match args.command {
            Some(Cmd::Say { speech, .. }) => assert_eq!(speech.rate, Some(-3)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_interactive_is_optional() {
        let args = Args::try_parse_from(["talkasmic", "-v"]).expect("parse");
        assert!(args.verbose);
        assert!(args.command.is_none());
    }
}
