//! twindeck - headless two-deck DJ player
//!
//! Plays two decks through the default output device and takes keyboard
//! commands in the terminal. Usage: `twindeck [--config PATH] [TRACK_A] [TRACK_B]`

use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use crossterm::{
    cursor,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, MouseButton, MouseEventKind},
    execute, queue,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use tracing_subscriber::EnvFilter;

use twindeck_audio::{Deck, DeckId, Engine, EngineCommand, EngineRenderer, EngineSnapshot};
use twindeck_input::{
    Command, InputHandler, JogView, Mode, OverviewView, PlaybackView, TransportSync, ZoomView,
};
use twindeck_library::{format_length, Config, TrackLoader};

/// UI tick: view sync and status redraw
const TICK: Duration = Duration::from_millis(33);

/// Command line arguments
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    tracks: Vec<PathBuf>,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = Args::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let path = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                    args.config = Some(PathBuf::from(path));
                }
                "-h" | "--help" => {
                    println!("usage: twindeck [--config PATH] [TRACK_A] [TRACK_B]");
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => bail!("unknown option {}", flag),
                _ => args.tracks.push(PathBuf::from(arg)),
            }
        }
        if args.tracks.len() > 2 {
            bail!("at most two tracks (one per deck)");
        }
        Ok(args)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse()?;
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // Get audio host and device
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No audio output device found"))?;
    let stream_config = pick_stream_config(&device, config.sample_rate)?;
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels as usize;
    tracing::info!(
        "Output: {} ({} Hz, {} channels)",
        device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate,
        channels
    );

    let loader = Arc::new(TrackLoader::with_sample_rate(sample_rate));
    let (mut engine, renderer) = Engine::new(config.engine_config(sample_rate), loader);

    let stream = build_stream(&device, &stream_config, renderer, config.max_block_frames)?;
    stream.play().context("Failed to start audio")?;

    for (track, id) in args.tracks.iter().zip(DeckId::ALL) {
        if let Err(e) = engine.handle_command(EngineCommand::Load(id, track.clone())) {
            tracing::error!("Deck {}: {}", id, e);
        }
    }

    // Terminal input runs on its own thread
    let (event_tx, event_rx) = bounded(1024);
    let shutdown = Arc::new(AtomicBool::new(false));
    enable_raw_mode()?;
    execute!(stdout(), EnableMouseCapture)?;
    let input_handle = {
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || run_input_thread(event_tx, shutdown))
    };

    let result = run_control_loop(&mut engine, event_rx);

    // Cleanup
    shutdown.store(true, Ordering::SeqCst);
    let _ = execute!(stdout(), DisableMouseCapture, Print("\r\n"));
    disable_raw_mode()?;
    let _ = input_handle.join();
    drop(stream);

    result
}

/// Prefer an f32 config at `preferred_rate`, else the device default
fn pick_stream_config(device: &cpal::Device, preferred_rate: u32) -> anyhow::Result<cpal::StreamConfig> {
    let rate = cpal::SampleRate(preferred_rate);
    if let Ok(mut ranges) = device.supported_output_configs() {
        let matching = ranges.find(|r| {
            r.sample_format() == cpal::SampleFormat::F32
                && r.min_sample_rate() <= rate
                && rate <= r.max_sample_rate()
        });
        if let Some(range) = matching {
            return Ok(range.with_sample_rate(rate).config());
        }
    }

    let default = device
        .default_output_config()
        .context("Failed to get audio config")?;
    if default.sample_format() != cpal::SampleFormat::F32 {
        bail!("Output device does not support f32 samples ({:?})", default.sample_format());
    }
    tracing::warn!(
        "{} Hz not available, using device default {} Hz",
        preferred_rate,
        default.sample_rate().0
    );
    Ok(default.config())
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: EngineRenderer,
    max_block_frames: usize,
) -> anyhow::Result<cpal::Stream> {
    let channels = config.channels as usize;
    // Pre-allocated stereo buffer for devices that are not stereo
    let mut stereo_buffer = vec![0.0f32; max_block_frames * 2];

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if channels == 2 {
                    renderer.process(data);
                    return;
                }

                let frames = data.len() / channels;
                if stereo_buffer.len() < frames * 2 {
                    stereo_buffer.resize(frames * 2, 0.0);
                }
                let stereo = &mut stereo_buffer[..frames * 2];
                renderer.process(stereo);
                for (out, frame) in data.chunks_exact_mut(channels).zip(stereo.chunks_exact(2)) {
                    if channels == 1 {
                        out[0] = (frame[0] + frame[1]) * 0.5;
                    } else {
                        out[0] = frame[0];
                        out[1] = frame[1];
                        out[2..].fill(0.0);
                    }
                }
            },
            |err| tracing::error!("Audio stream error: {}", err),
            None,
        )
        .context("Failed to create audio stream")?;
    Ok(stream)
}

fn run_input_thread(tx: Sender<Event>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Relaxed) {
        match event::poll(Duration::from_millis(50)) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Input error: {}", e);
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Input error: {}", e);
                break;
            }
        }
    }
}

/// Per-deck view state kept by the control loop
///
/// Left drag scrubs the overview, right drag the zoomed strip and middle
/// drag turns the jog wheel around the centre of the terminal.
struct DeckView {
    overview: OverviewView,
    zoom: ZoomView,
    jog: JogView,
    sync: TransportSync,
}

impl DeckView {
    fn new(width: u16) -> Self {
        Self {
            overview: OverviewView::new(width),
            zoom: ZoomView::new(0.0),
            jog: JogView::new(0.0),
            sync: TransportSync::new(),
        }
    }

    fn handle_mouse(&mut self, kind: MouseEventKind, column: u16, row: u16, size: (u16, u16)) {
        match kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                self.overview.press(column)
            }
            MouseEventKind::Up(MouseButton::Left) => self.overview.release(),
            MouseEventKind::Down(MouseButton::Right) | MouseEventKind::Drag(MouseButton::Right) => {
                self.zoom.drag_to(column)
            }
            MouseEventKind::Up(MouseButton::Right) => self.zoom.release(),
            MouseEventKind::Down(MouseButton::Middle) | MouseEventKind::Drag(MouseButton::Middle) => {
                let dx = column as f64 - size.0 as f64 / 2.0;
                let dy = row as f64 - size.1 as f64 / 2.0;
                self.jog.turn_to(dy.atan2(dx));
            }
            MouseEventKind::Up(MouseButton::Middle) => self.jog.release(),
            _ => {}
        }
    }

    fn tick(&mut self, deck: &mut Deck) {
        let duration = deck.total_duration_secs();
        self.zoom.set_duration(duration);
        self.jog.set_duration(duration);
        self.sync.tick(
            deck,
            &mut [
                &mut self.overview as &mut dyn PlaybackView,
                &mut self.zoom,
                &mut self.jog,
            ],
        );
    }
}

fn run_control_loop(engine: &mut Engine, events: Receiver<Event>) -> anyhow::Result<()> {
    let mut input = InputHandler::new();
    let mut size = terminal::size().unwrap_or((80, 24));
    let mut views: [DeckView; 2] = std::array::from_fn(|_| DeckView::new(size.0));
    let mut message = String::new();

    loop {
        match events.recv_timeout(TICK) {
            Ok(Event::Key(key)) => match input.handle_key(key) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(Command::Engine(cmd))) => {
                    let target = command_deck(&cmd);
                    match engine.handle_command(cmd) {
                        Ok(()) => message.clear(),
                        Err(e) => message = e.to_string(),
                    }
                    if let Some(id) = target {
                        views[id.index()]
                            .sync
                            .set_play_intent(engine.deck(id).is_playing());
                    }
                }
                Ok(Some(Command::CycleFocus(id))) => message = format!("focus: deck {}", id),
                Ok(Some(_)) => message.clear(),
                Ok(None) => {}
                Err(e) => message = e.to_string(),
            },
            // Mouse drags on any row scrub the focused deck
            Ok(Event::Mouse(mouse)) => {
                views[input.focused_deck().index()].handle_mouse(mouse.kind, mouse.column, mouse.row, size);
            }
            Ok(Event::Resize(w, h)) => {
                size = (w, h);
                for view in views.iter_mut() {
                    view.overview.set_width(w);
                }
            }
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        engine.collect_retired();
        for id in DeckId::ALL {
            views[id.index()].tick(engine.deck_mut(id));
        }
        draw_status(&engine.snapshot(), &input, &message)?;
    }
    Ok(())
}

/// Deck whose play state a command may change
fn command_deck(cmd: &EngineCommand) -> Option<DeckId> {
    match cmd {
        EngineCommand::Load(id, _)
        | EngineCommand::Eject(id)
        | EngineCommand::Start(id)
        | EngineCommand::Stop(id)
        | EngineCommand::Toggle(id)
        | EngineCommand::CaptureOrRecallCue(id, _) => Some(*id),
        _ => None,
    }
}

fn draw_status(snapshot: &EngineSnapshot, input: &InputHandler, message: &str) -> io::Result<()> {
    let mut line = format!("{} ", input.mode().display_name());
    for id in DeckId::ALL {
        let deck = snapshot.deck(id);
        let focus = if id == input.focused_deck() { '*' } else { ' ' };
        let state = match (deck.loaded, deck.playing) {
            (false, _) => "--",
            (true, true) => "|>",
            (true, false) => "||",
        };
        line.push_str(&format!(
            "{}{} {} {}/{} vol {:.2} spd {:.2} {:>6.1}dB cues {} | ",
            focus,
            id,
            state,
            format_length(deck.position_secs, true),
            format_length(deck.duration_secs, false),
            deck.volume,
            deck.speed_ratio,
            deck.loudness_db,
            deck.cues.len(),
        ));
    }
    line.push_str(&format!("xf {:+.1}", snapshot.crossfade));
    match input.mode() {
        Mode::Command => line.push_str(&format!(" :{}", input.command_buffer())),
        Mode::Normal if !message.is_empty() => line.push_str(&format!(" [{}]", message)),
        Mode::Normal => {}
    }

    let mut out = stdout();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line))?;
    out.flush()
}
