//! Clarion - terminal listening-test player
//!
//! Plays a set of stimuli, or a reference against its conditions, through the
//! default output device with click-free switching.

mod control;
mod host;

use std::fs::{self, OpenOptions};
use std::io::{self, stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyEventKind},
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clarion_input::{Layout, Mode as InputMode};
use clarion_library::{Config, Session, StimulusLoader};
use control::{Controller, Output, HELP};

/// Poll interval of the control loop
const TICK: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "clarion")]
#[command(version, about = "Terminal listening-test player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Config file path (default: <config dir>/clarion/config.txt)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Session sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Frames per processing block
    #[arg(long)]
    block_frames: Option<usize>,

    /// Start comparison sessions with looping off
    #[arg(long)]
    no_loop: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Play independent stimuli, number keys select
    Generic {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Compare conditions against a reference on a shared timeline
    Compare {
        #[arg(short, long)]
        reference: PathBuf,
        #[arg(required = true)]
        conditions: Vec<PathBuf>,
    },
}

/// Log to a file; the terminal is in raw mode while running
fn init_logging() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clarion");
    fs::create_dir_all(&dir)?;
    let path = dir.join("clarion.log");
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging().context("failed to set up logging")?;

    let (config_path, mut config) = match &cli.config {
        Some(path) => (path.clone(), Config::load_from(path).unwrap_or_default()),
        None => (Config::config_path(), Config::load()),
    };
    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(frames) = cli.block_frames {
        config.block_frames = frames;
    }
    if cli.no_loop {
        config.looping = false;
    }

    let output = host::Output::open(config.sample_rate, config.block_frames)?;
    let sample_rate = output.sample_rate();
    let loader = StimulusLoader::with_sample_rate(sample_rate);

    let (session, first_file) = match &cli.mode {
        Mode::Generic { files } => (Session::generic(&loader, files)?, files.first()),
        Mode::Compare {
            reference,
            conditions,
        } => (
            Session::comparison(&loader, reference, conditions)?,
            Some(reference),
        ),
    };
    remember_folder(&mut config, &config_path, first_file.map(PathBuf::as_path));

    let layout = if session.is_comparison() {
        Layout::Comparison
    } else {
        Layout::Generic
    };
    let labels = session.labels();
    // Engine timings follow the rate the device actually runs at
    config.sample_rate = sample_rate;
    let engine_config = config.engine_config();
    let (player, engine) = session.into_player(&engine_config);
    let _stream = output.start(player, config.block_frames)?;
    info!(sample_rate, ?layout, log = %log_path.display(), "session started");

    let mut controller = Controller::new(engine, layout, labels.clone(), engine_config.looping);

    println!("clarion - {} at {} Hz", describe_layout(layout, &labels), sample_rate);
    println!("{}", HELP);

    enable_raw_mode()?;
    let result = run(&mut controller);
    disable_raw_mode()?;
    println!();

    if let Err(ref e) = result {
        warn!(error = %e, "control loop failed");
    }
    info!("session finished");
    result
}

fn describe_layout(layout: Layout, labels: &[String]) -> String {
    let names = labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}:{}", i + 1, label))
        .collect::<Vec<_>>()
        .join(" ");
    match layout {
        Layout::Generic => format!("stimuli {}", names),
        Layout::Comparison => format!("reference + conditions {}", names),
    }
}

fn remember_folder(config: &mut Config, path: &Path, first_file: Option<&Path>) {
    let Some(folder) = first_file.and_then(Path::parent) else {
        return;
    };
    config.last_stimulus_folder = Some(folder.to_path_buf());
    if let Err(e) = config.save_to(path) {
        warn!(path = %path.display(), error = %e, "failed to save config");
    }
}

/// Main-thread loop: keys in, commands out, events back
fn run(controller: &mut Controller) -> anyhow::Result<()> {
    let mut out = stdout();
    while !controller.should_quit() {
        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(output) = controller.handle_key(key) {
                        show(&mut out, output, prompt(controller))?;
                    }
                    if controller.input().mode() == InputMode::Command {
                        show(&mut out, Output::Status(String::new()), prompt(controller))?;
                    }
                }
            }
        }
        for output in controller.poll_events() {
            show(&mut out, output, prompt(controller))?;
        }
    }
    Ok(())
}

/// Command line being typed, if any
fn prompt(controller: &Controller) -> Option<String> {
    let input = controller.input();
    (input.mode() == InputMode::Command).then(|| format!(":{}", input.command_buffer()))
}

fn show(out: &mut impl Write, output: Output, prompt: Option<String>) -> io::Result<()> {
    match output {
        Output::Line(line) => {
            execute!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            for part in line.lines() {
                write!(out, "{}\r\n", part)?;
            }
            if let Some(prompt) = prompt {
                execute!(out, Print(prompt))?;
            }
        }
        Output::Status(status) => {
            execute!(
                out,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(prompt.unwrap_or(status))
            )?;
        }
    }
    out.flush()
}
