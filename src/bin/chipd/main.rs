// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Chipd: runs a Chip-8 program on the terminal, and shows what happened

use chipd::{journal::Reader, prelude::*};
use gumdrop::Options;
use log::Level;
use owo_colors::OwoColorize;
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Chipd(#[from] chipd::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Parses a hexadecimal string into a u16
fn parse_hex(value: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    u16::from_str_radix(value, 16)
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Options, Hash)]
struct Arguments {
    #[options(help = "Load a ROM to run on Chipd.", required, free)]
    pub file: PathBuf,
    #[options(help = "Print this help message.")]
    help: bool,
    #[options(help = "Load the ROM, but don't start it.")]
    pub pause: bool,
    #[options(help = "Log every instruction as it runs.")]
    pub trace: bool,
    #[options(help = "Set the instructions-per-second rate.", meta = "IPS")]
    pub speed: Option<u32>,
    #[options(help = "Set the timer rate.", default = "60", meta = "HZ")]
    pub timer_rate: u32,
    #[options(
        help = "Load address (usually 200)",
        parse(try_from_str = "parse_hex"),
        default = "200"
    )]
    pub loadaddr: u16,
    #[options(help = "Stop after this many seconds.", default = "5", meta = "S")]
    pub seconds: u64,
    #[options(help = "Set the journal polling rate.", default = "60", meta = "FR")]
    pub frame_rate: u64,
}

fn main() {
    let options = Arguments::parse_args_default_or_exit();
    if let Err(e) = run(options) {
        eprintln!("{}", e.bold().red());
        std::process::exit(1);
    }
}

fn run(options: Arguments) -> std::result::Result<(), RunError> {
    let rom = std::fs::read(&options.file)?;
    let config = Config {
        clock_speed: options.speed.unwrap_or(Config::default().clock_speed),
        timer_rate: options.timer_rate,
        load_address: options.loadaddr,
        trace: options.trace,
        ..Default::default()
    };
    let (daemon, reader) = Daemon::with_journal(config);
    daemon.load_rom(rom);
    if !options.pause {
        daemon.run();
    }

    let frame = Duration::from_nanos(1_000_000_000 / options.frame_rate.max(1));
    let deadline = Instant::now() + Duration::from_secs(options.seconds);
    while Instant::now() < deadline {
        std::thread::sleep(frame);
        print_journal(&reader);
        if daemon.fault().is_some() {
            break;
        }
    }
    daemon.pause();
    let (screen, dump, fault) =
        daemon.inspect(|core| (core.cpu.screen().clone(), core.cpu.dump(), core.fault().cloned()));
    daemon.shutdown();
    print_journal(&reader);

    println!("{screen}");
    println!("{dump}");
    match fault {
        // The program asked to stop
        Some(Error::Exited { .. }) | None => Ok(()),
        Some(e) => Err(e.into()),
    }
}

fn print_journal(reader: &Reader) {
    for entry in reader.drain() {
        match entry.level {
            Level::Error => eprintln!("{}", entry.red()),
            Level::Warn => eprintln!("{}", entry.yellow()),
            Level::Info => eprintln!("{}", entry.bold()),
            Level::Debug | Level::Trace => eprintln!("{}", entry.bright_black()),
        }
    }
}
