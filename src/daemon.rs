// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Runs a [CPU] on its own thread, driven by a queue of [Command]s
//!
//! Callers [send](Daemon::send) commands and read machine state through the
//! [Daemon]. The worker applies every queued command, then executes one
//! instruction, then sleeps off the rest of the clock period.
//!
//! All machine state lives behind one lock, so readers never see an
//! instruction half-executed.

pub mod command;

pub use command::{Command, CommandKind};

use crate::{
    cpu::{instruction::Dispatch, Adr, CPU, PROGRAM_START, STACK_SIZE},
    error::{Error, Result},
    journal::{journal, Journal, Reader, DEFAULT_CAPACITY},
    screen::{Framebuffer, ScreenMode},
};
use std::{
    any::Any,
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// How long the worker sleeps between checks while paused
const IDLE: Duration = Duration::from_millis(1);

/// Whether the worker is executing instructions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Commands are applied, but no instructions run
    #[default]
    Paused,
    /// Instructions run at the clock speed
    Running,
}

/// Startup settings for a [Daemon]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Config {
    /// Instructions per second. Zero is treated as one.
    pub clock_speed: u32,
    /// Timer decrements per second. Zero stops the timers.
    pub timer_rate: u32,
    /// Where [Daemon::load_rom] puts programs by default
    pub load_address: Adr,
    /// Journal every instruction's disassembly before it runs
    pub trace: bool,
    /// How many unread entries [Daemon::with_journal]'s journal holds
    pub journal_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clock_speed: 500,
            timer_rate: 60,
            load_address: PROGRAM_START,
            trace: false,
            journal_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// The machine, and everything the worker knows about running it.
///
/// Command handlers receive exclusive access to the [Core].
#[derive(Debug)]
pub struct Core {
    /// The machine
    pub cpu: CPU,
    dispatch: Dispatch,
    state: RunState,
    clock_speed: u32,
    timer_rate: u32,
    trace: bool,
    fault: Option<Error>,
    rom: Option<(Vec<u8>, Adr)>,
    journal: Journal,
}

impl Core {
    fn new(config: &Config, journal: Journal) -> Self {
        Self {
            cpu: CPU::new(),
            dispatch: Dispatch::default(),
            state: RunState::Paused,
            clock_speed: config.clock_speed.max(1),
            timer_rate: config.timer_rate,
            trace: config.trace,
            fault: None,
            rom: None,
            journal,
        }
    }

    /// Gets the [RunState]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Sets the [RunState]. Starting to run clears any recorded fault.
    pub fn set_state(&mut self, state: RunState) {
        if state == RunState::Running {
            self.fault = None;
        }
        self.state = state;
    }

    /// Gets the number of instructions executed per second
    pub fn clock_speed(&self) -> u32 {
        self.clock_speed
    }

    /// Sets the number of instructions executed per second
    ///
    /// Returns [Error::InvalidClockSpeed] for zero, leaving the clock speed unchanged
    pub fn set_clock_speed(&mut self, speed: u32) -> Result<()> {
        if speed == 0 {
            return Err(Error::InvalidClockSpeed { speed });
        }
        self.clock_speed = speed;
        Ok(())
    }

    /// Gets the error that last stopped execution, if any
    pub fn fault(&self) -> Option<&Error> {
        self.fault.as_ref()
    }

    /// Gets the instruction table the machine executes with
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Gets the journal, so handlers can log
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Resets the machine, then loads `rom` at `addr`
    ///
    /// The program is remembered, and reloaded by [Core::reset].
    pub fn load_rom(&mut self, rom: &[u8], addr: Adr) -> Result<()> {
        self.cpu.reset();
        self.fault = None;
        self.cpu.load_rom(rom, addr)?;
        self.rom = Some((rom.to_vec(), addr));
        Ok(())
    }

    /// Resets the machine, and reloads the last program loaded
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.fault = None;
        if let Some((rom, addr)) = &self.rom {
            // it fit last time
            let _ = self.cpu.load_rom(rom, *addr);
        }
    }

    /// Executes one instruction.
    ///
    /// On a fatal error, the machine is paused and the error recorded as the fault.
    pub fn step(&mut self) -> Result<()> {
        if self.trace && !self.cpu.is_waiting() {
            let pc = self.cpu.pc();
            let text = self
                .cpu
                .disassemble(&self.dispatch, pc)
                .unwrap_or_else(|| "inval".into());
            self.journal.trace("cpu", format!("{pc:03x}: {text}"));
        }
        match self.cpu.tick(&self.dispatch) {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.is_fatal() {
                    self.journal.error("cpu", e.to_string());
                    self.state = RunState::Paused;
                    self.fault = Some(e.clone());
                }
                Err(e)
            }
        }
    }

    /// Time between instructions at the current clock speed
    fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.clock_speed as f64)
    }

    /// Time between timer decrements, if the timers run at all
    fn timer_period(&self) -> Option<Duration> {
        (self.timer_rate > 0).then(|| Duration::from_secs_f64(1.0 / self.timer_rate as f64))
    }
}

/// A command handler. Receives the machine, and the command being applied.
pub type Handler = Box<dyn FnMut(&mut Core, &Command) + Send>;

struct Shared {
    queue: Mutex<VecDeque<Command>>,
    core: RwLock<Core>,
    handlers: Mutex<HashMap<CommandKind, Vec<Handler>>>,
    die: AtomicBool,
}

/// Owns the worker thread. Dropping the [Daemon] stops and joins it.
pub struct Daemon {
    shared: Arc<Shared>,
    load_address: Adr,
    worker: Option<JoinHandle<()>>,
}

impl Daemon {
    /// Starts a paused machine on a new thread, logging to `journal`
    /// # Examples
    /// ```rust,no_run
    /// # use chipd::{daemon::{Config, Daemon, RunState}, journal::journal};
    /// let (log, _reader) = journal(64);
    /// let daemon = Daemon::new(Config::default(), log);
    /// daemon.load_rom(vec![0x12, 0x00]); // jump 0x200
    /// daemon.run();
    /// std::thread::sleep(std::time::Duration::from_millis(50));
    /// assert_eq!(RunState::Running, daemon.state());
    /// ```
    pub fn new(config: Config, journal: Journal) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            core: RwLock::new(Core::new(&config, journal)),
            handlers: Mutex::new(HashMap::new()),
            die: AtomicBool::new(false),
        });
        let mut daemon = Self {
            shared,
            load_address: config.load_address,
            worker: None,
        };
        daemon.register_defaults();
        let shared = Arc::clone(&daemon.shared);
        daemon.worker = Some(thread::spawn(move || shared.work()));
        daemon
    }

    /// Starts a paused machine with a journal of its own, holding up to
    /// [Config::journal_capacity] entries
    /// # Examples
    /// ```rust,no_run
    /// # use chipd::daemon::{Config, Daemon};
    /// let (daemon, reader) = Daemon::with_journal(Config::default());
    /// daemon.load_rom(vec![0x12, 0x00]);
    /// for entry in reader.drain() {
    ///     println!("{entry}");
    /// }
    /// ```
    pub fn with_journal(config: Config) -> (Self, Reader) {
        let (log, reader) = journal(config.journal_capacity);
        (Self::new(config, log), reader)
    }

    /// Queues a command for the worker
    pub fn send(&self, command: Command) {
        lock(&self.shared.queue).push_back(command);
    }

    /// Adds a handler for a kind of command.
    ///
    /// Handlers for the same kind run in the order they were registered,
    /// after the built-in handler (if there is one).
    /// # Examples
    /// ```rust,no_run
    /// # use chipd::{daemon::{Command, CommandKind, Config, Daemon}, journal::journal};
    /// let (log, _reader) = journal(64);
    /// let daemon = Daemon::new(Config::default(), log);
    /// daemon.register_handler(CommandKind::Custom("poke"), |core, command| {
    ///     if let Command::Custom { payload, .. } = command {
    ///         let _ = core.cpu.set_u16(0x300, u16::from_be_bytes([payload[0], payload[1]]));
    ///     }
    /// });
    /// daemon.send(Command::Custom { tag: "poke", payload: vec![0xab, 0xcd] });
    /// ```
    pub fn register_handler<F>(&self, kind: CommandKind, handler: F)
    where
        F: FnMut(&mut Core, &Command) + Send + 'static,
    {
        lock(&self.shared.handlers)
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Number of commands waiting to be applied
    pub fn pending(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    /// Reads several things from the machine at once, consistently
    pub fn inspect<R>(&self, f: impl FnOnce(&Core) -> R) -> R {
        f(&*read(&self.shared.core))
    }

    /// Stops the worker, waiting for it to finish its current cycle
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shared.die.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            // a panicked worker has nothing left to clean up
            let _ = worker.join();
        }
    }

    fn register_defaults(&mut self) {
        use Command as C;
        use CommandKind as K;
        self.register_handler(K::LoadRom, |core, command| {
            if let C::LoadRom { rom, addr } = command {
                match core.load_rom(rom, *addr) {
                    Ok(()) => core.journal.info(
                        "daemon",
                        format!("loaded {} bytes at {addr:03x}", rom.len()),
                    ),
                    Err(e) => core.journal.error("daemon", e.to_string()),
                }
            }
        });
        self.register_handler(K::SetRunning, |core, _| {
            core.set_state(RunState::Running);
            core.journal.info("daemon", "running");
        });
        self.register_handler(K::SetPaused, |core, _| {
            core.set_state(RunState::Paused);
            core.journal.info("daemon", "paused");
        });
        self.register_handler(K::KeyDown, |core, command| {
            if let C::KeyDown(key) = command {
                if let Err(e) = core.cpu.press(*key as usize) {
                    core.journal.warn("daemon", e.to_string());
                }
            }
        });
        self.register_handler(K::KeyUp, |core, command| {
            if let C::KeyUp(key) = command {
                if let Err(e) = core.cpu.release(*key as usize) {
                    core.journal.warn("daemon", e.to_string());
                }
            }
        });
        self.register_handler(K::SetClockSpeed, |core, command| {
            if let C::SetClockSpeed(speed) = command {
                match core.set_clock_speed(*speed) {
                    Ok(()) => core.journal.info("daemon", format!("clock speed {speed} Hz")),
                    Err(e) => core.journal.warn("daemon", e.to_string()),
                }
            }
        });
        self.register_handler(K::Reset, |core, _| {
            core.reset();
            core.journal.info("daemon", "reset");
        });
        self.register_handler(K::Step, |core, _| {
            // faults are recorded by step
            let _ = core.step();
        });
    }
}

// Convenience senders
impl Daemon {
    /// Queues [Command::LoadRom] at the configured load address
    pub fn load_rom(&self, rom: impl Into<Vec<u8>>) {
        self.load_rom_at(rom, self.load_address)
    }
    /// Queues [Command::LoadRom] at `addr`
    pub fn load_rom_at(&self, rom: impl Into<Vec<u8>>, addr: Adr) {
        self.send(Command::LoadRom {
            rom: rom.into(),
            addr,
        })
    }
    /// Queues [Command::SetRunning]
    pub fn run(&self) {
        self.send(Command::SetRunning)
    }
    /// Queues [Command::SetPaused]
    pub fn pause(&self) {
        self.send(Command::SetPaused)
    }
    /// Queues [Command::KeyDown]
    pub fn key_down(&self, key: u8) {
        self.send(Command::KeyDown(key))
    }
    /// Queues [Command::KeyUp]
    pub fn key_up(&self, key: u8) {
        self.send(Command::KeyUp(key))
    }
    /// Queues [Command::SetClockSpeed]
    pub fn set_clock_speed(&self, speed: u32) {
        self.send(Command::SetClockSpeed(speed))
    }
    /// Queues [Command::Reset]
    pub fn reset(&self) {
        self.send(Command::Reset)
    }
    /// Queues [Command::Step]
    pub fn step(&self) {
        self.send(Command::Step)
    }
}

// Accessors. Each takes the machine lock once.
impl Daemon {
    /// Gets the [RunState]
    pub fn state(&self) -> RunState {
        self.inspect(Core::state)
    }
    /// Gets the error that last stopped execution, if any
    pub fn fault(&self) -> Option<Error> {
        self.inspect(|core| core.fault.clone())
    }
    /// Gets the clock speed, in instructions per second
    pub fn clock_speed(&self) -> u32 {
        self.inspect(Core::clock_speed)
    }
    /// Gets the current screen mode
    pub fn screen_mode(&self) -> ScreenMode {
        self.inspect(|core| core.cpu.screen().mode())
    }
    /// Copies out the framebuffer
    pub fn framebuffer(&self) -> Framebuffer {
        self.inspect(|core| *core.cpu.screen().framebuffer())
    }
    /// Gets a single pixel. Out-of-range pixels are off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.inspect(|core| core.cpu.screen().get(x, y))
    }
    /// Gets the general purpose registers
    pub fn v(&self) -> [u8; 16] {
        self.inspect(|core| core.cpu.v())
    }
    /// Gets the I register
    pub fn i(&self) -> Adr {
        self.inspect(|core| core.cpu.i())
    }
    /// Gets the stack pointer
    pub fn sp(&self) -> usize {
        self.inspect(|core| core.cpu.sp())
    }
    /// Gets the program counter
    pub fn pc(&self) -> Adr {
        self.inspect(|core| core.cpu.pc())
    }
    /// Gets the delay timer
    pub fn delay(&self) -> u8 {
        self.inspect(|core| core.cpu.delay())
    }
    /// Gets the sound timer
    pub fn sound(&self) -> u8 {
        self.inspect(|core| core.cpu.sound())
    }
    /// Gets the stack
    pub fn stack(&self) -> [Adr; STACK_SIZE] {
        self.inspect(|core| core.cpu.stack())
    }
    /// Gets the number of instructions executed since reset
    pub fn cycle(&self) -> usize {
        self.inspect(|core| core.cpu.cycle())
    }
    /// Whether the machine is blocked on a key press
    pub fn is_waiting(&self) -> bool {
        self.inspect(|core| core.cpu.is_waiting())
    }
    /// Copies out the whole machine
    pub fn snapshot(&self) -> CPU {
        self.inspect(|core| core.cpu.clone())
    }
    /// Disassembles the instruction at `addr`
    pub fn disassemble(&self, addr: Adr) -> Option<String> {
        self.inspect(|core| core.cpu.disassemble(&core.dispatch, addr))
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("core", &*read(&self.shared.core))
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl Shared {
    /// The worker loop
    fn work(&self) {
        self.journal().info("daemon", "started");
        let mut next_timer = Instant::now();
        while !self.die.load(Ordering::Acquire) {
            let started = Instant::now();
            while let Some(command) = self.pop() {
                self.apply(&command);
            }
            let mut core = write(&self.core);
            if core.state != RunState::Running {
                drop(core);
                next_timer = Instant::now();
                thread::sleep(IDLE);
                continue;
            }
            // faults are recorded by step
            let _ = core.step();
            if let Some(period) = core.timer_period() {
                while next_timer.elapsed() >= period {
                    core.cpu.tick_timers();
                    next_timer += period;
                }
            }
            let period = core.period();
            drop(core);
            thread::sleep(period.saturating_sub(started.elapsed()));
        }
        self.journal().info("daemon", "stopped");
    }

    fn pop(&self) -> Option<Command> {
        lock(&self.queue).pop_front()
    }

    /// Runs every handler for the command, in registration order.
    ///
    /// The handlers are taken out of the registry while they run, so callers
    /// can keep registering. A panicking handler is journalled and skipped.
    fn apply(&self, command: &Command) {
        let kind = command.kind();
        let Some(mut handlers) = lock(&self.handlers).remove(&kind) else {
            let core = read(&self.core);
            core.journal.warn("daemon", format!("no handler for {kind:?}"));
            return;
        };
        {
            let mut core = write(&self.core);
            for handler in handlers.iter_mut() {
                let run = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut *core, command)));
                if let Err(payload) = run {
                    let reason = panic_message(payload.as_ref());
                    core.journal
                        .error("daemon", format!("handler for {kind:?} panicked: {reason}"));
                }
            }
        }
        // anything registered in the meantime goes after the existing handlers
        let mut registry = lock(&self.handlers);
        let added = std::mem::replace(registry.entry(kind).or_default(), handlers);
        registry.entry(kind).or_default().extend(added);
    }

    fn journal(&self) -> Journal {
        read(&self.core).journal.clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

// A panic while a lock is held poisons it; the machine state is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
