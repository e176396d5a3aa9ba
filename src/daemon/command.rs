// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Commands sent to the [Daemon](super::Daemon)'s worker thread

use crate::cpu::Adr;

/// A request for the worker thread. Applied in the order they were sent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Reset the machine, then load `rom` at `addr`
    LoadRom {
        /// The raw program bytes
        rom: Vec<u8>,
        /// Where to put them (usually 0x200)
        addr: Adr,
    },
    /// Start executing instructions
    SetRunning,
    /// Stop executing instructions
    SetPaused,
    /// Press a key, `0x0..=0xF`
    KeyDown(u8),
    /// Release a key, `0x0..=0xF`
    KeyUp(u8),
    /// Set the number of instructions executed per second
    SetClockSpeed(u32),
    /// Reset the machine, and reload the last program loaded
    Reset,
    /// Execute exactly one instruction, even while paused
    Step,
    /// A caller-defined command. Does nothing unless a handler is registered for its tag.
    Custom {
        /// Names the command, for handler lookup
        tag: &'static str,
        /// Whatever the handler needs
        payload: Vec<u8>,
    },
}

/// Identifies a kind of [Command], for registering handlers
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    /// [Command::LoadRom]
    LoadRom,
    /// [Command::SetRunning]
    SetRunning,
    /// [Command::SetPaused]
    SetPaused,
    /// [Command::KeyDown]
    KeyDown,
    /// [Command::KeyUp]
    KeyUp,
    /// [Command::SetClockSpeed]
    SetClockSpeed,
    /// [Command::Reset]
    Reset,
    /// [Command::Step]
    Step,
    /// [Command::Custom], by tag
    Custom(&'static str),
}

impl Command {
    /// Gets the [CommandKind] handlers are registered under
    /// # Examples
    /// ```rust
    /// # use chipd::daemon::{Command, CommandKind};
    /// assert_eq!(CommandKind::KeyDown, Command::KeyDown(4).kind());
    /// let custom = Command::Custom { tag: "beep", payload: vec![] };
    /// assert_eq!(CommandKind::Custom("beep"), custom.kind());
    /// ```
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::LoadRom { .. } => CommandKind::LoadRom,
            Command::SetRunning => CommandKind::SetRunning,
            Command::SetPaused => CommandKind::SetPaused,
            Command::KeyDown(_) => CommandKind::KeyDown,
            Command::KeyUp(_) => CommandKind::KeyUp,
            Command::SetClockSpeed(_) => CommandKind::SetClockSpeed,
            Command::Reset => CommandKind::Reset,
            Command::Step => CommandKind::Step,
            Command::Custom { tag, .. } => CommandKind::Custom(*tag),
        }
    }
}
