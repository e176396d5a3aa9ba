// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Error type for Chipd

use crate::cpu::Adr;
use thiserror::Error;

/// Result type, equivalent to [std::result::Result]<T, [enum@Error]>
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Chipd.
///
/// Every execution fault is cheap to clone, so the [Daemon](crate::daemon::Daemon)
/// can hold on to the last one for inspection.
#[derive(Clone, Debug, Error, PartialEq, Eq, Hash)]
pub enum Error {
    /// The ROM doesn't fit in memory at the requested address
    #[error("rom of {len} bytes does not fit in memory at {addr:03x}")]
    RomTooLarge {
        /// Length of the offending ROM
        len: usize,
        /// The requested load address
        addr: Adr,
    },
    /// Represents an unimplemented operation
    #[error("opcode {word:04x} at {addr:03x} not recognized")]
    UnimplementedInstruction {
        /// The offending word
        word: u16,
        /// Where the word was fetched from
        addr: Adr,
    },
    /// A `call` was made with all 16 stack slots in use
    #[error("stack overflow: call at {addr:03x} with a full stack")]
    StackOverflow {
        /// Address of the offending `call`
        addr: Adr,
    },
    /// A `ret` was made with an empty stack
    #[error("stack underflow: ret at {addr:03x} with an empty stack")]
    StackUnderflow {
        /// Address of the offending `ret`
        addr: Adr,
    },
    /// The program counter left addressable memory
    #[error("program counter {pc:04x} out of range after instruction at {addr:03x}")]
    ProgramCounterOutOfRange {
        /// The program counter the instruction tried to set
        pc: u16,
        /// Address of the offending instruction
        addr: Adr,
    },
    /// The program executed the Super-Chip `exit` instruction
    #[error("program exited at {addr:03x}")]
    Exited {
        /// Address of the `exit` instruction
        addr: Adr,
    },
    /// Tried to press a key that doesn't exist
    #[error("tried to press key {key:X} which does not exist")]
    InvalidKey {
        /// The offending key
        key: usize,
    },
    /// Tried to run the CPU at zero cycles per second
    #[error("clock speed {speed} is not a valid number of cycles per second")]
    InvalidClockSpeed {
        /// The offending speed
        speed: u32,
    },
    /// Tried to read or write outside of memory
    #[error("range {addr:04x}+{len} is not present in memory")]
    InvalidAddressRange {
        /// Start of the access
        addr: usize,
        /// Length of the access
        len: usize,
    },
}

impl Error {
    /// Whether this error stops execution of the current program
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::InvalidKey { .. } | Error::InvalidClockSpeed { .. } | Error::RomTooLarge { .. }
        )
    }
}
