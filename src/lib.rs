// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE.txt for details)

//! This crate implements a Chip-8 (and Super-Chip) interpreter, run on its own
//! thread and driven by a queue of commands.
//!
//! Instructions are decoded by matching their nibbles against a table of patterns,
//! so new instructions can be added without touching the decoder.
//!
//! ```rust,no_run
//! use chipd::prelude::*;
//! let (log, reader) = journal(256);
//! let daemon = Daemon::new(Config::default(), log);
//! daemon.load_rom(std::fs::read("game.ch8").unwrap());
//! daemon.run();
//! for entry in reader.drain() {
//!     println!("{entry}");
//! }
//! ```

pub mod cpu;
pub mod daemon;
pub mod error;
pub mod journal;
pub mod screen;
pub mod traits;

pub use cpu::{
    instruction::{
        disassembler::{Dis, Disassembler},
        Dispatch, OpHandler, OpId, Operands, Pattern,
    },
    mem::Mem,
    CPU,
};
pub use daemon::{Command, CommandKind, Config, Core, Daemon, RunState};
pub use error::{Error, Result};
pub use screen::{Screen, ScreenMode};

/// Common imports for chipd
pub mod prelude {
    use super::*;
    pub use cpu::{
        instruction::{
            disassembler::{Dis, Disassembler},
            Dispatch,
        },
        Adr, CPU,
    };
    pub use daemon::{Command, CommandKind, Config, Core, Daemon, RunState};
    pub use error::{Error, Result};
    pub use journal::{journal, Journal, Reader};
    pub use screen::{Screen, ScreenMode};
}
