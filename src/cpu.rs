// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Decodes and runs instructions


pub mod behavior;
pub mod instruction;
pub mod mem;

use self::{
    instruction::Dispatch,
    mem::{Mem, MEMORY_SIZE},
};
use crate::{
    error::{Error, Result},
    screen::Screen,
    traits::FallibleAutoCast,
};
use std::fmt::Debug;

/// A register index, `0x0..=0xF`
pub type Reg = usize;
/// A 12-bit address, stored in 16 bits
pub type Adr = u16;
/// A 4-bit immediate
pub type Nib = u8;

/// Number of return addresses the stack can hold
pub const STACK_SIZE: usize = 16;
/// Where programs are conventionally loaded, and where pc starts
pub const PROGRAM_START: Adr = 0x200;
/// The highest address an instruction may start at
pub const PC_MAX: Adr = (MEMORY_SIZE - 2) as Adr;

/// Represents the internal state of the CPU interpreter
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CPU {
    // memory
    mem: Mem,
    stack: [Adr; STACK_SIZE],
    sp: usize,
    // registers
    pc: Adr,
    i: Adr,
    v: [u8; 16],
    delay: u8,
    sound: u8,
    // Super-Chip RPL user flags
    rpl: [u8; 8],
    // I/O
    screen: Screen,
    keys: [bool; 16],
    waiting: Option<Reg>,
    // Execution data
    cycle: usize,
}

// public interface
impl CPU {
    /// Constructs a freshly reset CPU, with the fonts loaded and pc at 0x200
    pub fn new() -> Self {
        let mut cpu = CPU {
            mem: Mem::default(),
            stack: [0; STACK_SIZE],
            sp: 0,
            pc: PROGRAM_START,
            i: 0,
            v: [0; 16],
            delay: 0,
            sound: 0,
            rpl: [0; 8],
            screen: Screen::default(),
            keys: [false; 16],
            waiting: None,
            cycle: 0,
        };
        cpu.reset();
        cpu
    }

    /// Resets the emulator.
    ///
    /// Clears memory (reloading the fonts), registers, the stack, the timers,
    /// and the screen. Resets pc to 0x200.
    ///
    /// Does not touch held keys or the Super-Chip RPL flags.
    pub fn reset(&mut self) {
        self.mem.clear();
        // clear the stack
        self.stack = [0; STACK_SIZE];
        self.sp = 0;
        // Reset the program counter
        self.pc = PROGRAM_START;
        // Zero the registers
        self.i = 0;
        self.v = [0; 16];
        self.delay = 0;
        self.sound = 0;
        // I/O
        self.screen.set_mode(Default::default());
        self.waiting = None;
        // Execution data
        self.cycle = 0;
    }

    /// Loads bytes into memory at `addr`
    ///
    /// Returns [Error::RomTooLarge], leaving memory untouched, if `rom` doesn't fit.
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let mut cpu = CPU::default();
    /// cpu.load_rom(&[0x00, 0xe0], 0x200).unwrap();
    /// assert_eq!(0x00e0, cpu.read_u16(0x200).unwrap());
    /// // 0x1000 - 0x200 bytes is as much as will fit
    /// assert!(cpu.load_rom(&[0; 0xe01], 0x200).is_err());
    /// ```
    pub fn load_rom(&mut self, rom: &[u8], addr: Adr) -> Result<&mut Self> {
        if rom.len() + addr as usize > MEMORY_SIZE {
            return Err(Error::RomTooLarge {
                len: rom.len(),
                addr,
            });
        }
        self.mem.load(addr, rom)?;
        Ok(self)
    }

    /// Presses a key, and reports whether the key's state changed.
    /// If key does not exist, returns [Error::InvalidKey].
    ///
    /// If the CPU is waiting on a key (`Fx0A`), the key is stored in the
    /// waiting register and execution resumes.
    ///
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let mut cpu = CPU::default();
    ///
    /// // press key `7`
    /// let did_press = cpu.press(0x7).unwrap();
    /// assert!(did_press);
    ///
    /// // press key `7` again, even though it's already pressed
    /// let did_press = cpu.press(0x7).unwrap();
    /// // it was already pressed, so nothing's changed.
    /// assert!(!did_press);
    /// ```
    pub fn press(&mut self, key: usize) -> Result<bool> {
        let keyref = self.keys.get_mut(key).ok_or(Error::InvalidKey { key })?;
        if *keyref {
            return Ok(false);
        }
        *keyref = true;
        if let Some(reg) = self.waiting.take() {
            self.v[reg] = key as u8;
        }
        Ok(true)
    }

    /// Releases a key, and reports whether the key's state changed.
    /// If key is outside range `0..=0xF`, returns [Error::InvalidKey].
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let mut cpu = CPU::default();
    /// // press key `7`
    /// cpu.press(0x7).unwrap();
    /// // release key `7`
    /// let changed = cpu.release(0x7).unwrap();
    /// assert!(changed); // key released
    /// // try releasing `7` again
    /// let changed = cpu.release(0x7).unwrap();
    /// assert!(!changed); // key was not held
    /// ```
    pub fn release(&mut self, key: usize) -> Result<bool> {
        let keyref = self.keys.get_mut(key).ok_or(Error::InvalidKey { key })?;
        Ok(std::mem::replace(keyref, false))
    }

    /// Sets a general purpose register in the CPU.
    /// Only the low nibble of `reg` is used.
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let mut cpu = CPU::default();
    /// cpu.set_v(0x4, 0x41);
    /// assert_eq!(0x41, cpu.v()[4]);
    /// ```
    pub fn set_v(&mut self, reg: Reg, value: u8) -> &mut Self {
        self.v[reg & 0xf] = value;
        self
    }

    /// Gets the general purpose registers
    pub fn v(&self) -> [u8; 16] {
        self.v
    }

    /// Gets the program counter
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let cpu = CPU::default();
    /// assert_eq!(0x200, cpu.pc());
    /// ```
    pub fn pc(&self) -> Adr {
        self.pc
    }

    /// Gets the I register
    pub fn i(&self) -> Adr {
        self.i
    }

    /// Gets the stack pointer: the number of return addresses on the stack
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Gets the full stack, including slots above the stack pointer
    pub fn stack(&self) -> [Adr; STACK_SIZE] {
        self.stack
    }

    /// Gets the value in the Delay Timer register
    pub fn delay(&self) -> u8 {
        self.delay
    }

    /// Gets the value in the Sound Timer register
    pub fn sound(&self) -> u8 {
        self.sound
    }

    /// Gets the Super-Chip RPL user flags
    pub fn rpl(&self) -> [u8; 8] {
        self.rpl
    }

    /// Gets the screen
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Gets the state of each key
    pub fn keys(&self) -> [bool; 16] {
        self.keys
    }

    /// Whether the CPU is blocked on `Fx0A`, waiting for a key press
    pub fn is_waiting(&self) -> bool {
        self.waiting.is_some()
    }

    /// Gets all of memory
    pub fn memory(&self) -> &[u8] {
        self.mem.as_slice()
    }

    /// Gets the number of instructions the CPU has executed since reset
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Reads the big-endian word at `addr`
    pub fn read_u16(&self, addr: Adr) -> Result<u16> {
        self.mem.read_fallible(addr)
    }

    /// Writes a big-endian word at `addr`
    pub fn set_u16(&mut self, addr: Adr, value: u16) -> Result<&mut Self> {
        self.mem.write_fallible(addr, value)?;
        Ok(self)
    }

    /// Counts both timers down by one, stopping at zero
    pub fn tick_timers(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    /// Disassembles the instruction at `addr`, without executing anything.
    ///
    /// Returns [None] if the word there matches no instruction.
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let dispatch = Dispatch::default();
    /// let mut cpu = CPU::default();
    /// cpu.load_rom(&[0x63, 0x2a], 0x200).unwrap();
    /// assert_eq!(Some("LD   V3, 0x2A".into()), cpu.disassemble(&dispatch, 0x200));
    /// ```
    pub fn disassemble(&self, dispatch: &Dispatch, addr: Adr) -> Option<String> {
        dispatch.disassemble(self.read_u16(addr).ok()?)
    }

    /// Executes a single instruction
    ///
    /// Does nothing while waiting on a key.
    ///
    /// On error, pc is left on the offending instruction, and the instruction
    /// has not run (except that an out-of-range jump target is discarded).
    /// Returns [Error::UnimplementedInstruction] if the instruction at `pc` is unimplemented.
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let dispatch = Dispatch::default();
    /// let mut cpu = CPU::default();
    /// cpu.load_rom(&[
    ///     0x00, 0xe0, // cls
    ///     0x12, 0x02, // jump 0x202 (pc)
    /// ], 0x200).unwrap();
    /// cpu.tick(&dispatch)
    ///     .expect("0x00e0 (cls) should be a valid opcode.");
    /// assert_eq!(0x202, cpu.pc());
    /// assert_eq!(1, cpu.cycle());
    /// ```
    /// Returns [Error::UnimplementedInstruction] if the instruction is not implemented.
    /// ```rust
    /// # use chipd::*;
    /// let dispatch = Dispatch::default();
    /// let mut cpu = CPU::default();
    /// cpu.load_rom(&[0xff, 0xff], 0x200).unwrap();
    /// dbg!(cpu.tick(&dispatch))
    ///     .expect_err("Should return Error::UnimplementedInstruction { 0xffff }");
    /// assert_eq!(0x200, cpu.pc());
    /// ```
    pub fn tick(&mut self, dispatch: &Dispatch) -> Result<&mut Self> {
        if self.is_waiting() {
            return Ok(self);
        }
        let addr = self.pc;
        // fetch
        let word: u16 = self.mem.read_fallible(addr)?;
        // decode
        let (handler, operands) = dispatch
            .decode(word)
            .ok_or(Error::UnimplementedInstruction { word, addr })?;
        // execute
        self.pc = addr.wrapping_add(2);
        if let Err(e) = (handler.execute)(self, &operands) {
            self.pc = addr;
            return Err(e);
        }
        if self.pc > PC_MAX {
            let pc = std::mem::replace(&mut self.pc, addr);
            return Err(Error::ProgramCounterOutOfRange { pc, addr });
        }
        self.cycle += 1;
        Ok(self)
    }

    /// Dumps the current state of all CPU registers, and the cycle count
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let cpu = CPU::default();
    /// println!("{}", cpu.dump());
    /// ```
    /// outputs
    /// ```text
    /// PC: 0200, SP: 00, I: 0000
    /// v0: 00 v1: 00 v2: 00 v3: 00
    /// v4: 00 v5: 00 v6: 00 v7: 00
    /// v8: 00 v9: 00 vA: 00 vB: 00
    /// vC: 00 vD: 00 vE: 00 vF: 00
    /// DLY: 0, SND: 0, CYC:      0
    /// ```
    pub fn dump(&self) -> String {
        format!(
            "PC: {:04x}, SP: {:02x}, I: {:04x}\n{}DLY: {}, SND: {}, CYC: {:6}",
            self.pc,
            self.sp,
            self.i,
            self.v
                .into_iter()
                .enumerate()
                .map(|(i, gpr)| {
                    format!(
                        "v{i:X}: {gpr:02x}{}",
                        match i % 4 {
                            3 => "\n",
                            _ => " ",
                        }
                    )
                })
                .collect::<String>(),
            self.delay,
            self.sound,
            self.cycle,
        )
    }
}

impl Debug for CPU {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CPU")
            .field("stack", &&self.stack[..self.sp])
            .field("pc", &self.pc)
            .field("i", &self.i)
            .field("v", &self.v)
            .field("delay", &self.delay)
            .field("sound", &self.sound)
            .field("screen", &self.screen)
            .field("keys", &self.keys)
            .field("waiting", &self.waiting)
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Default for CPU {
    /// Constructs a new, reset CPU
    ///
    /// | value  | default | description
    /// |--------|---------|------------
    /// | font   |`0x0000` | Location of the 4x5 font.
    /// | hfont  |`0x0050` | Location of the 8x10 font.
    /// | pc     |`0x0200` | Start location.
    ///
    /// # Examples
    /// ```rust
    /// use chipd::*;
    /// let mut cpu = CPU::default();
    /// ```
    fn default() -> Self {
        Self::new()
    }
}
