// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Decodes Chip-8 instruction words, and dispatches them to their handlers
//!
//! Every instruction takes one of the forms `ANNN`, `AXKK`, `AXYA`, `AXYN`, `AAAN`, or `AAAA`,
//! where `A` nibbles identify the instruction and the rest are operand data.
//! Handlers are registered under a pattern like `"8xy4"`, and stored in a four-level
//! tree indexed by nibble, where operand nibbles are stored under a wildcard key.

pub mod disassembler;

use super::{Adr, Nib, Reg, CPU};
use crate::error::Result;
use std::fmt::{Debug, Display, Formatter};

/// The operand data an instruction may carry.
///
/// Every field is extracted from every word; each handler ignores what it doesn't use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Operands {
    /// `ANNN`: 12-bit address
    pub nnn: Adr,
    /// `AXAA`: first register
    pub x: Reg,
    /// `AAYA`: second register
    pub y: Reg,
    /// `AAKK`: 8-bit immediate
    pub kk: u8,
    /// `AAAN`: 4-bit immediate
    pub n: Nib,
}

impl From<u16> for Operands {
    fn from(word: u16) -> Self {
        let [_, x, y, n] = nibbles(word);
        Operands {
            nnn: word & 0x0fff,
            x: x as Reg,
            y: y as Reg,
            kk: (word & 0xff) as u8,
            n,
        }
    }
}

/// Splits a word into its four nibbles, most significant first
#[inline]
pub fn nibbles(word: u16) -> [Nib; 4] {
    [
        (word >> 12 & 0xf) as Nib,
        (word >> 8 & 0xf) as Nib,
        (word >> 4 & 0xf) as Nib,
        (word & 0xf) as Nib,
    ]
}

/// Names every instruction the [Dispatch] knows about
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpId {
    // Base instruction set
    Cls,
    Ret,
    Sys,
    Jp,
    Call,
    SeVxKk,
    SneVxKk,
    SeVxVy,
    LdVxKk,
    AddVxKk,
    LdVxVy,
    OrVxVy,
    AndVxVy,
    XorVxVy,
    AddVxVy,
    SubVxVy,
    ShrVx,
    SubnVxVy,
    ShlVx,
    SneVxVy,
    LdIAddr,
    JpV0Addr,
    RndVxKk,
    DrwVxVyN,
    SkpVx,
    SknpVx,
    LdVxDt,
    LdVxK,
    LdDtVx,
    LdStVx,
    AddIVx,
    LdFVx,
    LdBVx,
    LdMemVx,
    LdVxMem,
    // Super-Chip extensions
    Scd,
    Scr,
    Scl,
    Exit,
    Low,
    High,
    LdHfVx,
    LdRVx,
    LdVxR,
}

/// A fixed-or-wildcard pattern for each nibble of an instruction.
///
/// `None` marks an operand nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pattern(pub [Option<Nib>; 4]);

impl Pattern {
    /// Parses a pattern like `"8xy4"`: hex digits are fixed, anything else is a wildcard.
    /// # Examples
    /// ```rust
    /// # use chipd::cpu::instruction::Pattern;
    /// let pattern = Pattern::new("8xy4");
    /// assert_eq!(Pattern([Some(0x8), None, None, Some(0x4)]), pattern);
    /// ```
    pub fn new(pattern: &str) -> Self {
        debug_assert_eq!(4, pattern.chars().count(), "pattern {pattern:?} is not 4 nibbles");
        let mut out = [None; 4];
        for (slot, c) in out.iter_mut().zip(pattern.chars()) {
            *slot = c.to_digit(16).map(|d| d as Nib);
        }
        Pattern(out)
    }
    /// Whether `word` is an instance of this pattern
    pub fn matches(&self, word: u16) -> bool {
        self.0
            .iter()
            .zip(nibbles(word))
            .all(|(fixed, nibble)| fixed.map_or(true, |f| f == nibble))
    }
    /// The smallest word matching this pattern (all operands zero)
    pub fn min(&self) -> u16 {
        self.fill(0x0)
    }
    /// The largest word matching this pattern (all operands 0xF)
    pub fn max(&self) -> u16 {
        self.fill(0xf)
    }
    fn fill(&self, wildcard: Nib) -> u16 {
        self.0
            .iter()
            .fold(0, |word, nibble| word << 4 | nibble.unwrap_or(wildcard) as u16)
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for nibble in self.0 {
            match nibble {
                Some(n) => write!(f, "{n:X}")?,
                None => write!(f, "_")?,
            }
        }
        Ok(())
    }
}

/// Executes an instruction against the CPU
pub type Execute = fn(&mut CPU, &Operands) -> Result<()>;
/// Disassembles an instruction into a mnemonic
pub type Disassemble = fn(&Operands) -> String;

/// An execute routine and a disassemble routine, registered under a [Pattern]
#[derive(Clone, Copy)]
pub struct OpHandler {
    /// Names the instruction
    pub id: OpId,
    /// Which words this handler accepts
    pub pattern: Pattern,
    /// Mutates the CPU
    pub execute: Execute,
    /// Renders the mnemonic
    pub disassemble: Disassemble,
}

impl OpHandler {
    /// Bundles up an [OpHandler]
    pub fn new(id: OpId, pattern: &str, execute: Execute, disassemble: Disassemble) -> Self {
        OpHandler {
            id,
            pattern: Pattern::new(pattern),
            execute,
            disassemble,
        }
    }
}

impl Debug for OpHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpHandler")
            .field("id", &self.id)
            .field("pattern", &format_args!("{}", self.pattern))
            .finish_non_exhaustive()
    }
}

/// One level of the handler tree: sixteen exact keys, and a wildcard.
///
/// Children are boxed, so a [Dispatch] stays small enough to live on the stack.
struct Level<T> {
    exact: [Option<Box<T>>; 16],
    any: Option<Box<T>>,
}

impl<T> Default for Level<T> {
    fn default() -> Self {
        Level {
            exact: std::array::from_fn(|_| None),
            any: None,
        }
    }
}

impl<T> Level<T> {
    fn slot(&mut self, key: Option<Nib>) -> &mut Option<Box<T>> {
        match key {
            Some(nibble) => &mut self.exact[nibble as usize & 0xf],
            None => &mut self.any,
        }
    }
}

/// A node in the handler tree. Leaves are indices into [Dispatch::handlers]
trait Node: Sized {
    fn find(&self, nibbles: &[Nib]) -> Option<usize>;
    fn insert(&mut self, keys: &[Option<Nib>], index: usize) -> Option<usize>;
    fn fresh(keys: &[Option<Nib>], index: usize) -> Self;
}

impl Node for usize {
    fn find(&self, _: &[Nib]) -> Option<usize> {
        Some(*self)
    }
    fn insert(&mut self, _: &[Option<Nib>], index: usize) -> Option<usize> {
        Some(std::mem::replace(self, index))
    }
    fn fresh(_: &[Option<Nib>], index: usize) -> Self {
        index
    }
}

impl<T: Node> Node for Level<T> {
    /// Tries the exact nibble first, then falls back to the wildcard
    fn find(&self, nibbles: &[Nib]) -> Option<usize> {
        let (&nibble, rest) = nibbles.split_first()?;
        self.exact[nibble as usize & 0xf]
            .as_ref()
            .and_then(|node| node.find(rest))
            .or_else(|| self.any.as_ref().and_then(|node| node.find(rest)))
    }
    fn insert(&mut self, keys: &[Option<Nib>], index: usize) -> Option<usize> {
        let (&key, rest) = keys.split_first()?;
        let slot = self.slot(key);
        if let Some(node) = slot {
            return node.insert(rest, index);
        }
        *slot = Some(Box::new(T::fresh(rest, index)));
        None
    }
    fn fresh(keys: &[Option<Nib>], index: usize) -> Self {
        let mut level = Level::default();
        level.insert(keys, index);
        level
    }
}

type Tree = Level<Level<Level<Level<usize>>>>;

/// The opcode dispatch engine: a registry of [OpHandler]s, and the tree to find them.
pub struct Dispatch {
    handlers: Vec<OpHandler>,
    tree: Tree,
}

impl Debug for Dispatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl Dispatch {
    /// Constructs a dispatcher with no handlers. See [Dispatch::chip8].
    pub fn empty() -> Self {
        Dispatch {
            handlers: vec![],
            tree: Tree::default(),
        }
    }

    /// Registers a handler. If another handler had the exact same pattern,
    /// it's replaced, and returned.
    pub fn register(&mut self, handler: OpHandler) -> Option<OpHandler> {
        let index = self.handlers.len();
        match self.tree.insert(&handler.pattern.0, index) {
            Some(old) => {
                // reuse the old slot, so handlers() doesn't grow stale entries
                self.tree.insert(&handler.pattern.0, old);
                Some(std::mem::replace(&mut self.handlers[old], handler))
            }
            None => {
                self.handlers.push(handler);
                None
            }
        }
    }

    /// Finds the handler for `word`, if there is one
    pub fn lookup(&self, word: u16) -> Option<&OpHandler> {
        self.tree
            .find(&nibbles(word))
            .and_then(|index| self.handlers.get(index))
    }

    /// Finds the handler for `word`, and extracts its operands
    pub fn decode(&self, word: u16) -> Option<(&OpHandler, Operands)> {
        Some((self.lookup(word)?, Operands::from(word)))
    }

    /// Gets a handler by its [OpId]
    pub fn handler(&self, id: OpId) -> Option<&OpHandler> {
        self.handlers.iter().find(|handler| handler.id == id)
    }

    /// Gets every registered handler, in registration order
    pub fn handlers(&self) -> &[OpHandler] {
        &self.handlers
    }

    /// Disassembles a single word, or returns [None] if no handler matches.
    /// # Examples
    /// ```rust
    /// # use chipd::*;
    /// let dispatch = Dispatch::default();
    /// assert_eq!(Some("ADD  V1, V2".into()), dispatch.disassemble(0x8124));
    /// assert_eq!(None, dispatch.disassemble(0xffff));
    /// ```
    pub fn disassemble(&self, word: u16) -> Option<String> {
        self.decode(word)
            .map(|(handler, operands)| (handler.disassemble)(&operands))
    }

    /// Constructs a dispatcher for the Chip-8 and Super-Chip instruction sets
    #[rustfmt::skip]
    pub fn chip8() -> Self {
        use OpId::*;
        let mut dispatch = Dispatch::empty();
        for handler in [
            // Base instruction set
            OpHandler::new(Cls,      "00e0", |c, _| { c.clear_screen(); Ok(()) },                 |_| "CLS".into()),
            OpHandler::new(Ret,      "00ee", |c, _| c.ret(),                                       |_| "RET".into()),
            OpHandler::new(Sys,      "0nnn", |_, _| Ok(()),                                        |o| addr("SYS", o)),
            OpHandler::new(Jp,       "1nnn", |c, o| { c.jump(o.nnn); Ok(()) },                    |o| addr("JP", o)),
            OpHandler::new(Call,     "2nnn", |c, o| c.call(o.nnn),                                 |o| addr("CALL", o)),
            OpHandler::new(SeVxKk,   "3xkk", |c, o| { c.skip_equals_immediate(o.x, o.kk); Ok(()) }, |o| vx_kk("SE", o)),
            OpHandler::new(SneVxKk,  "4xkk", |c, o| { c.skip_not_equals_immediate(o.x, o.kk); Ok(()) }, |o| vx_kk("SNE", o)),
            OpHandler::new(SeVxVy,   "5xy0", |c, o| { c.skip_equals(o.x, o.y); Ok(()) },          |o| vx_vy("SE", o)),
            OpHandler::new(LdVxKk,   "6xkk", |c, o| { c.load_immediate(o.x, o.kk); Ok(()) },      |o| vx_kk("LD", o)),
            OpHandler::new(AddVxKk,  "7xkk", |c, o| { c.add_immediate(o.x, o.kk); Ok(()) },       |o| vx_kk("ADD", o)),
            OpHandler::new(LdVxVy,   "8xy0", |c, o| { c.load(o.x, o.y); Ok(()) },                 |o| vx_vy("LD", o)),
            OpHandler::new(OrVxVy,   "8xy1", |c, o| { c.or(o.x, o.y); Ok(()) },                   |o| vx_vy("OR", o)),
            OpHandler::new(AndVxVy,  "8xy2", |c, o| { c.and(o.x, o.y); Ok(()) },                  |o| vx_vy("AND", o)),
            OpHandler::new(XorVxVy,  "8xy3", |c, o| { c.xor(o.x, o.y); Ok(()) },                  |o| vx_vy("XOR", o)),
            OpHandler::new(AddVxVy,  "8xy4", |c, o| { c.add(o.x, o.y); Ok(()) },                  |o| vx_vy("ADD", o)),
            OpHandler::new(SubVxVy,  "8xy5", |c, o| { c.sub(o.x, o.y); Ok(()) },                  |o| vx_vy("SUB", o)),
            OpHandler::new(ShrVx,    "8xy6", |c, o| { c.shift_right(o.x); Ok(()) },               |o| format!("{:<5}V{:X} {{, V{:X}}}", "SHR", o.x, o.y)),
            OpHandler::new(SubnVxVy, "8xy7", |c, o| { c.backwards_sub(o.x, o.y); Ok(()) },        |o| vx_vy("SUBN", o)),
            OpHandler::new(ShlVx,    "8xye", |c, o| { c.shift_left(o.x); Ok(()) },                |o| format!("{:<5}V{:X} {{, V{:X}}}", "SHL", o.x, o.y)),
            OpHandler::new(SneVxVy,  "9xy0", |c, o| { c.skip_not_equals(o.x, o.y); Ok(()) },      |o| vx_vy("SNE", o)),
            OpHandler::new(LdIAddr,  "annn", |c, o| { c.load_i_immediate(o.nnn); Ok(()) },        |o| format!("{:<5}I, 0x{:03X}", "LD", o.nnn)),
            OpHandler::new(JpV0Addr, "bnnn", |c, o| { c.jump_indexed(o.nnn); Ok(()) },            |o| format!("{:<5}V0, 0x{:03X}", "JP", o.nnn)),
            OpHandler::new(RndVxKk,  "cxkk", |c, o| { c.rand(o.x, o.kk); Ok(()) },                |o| vx_kk("RND", o)),
            OpHandler::new(DrwVxVyN, "dxyn", |c, o| { c.draw(o.x, o.y, o.n); Ok(()) },            |o| format!("{:<5}V{:X}, V{:X}, 0x{:X}", "DRW", o.x, o.y, o.n)),
            OpHandler::new(SkpVx,    "ex9e", |c, o| { c.skip_key_equals(o.x); Ok(()) },           |o| vx("SKP", o)),
            OpHandler::new(SknpVx,   "exa1", |c, o| { c.skip_key_not_equals(o.x); Ok(()) },       |o| vx("SKNP", o)),
            OpHandler::new(LdVxDt,   "fx07", |c, o| { c.load_delay_timer(o.x); Ok(()) },          |o| format!("{:<5}V{:X}, DT", "LD", o.x)),
            OpHandler::new(LdVxK,    "fx0a", |c, o| { c.wait_for_key(o.x); Ok(()) },              |o| format!("{:<5}V{:X}, K", "LD", o.x)),
            OpHandler::new(LdDtVx,   "fx15", |c, o| { c.store_delay_timer(o.x); Ok(()) },         |o| format!("{:<5}DT, V{:X}", "LD", o.x)),
            OpHandler::new(LdStVx,   "fx18", |c, o| { c.store_sound_timer(o.x); Ok(()) },         |o| format!("{:<5}ST, V{:X}", "LD", o.x)),
            OpHandler::new(AddIVx,   "fx1e", |c, o| { c.add_i(o.x); Ok(()) },                     |o| format!("{:<5}I, V{:X}", "ADD", o.x)),
            OpHandler::new(LdFVx,    "fx29", |c, o| { c.load_sprite(o.x); Ok(()) },               |o| format!("{:<5}F, V{:X}", "LD", o.x)),
            OpHandler::new(LdBVx,    "fx33", |c, o| { c.bcd_convert(o.x); Ok(()) },               |o| format!("{:<5}B, V{:X}", "LD", o.x)),
            OpHandler::new(LdMemVx,  "fx55", |c, o| { c.store_dma(o.x); Ok(()) },                 |o| format!("{:<5}[I], V{:X}", "LD", o.x)),
            OpHandler::new(LdVxMem,  "fx65", |c, o| { c.load_dma(o.x); Ok(()) },                  |o| format!("{:<5}V{:X}, [I]", "LD", o.x)),
            // Super-Chip extensions
            OpHandler::new(Scd,      "00cn", |c, o| { c.scroll_down(o.n); Ok(()) },               |o| format!("{:<5}0x{:X}", "SCD", o.n)),
            OpHandler::new(Scr,      "00fb", |c, _| { c.scroll_right(); Ok(()) },                 |_| "SCR".into()),
            OpHandler::new(Scl,      "00fc", |c, _| { c.scroll_left(); Ok(()) },                  |_| "SCL".into()),
            OpHandler::new(Exit,     "00fd", |c, _| c.exit(),                                      |_| "EXIT".into()),
            OpHandler::new(Low,      "00fe", |c, _| { c.init_lores(); Ok(()) },                   |_| "LOW".into()),
            OpHandler::new(High,     "00ff", |c, _| { c.init_hires(); Ok(()) },                   |_| "HIGH".into()),
            OpHandler::new(LdHfVx,   "fx30", |c, o| { c.load_big_sprite(o.x); Ok(()) },           |o| format!("{:<5}HF, V{:X}", "LD", o.x)),
            OpHandler::new(LdRVx,    "fx75", |c, o| { c.store_flags(o.x); Ok(()) },               |o| format!("{:<5}R, V{:X}", "LD", o.x)),
            OpHandler::new(LdVxR,    "fx85", |c, o| { c.load_flags(o.x); Ok(()) },                |o| format!("{:<5}V{:X}, R", "LD", o.x)),
        ] {
            dispatch.register(handler);
        }
        dispatch
    }
}

impl Default for Dispatch {
    /// The full Chip-8 + Super-Chip instruction set
    fn default() -> Self {
        Self::chip8()
    }
}

fn addr(mnemonic: &str, o: &Operands) -> String {
    format!("{mnemonic:<5}0x{:03X}", o.nnn)
}

fn vx(mnemonic: &str, o: &Operands) -> String {
    format!("{mnemonic:<5}V{:X}", o.x)
}

fn vx_kk(mnemonic: &str, o: &Operands) -> String {
    format!("{mnemonic:<5}V{:X}, 0x{:02X}", o.x, o.kk)
}

fn vx_vy(mnemonic: &str, o: &Operands) -> String {
    format!("{mnemonic:<5}V{:X}, V{:X}", o.x, o.y)
}
