// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! A disassembler for Chip-8 opcodes
use super::Dispatch;
use owo_colors::{OwoColorize, Style};

/// Disassembles Chip-8 instructions
pub trait Disassembler {
    /// Disassemble a single instruction
    fn once(&self, insn: u16) -> String;
}

/// Disassembles Chip-8 instructions, printing them in the provided [owo_colors::Style]s
#[derive(Debug)]
pub struct Dis {
    /// Styles invalid instructions
    pub invalid: Style,
    /// Styles valid instruction
    pub normal: Style,
    dispatch: Dispatch,
}

impl Default for Dis {
    fn default() -> Self {
        Self {
            invalid: Style::new().bold().red(),
            normal: Style::new().green(),
            dispatch: Dispatch::default(),
        }
    }
}

impl Dis {
    /// Builds a plain (unstyled) disassembler, for piping into files
    pub fn plain() -> Self {
        Self {
            invalid: Style::new(),
            normal: Style::new(),
            ..Default::default()
        }
    }
}

impl Disassembler for Dis {
    fn once(&self, insn: u16) -> String {
        if let Some(text) = self.dispatch.disassemble(insn) {
            format!("{:<16}", text).style(self.normal).to_string()
        } else {
            format!("{:<16}", format!("inval {insn:04x}"))
                .style(self.invalid)
                .to_string()
        }
    }
}

impl Disassembler for Dispatch {
    fn once(&self, insn: u16) -> String {
        self.disassemble(insn)
            .unwrap_or_else(|| format!("inval {insn:04x}"))
    }
}
