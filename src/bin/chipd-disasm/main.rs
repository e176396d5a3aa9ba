// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Disassembles a Chip-8 program, one word at a time

use chipd::*;
use gumdrop::Options;
use owo_colors::OwoColorize;
use std::{fs::read, path::PathBuf};

#[derive(Debug, thiserror::Error)]
enum DisasmError {
    #[error("offset {offset:x} is past the end of a {len} byte file")]
    OffsetOutOfRange { offset: usize, len: usize },
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Options, Hash)]
struct Arguments {
    #[options(help = "Show help text")]
    help: bool,
    #[options(help = "Load a ROM to disassemble", free, required)]
    pub file: PathBuf,
    #[options(
        help = "Load address (usually 200)",
        parse(try_from_str = "parse_hex"),
        default = "200"
    )]
    pub loadaddr: u16,
    #[options(help = "Start disassembling at offset...")]
    pub offset: usize,
    #[options(help = "Don't color the output")]
    pub plain: bool,
}

fn parse_hex(value: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    u16::from_str_radix(value, 16)
}

fn main() -> std::result::Result<(), DisasmError> {
    let options = Arguments::parse_args_default_or_exit();
    let contents = &read(&options.file)?;
    let body = contents
        .get(options.offset..)
        .ok_or(DisasmError::OffsetOutOfRange {
            offset: options.offset,
            len: contents.len(),
        })?;
    let disassembler = if options.plain {
        Dis::plain()
    } else {
        Dis::default()
    };
    for (index, insn) in body.chunks_exact(2).enumerate() {
        let insn = u16::from_be_bytes([insn[0], insn[1]]);
        let addr = 2 * index + options.loadaddr as usize + options.offset;
        if options.plain {
            println!("{addr:03x}: {} {insn:04x}", disassembler.once(insn));
        } else {
            println!(
                "{addr:03x}: {} {:04x}",
                disassembler.once(insn),
                insn.bright_black()
            );
        }
    }
    Ok(())
}
