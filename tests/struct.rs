//! Testing methods on Chipd's structs
use chipd::{
    cpu::instruction::{Operands, Pattern},
    daemon::CommandKind,
    journal::journal,
    prelude::*,
    screen::{HEIGHT, WIDTH},
    Mem, OpId,
};
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

fn hash(value: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

mod cpu {
    use super::*;
    #[test]
    fn default() {
        assert_eq!(CPU::new(), CPU::default());
    }
    #[test]
    fn clone() {
        let mut cpu = CPU::default();
        cpu.set_v(3, 0x33);
        let cpu2 = cpu.clone();
        assert_eq!(cpu, cpu2);
        assert_eq!(hash(&cpu), hash(&cpu2));
    }
    #[test]
    fn debug() {
        println!("{:?}", CPU::default());
    }
    #[test]
    fn ne() {
        let mut cpu = CPU::default();
        cpu.set_v(0, 1);
        assert_ne!(cpu, CPU::default());
    }
}

mod error {
    use super::*;
    #[test]
    fn display() {
        let error = Error::UnimplementedInstruction {
            word: 0xffff,
            addr: 0x200,
        };
        assert_eq!("opcode ffff at 200 not recognized", error.to_string());
        println!("{error:?}");
    }
    #[test]
    fn fatal() {
        assert!(Error::StackOverflow { addr: 0x200 }.is_fatal());
        assert!(Error::Exited { addr: 0x200 }.is_fatal());
        assert!(!Error::InvalidKey { key: 0x10 }.is_fatal());
        assert!(!Error::InvalidClockSpeed { speed: 0 }.is_fatal());
    }
    #[test]
    fn clone_eq() {
        let error = Error::StackUnderflow { addr: 0x300 };
        assert_eq!(error.clone(), error);
        assert_ne!(Error::StackUnderflow { addr: 0x302 }, error);
    }
}

mod screen {
    use super::*;
    #[test]
    fn default() {
        let screen = Screen::default();
        assert_eq!(ScreenMode::Standard, screen.mode());
        assert_eq!((64, 32), (screen.width(), screen.height()));
        assert_eq!(WIDTH * HEIGHT, screen.framebuffer().len());
    }
    #[test]
    fn mode_display() {
        assert_eq!("64x32", ScreenMode::Standard.to_string());
        assert_eq!("128x64", ScreenMode::Extended.to_string());
    }
    #[test]
    fn ord() {
        assert!(ScreenMode::Standard < ScreenMode::Extended);
    }
    #[test]
    fn display() {
        let mut screen = Screen::default();
        screen.draw(0, 0, &[0xf0, 0x90], 1);
        let text = screen.to_string();
        // two rows of pixels per line of text
        assert_eq!(16, text.lines().count());
        assert!(text.starts_with('█'));
    }
    #[test]
    fn clone_hash() {
        let screen = Screen::default();
        assert_eq!(hash(&screen), hash(screen.clone()));
        println!("{screen:?}");
    }
}

mod mem {
    use super::*;
    #[test]
    fn debug() {
        println!("{:?}", Mem::default());
    }
    #[test]
    fn clear_loads_fonts() {
        let mut mem = Mem::default();
        assert_eq!(0, mem.peek(0));
        mem.clear();
        assert_eq!(0xf0, mem.peek(0));
        // wraps to 12 bits
        assert_eq!(0xf0, mem.peek(0x1000));
    }
}

mod instruction {
    use super::*;
    #[test]
    fn pattern_display() {
        assert_eq!("8__4", Pattern::new("8xy4").to_string());
        assert_eq!("00E0", Pattern::new("00e0").to_string());
    }
    #[test]
    fn pattern_matches() {
        let pattern = Pattern::new("fx55");
        assert!(pattern.matches(0xf355));
        assert!(!pattern.matches(0xf365));
        assert_eq!((0xf055, 0xff55), (pattern.min(), pattern.max()));
    }
    #[test]
    fn operands() {
        let operands = Operands::from(0xd123);
        assert_eq!(0x123, operands.nnn);
        assert_eq!((1, 2, 3), (operands.x, operands.y, operands.n));
        assert_eq!(0x23, operands.kk);
    }
    #[test]
    fn dispatch_debug() {
        let dispatch = Dispatch::default();
        assert_eq!(Some(OpId::DrwVxVyN), dispatch.lookup(0xd123).map(|h| h.id));
        println!("{dispatch:?}");
    }
    #[test]
    fn disassembler() {
        let plain = Dis::plain();
        assert_eq!("CLS             ", plain.once(0x00e0));
        assert_eq!("inval ffff      ", plain.once(0xffff));
        assert_eq!("inval ffff", Dispatch::default().once(0xffff));
        println!("{:?}", Dis::default().once(0x00e0));
    }
}

mod daemon {
    use super::*;
    #[test]
    fn config_default() {
        let config = Config::default();
        assert_eq!(500, config.clock_speed);
        assert_eq!(60, config.timer_rate);
        assert_eq!(0x200, config.load_address);
        assert!(!config.trace);
        assert_eq!(config, config.clone());
    }
    #[test]
    fn run_state() {
        assert_eq!(RunState::Paused, RunState::default());
        assert_ne!(hash(RunState::Paused), hash(RunState::Running));
    }
    #[test]
    fn command_kind() {
        let command = Command::LoadRom {
            rom: vec![0x00, 0xe0],
            addr: 0x200,
        };
        assert_eq!(CommandKind::LoadRom, command.kind());
        assert_eq!(command.clone(), command);
        assert_ne!(CommandKind::Custom("a"), CommandKind::Custom("b"));
        println!("{command:?}");
    }
    #[test]
    fn debug() {
        let (log, _reader) = journal(8);
        let daemon = Daemon::new(Config::default(), log);
        println!("{daemon:?}");
    }
}
